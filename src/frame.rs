// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;
use std::string::FromUtf8Error;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Upper bound on the elements preallocated for an array, whatever its
/// announced length.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("invalid frame data type: {0}")]
    InvalidDataType(u8),
    /// Invalid message encoding.
    #[error("{0}")]
    Other(crate::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            DataType::SimpleString => {
                let string = String::from_utf8(get_line(src)?.to_vec())?;
                Ok(Frame::Simple(string))
            }
            DataType::SimpleError => {
                let string = String::from_utf8(get_line(src)?.to_vec())?;
                Ok(Frame::Error(string))
            }
            DataType::Integer => Ok(Frame::Integer(get_decimal(src)?)),
            // $<length>\r\n<data>\r\n
            DataType::BulkString => match get_length(src)? {
                Some(length) => Ok(Frame::Bulk(Bytes::copy_from_slice(get_payload(src, length)?))),
                None => Ok(Frame::Null),
            },
            // !<length>\r\n<error>\r\n
            DataType::BulkError => match get_length(src)? {
                Some(length) => {
                    let msg = String::from_utf8(get_payload(src, length)?.to_vec())?;
                    Ok(Frame::Error(msg))
                }
                None => Ok(Frame::Null),
            },
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let Some(length) = get_length(src)? else {
                    return Ok(Frame::Null);
                };

                let mut frames = Vec::with_capacity(length.min(MAX_PREALLOCATED_ELEMENTS));
                for _ in 0..length {
                    frames.push(Self::parse(src)?);
                }

                Ok(Frame::Array(frames))
            }
            DataType::Null => {
                get_line(src)?;
                Ok(Frame::Null)
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    fn write_to(&self, bytes: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => {
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
            }
            Frame::Error(s) => {
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
            }
            Frame::Integer(i) => {
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(i.to_string().as_bytes());
                bytes.extend_from_slice(CRLF);
            }
            Frame::Bulk(data) => {
                bytes.push(u8::from(DataType::BulkString));
                bytes.extend_from_slice(data.len().to_string().as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(CRLF);
            }
            // RESP2 null bulk string, understood by every client.
            Frame::Null => bytes.extend_from_slice(b"$-1\r\n"),
            Frame::Array(arr) => {
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(arr.len().to_string().as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in arr {
                    frame.write_to(bytes);
                }
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}\r\n", arr.len())?;
                for frame in arr {
                    write!(f, "{}\r\n", frame)?;
                }
                Ok(())
            }
        }
    }
}

/// Returns the bytes up to the next CRLF and moves past it.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| "protocol error; invalid number".into())
}

/// Reads a length header. `-1` announces a null value.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, Error> {
    match get_decimal(src)? {
        -1 => Ok(None),
        length => usize::try_from(length)
            .map(Some)
            .map_err(|_| "protocol error; invalid length".into()),
    }
}

/// Reads exactly `length` bytes followed by CRLF. The payload itself may
/// contain CR and LF.
fn get_payload<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = start.checked_add(length).ok_or(Error::Incomplete)?;
    if buf.len() < end + CRLF.len() {
        return Err(Error::Incomplete);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err("protocol error; bulk payload not terminated by CRLF".into());
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    BulkString,   // '$'
    SimpleError,  // '-'
    BulkError,    // '!'
    Integer,      // ':'
    Array,        // '*'
    Null,         // '_'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'!' => Ok(Self::BulkError),
            b'*' => Ok(Self::Array),
            b'_' => Ok(Self::Null),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::BulkError => b'!',
            DataType::Array => b'*',
            DataType::Null => b'_',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        "protocol error; invalid frame format".into()
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<String> for Error {
    fn from(src: String) -> Error {
        Error::Other(src.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Result<Frame, Error> {
        Frame::parse(&mut Cursor::new(data))
    }

    #[test]
    fn parse_simple_frames() {
        assert_eq!(parse(b"+OK\r\n").unwrap(), Frame::Simple("OK".to_string()));
        assert_eq!(
            parse(b"-Error message\r\n").unwrap(),
            Frame::Error("Error message".to_string())
        );
        assert_eq!(parse(b":-1000\r\n").unwrap(), Frame::Integer(-1000));
        assert_eq!(parse(b":+7\r\n").unwrap(), Frame::Integer(7));
    }

    #[test]
    fn parse_bulk_string_frame() {
        assert_eq!(
            parse(b"$6\r\nfoobar\r\n").unwrap(),
            Frame::Bulk(Bytes::from("foobar"))
        );
        assert_eq!(parse(b"$0\r\n\r\n").unwrap(), Frame::Bulk(Bytes::new()));
        assert_eq!(parse(b"$-1\r\n").unwrap(), Frame::Null);
    }

    #[test]
    fn bulk_payload_may_contain_crlf() {
        assert_eq!(
            parse(b"$8\r\nab\r\ncd\r\n\r\n").unwrap(),
            Frame::Bulk(Bytes::from("ab\r\ncd\r\n"))
        );
    }

    #[test]
    fn bulk_payload_must_end_with_crlf() {
        assert!(matches!(parse(b"$3\r\nabcd\r\n"), Err(Error::Other(_))));
    }

    #[test]
    fn partial_input_is_incomplete() {
        for data in [&b"$6\r\nfoo"[..], b"*2\r\n$3\r\nfoo\r\n", b"+OK", b""] {
            assert!(matches!(parse(data), Err(Error::Incomplete)));
        }
    }

    #[test]
    fn parse_array_frame() {
        let frame = parse(b"*3\r\n$5\r\nhello\r\n$-1\r\n$5\r\nworld\r\n").unwrap();
        assert_eq!(
            frame,
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("hello")),
                Frame::Null,
                Frame::Bulk(Bytes::from("world")),
            ])
        );

        assert_eq!(parse(b"*0\r\n").unwrap(), Frame::Array(vec![]));
        assert_eq!(parse(b"*-1\r\n").unwrap(), Frame::Null);
    }

    #[test]
    fn rejects_unknown_types_and_lengths() {
        assert!(matches!(parse(b"?1\r\n"), Err(Error::InvalidDataType(b'?'))));
        assert!(matches!(parse(b"$-2\r\n"), Err(Error::Other(_))));
        assert!(matches!(parse(b"*x\r\n"), Err(Error::Other(_))));
    }

    #[test]
    fn serialize_frames() {
        let frame = Frame::Array(vec![
            Frame::Simple("OK".to_string()),
            Frame::Integer(3),
            Frame::Bulk(Bytes::from("a\r\nb")),
            Frame::Null,
            Frame::Error("ERR nope".to_string()),
        ]);

        assert_eq!(
            frame.serialize(),
            b"*5\r\n+OK\r\n:3\r\n$4\r\na\r\nb\r\n$-1\r\n-ERR nope\r\n".to_vec()
        );
    }
}
