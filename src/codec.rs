use std::io::Cursor;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::frame::{self, Frame};
use crate::Error;

/// Largest request accepted before the connection is dropped.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Splits the request stream into commands, each a list of arguments.
///
/// A command is either a simple string (`+PING\r\n`), read as a single
/// argument, or an array of bulk strings.
pub struct CommandCodec {
    max_frame_size: usize,
}

impl CommandCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for CommandCodec {
    type Item = Vec<Bytes>;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor::new(&src[..]);
        let frame = match Frame::parse(&mut cursor) {
            Ok(frame) => frame,
            Err(frame::Error::Incomplete) => {
                if src.len() > self.max_frame_size {
                    return Err("protocol error; request exceeds the maximum frame size".into());
                }
                // Not enough data to parse a frame.
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let position = usize::try_from(cursor.position())?;
        let command = arguments(frame)?;

        // Remove the parsed frame from the buffer.
        src.advance(position);

        Ok(Some(command))
    }
}

fn arguments(frame: Frame) -> Result<Vec<Bytes>, Error> {
    match frame {
        Frame::Simple(s) => Ok(vec![Bytes::from(s)]),
        Frame::Array(parts) => parts
            .into_iter()
            .map(|part| -> Result<Bytes, Error> {
                match part {
                    Frame::Bulk(bytes) => Ok(bytes),
                    Frame::Simple(s) => Ok(Bytes::from(s)),
                    frame => Err(format!("protocol error; expected bulk string, got {frame:?}").into()),
                }
            })
            .collect(),
        frame => Err(format!("protocol error; expected array, got {frame:?}").into()),
    }
}

/// Incremental parser for callers that own the byte stream themselves.
#[derive(Default)]
pub struct Parser {
    buffer: BytesMut,
    codec: CommandCodec,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `data` and returns every command it completes. Partial input
    /// stays buffered for the next call.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Vec<Bytes>>, Error> {
        self.buffer.extend_from_slice(data);

        let mut commands = Vec::new();
        while let Some(command) = self.codec.decode(&mut self.buffer)? {
            commands.push(command);
        }

        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from(v.to_string())).collect()
    }

    #[test]
    fn simple_string_is_a_single_argument() {
        let mut parser = Parser::new();
        assert_eq!(parser.feed(b"+PING\r\n").unwrap(), vec![args(&["PING"])]);
    }

    #[test]
    fn fragmented_input() {
        let request = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nva\r\nl\r\n";
        let mut parser = Parser::new();

        let mut commands = Vec::new();
        for byte in request.iter() {
            commands.extend(parser.feed(&[*byte]).unwrap());
        }

        assert_eq!(commands, vec![args(&["SET", "key", "va\r\nl"])]);
    }

    #[test]
    fn several_commands_in_one_chunk() {
        let mut parser = Parser::new();
        let commands = parser
            .feed(b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n*1\r\n$4\r\nEC")
            .unwrap();

        assert_eq!(commands, vec![args(&["PING"]), args(&["GET", "k"])]);
        assert_eq!(parser.feed(b"HO\r\n").unwrap(), vec![args(&["ECHO"])]);
    }

    #[test]
    fn malformed_input_errors() {
        assert!(Parser::new().feed(b"*1\r\n:1\r\n").is_err());
        assert!(Parser::new().feed(b"$3\r\nfoo\r\n").is_err());
        assert!(Parser::new().feed(b"?\r\n").is_err());
    }

    #[test]
    fn oversized_requests_are_rejected() {
        let mut codec = CommandCodec::new(8);
        let mut buffer = BytesMut::from(&b"*1\r\n$100\r\nabc"[..]);

        assert!(codec.decode(&mut buffer).is_err());
    }
}
