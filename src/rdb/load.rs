use std::io::{ErrorKind, Read};

use bytes::Bytes;

use super::{crc64, encoding, object_type, ziplist, RdbError, RDB_VERSION};
use crate::keyspace::Value;

/// Version and checksum trailing every `DUMP` payload.
const FOOTER_LEN: usize = 10;

/// Reads RDB primitives while keeping a running CRC64 of everything read.
pub struct ObjectLoader<R> {
    reader: R,
    crc: u64,
}

impl<R: Read> ObjectLoader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, crc: 0 }
    }

    /// Checksum of every byte read so far.
    pub fn crc(&self) -> u64 {
        self.crc
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), RdbError> {
        self.reader.read_exact(buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => RdbError::Truncated,
            _ => RdbError::Io(err),
        })?;
        self.crc = crc64::update(self.crc, buf);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, RdbError> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], RdbError> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>, RdbError> {
        // Grows as data arrives, so a corrupt length cannot force a huge allocation.
        let mut buf = Vec::new();
        (&mut self.reader).take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(RdbError::Truncated);
        }

        self.crc = crc64::update(self.crc, &buf);
        Ok(buf)
    }

    /// Reads the trailing checksum, which is not part of what it covers.
    pub fn read_checksum(&mut self) -> Result<u64, RdbError> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => RdbError::Truncated,
            _ => RdbError::Io(err),
        })?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Returns the decoded length and whether it is actually a special
    /// encoding marker.
    fn read_length_with_encoding(&mut self) -> Result<(u64, bool), RdbError> {
        let first = self.read_u8()?;

        match first >> 6 {
            encoding::LEN_6BIT => Ok((u64::from(first & 0x3f), false)),
            encoding::LEN_14BIT => {
                let second = self.read_u8()?;
                Ok(((u64::from(first & 0x3f) << 8) | u64::from(second), false))
            }
            encoding::ENCVAL => Ok((u64::from(first & 0x3f), true)),
            _ => match first {
                encoding::LEN_32BIT => Ok((u64::from(u32::from_be_bytes(self.read_array()?)), false)),
                encoding::LEN_64BIT => Ok((u64::from_be_bytes(self.read_array()?), false)),
                _ => Err(RdbError::Malformed("unknown length encoding")),
            },
        }
    }

    pub fn read_length(&mut self) -> Result<u64, RdbError> {
        match self.read_length_with_encoding()? {
            (len, false) => Ok(len),
            (_, true) => Err(RdbError::Malformed("unexpected encoded length")),
        }
    }

    pub fn read_string(&mut self) -> Result<Vec<u8>, RdbError> {
        let (len, encoded) = self.read_length_with_encoding()?;
        if !encoded {
            return self.read_bytes(len);
        }

        match len as u8 {
            encoding::INT8 => Ok(i8::from_le_bytes(self.read_array()?).to_string().into_bytes()),
            encoding::INT16 => Ok(i16::from_le_bytes(self.read_array()?).to_string().into_bytes()),
            encoding::INT32 => Ok(i32::from_le_bytes(self.read_array()?).to_string().into_bytes()),
            encoding::LZF => {
                let compressed_len = self.read_length()?;
                let len = self.read_length()?;
                let compressed = self.read_bytes(compressed_len)?;
                lzf::decompress(&compressed, len as usize)
                    .map_err(|_| RdbError::Malformed("invalid LZF data"))
            }
            other => Err(RdbError::UnknownEncoding(other)),
        }
    }

    pub fn read_double(&mut self) -> Result<f64, RdbError> {
        match self.read_u8()? {
            encoding::DOUBLE_NAN => Ok(f64::NAN),
            encoding::DOUBLE_POS_INF => Ok(f64::INFINITY),
            encoding::DOUBLE_NEG_INF => Ok(f64::NEG_INFINITY),
            len => {
                let text = self.read_bytes(u64::from(len))?;
                std::str::from_utf8(&text)
                    .ok()
                    .and_then(|text| text.parse().ok())
                    .ok_or(RdbError::InvalidDouble)
            }
        }
    }

    fn read_strings(&mut self, count: u64) -> Result<Vec<Bytes>, RdbError> {
        (0..count)
            .map(|_| self.read_string().map(Bytes::from))
            .collect()
    }

    /// Reads the body of an object of `object_type`.
    ///
    /// Collections must be non-empty and scores must be numbers, so that a
    /// decoded value can always be installed as-is.
    pub fn read_object(&mut self, object_type: u8) -> Result<Value, RdbError> {
        let value = self.read_body(object_type)?;
        check_value(&value)?;
        Ok(value)
    }

    fn read_body(&mut self, object_type: u8) -> Result<Value, RdbError> {
        match object_type {
            object_type::STRING => Ok(Value::String(Bytes::from(self.read_string()?))),
            object_type::SET => {
                let count = self.read_length()?;
                Ok(Value::Set(self.read_strings(count)?))
            }
            object_type::ZSET => {
                let count = self.read_length()?;
                let entries = (0..count)
                    .map(|_| -> Result<(Bytes, f64), RdbError> {
                        let member = Bytes::from(self.read_string()?);
                        Ok((member, self.read_double()?))
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Value::ZSet(entries))
            }
            object_type::HASH => {
                let count = self.read_length()?;
                let fields = (0..count)
                    .map(|_| -> Result<(Bytes, Bytes), RdbError> {
                        let field = Bytes::from(self.read_string()?);
                        Ok((field, Bytes::from(self.read_string()?)))
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Value::Hash(fields))
            }
            object_type::SET_INTSET => {
                let members = ziplist::parse_intset(&self.read_string()?)?;
                Ok(Value::Set(members.into_iter().map(Bytes::from).collect()))
            }
            object_type::ZSET_ZIPLIST => {
                let entries = paired(ziplist::parse_ziplist(&self.read_string()?)?)?;
                let entries = entries
                    .into_iter()
                    .map(|(member, score)| -> Result<(Bytes, f64), RdbError> {
                        let score = std::str::from_utf8(&score)
                            .ok()
                            .and_then(|score| score.parse::<f64>().ok())
                            .ok_or(RdbError::InvalidDouble)?;
                        Ok((member, score))
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Value::ZSet(entries))
            }
            object_type::HASH_ZIPLIST => {
                let fields = paired(ziplist::parse_ziplist(&self.read_string()?)?)?;
                Ok(Value::Hash(fields))
            }
            other => Err(RdbError::UnsupportedType(other)),
        }
    }
}

fn check_value(value: &Value) -> Result<(), RdbError> {
    let empty = match value {
        Value::String(_) => false,
        Value::Set(members) => members.is_empty(),
        Value::Hash(fields) => fields.is_empty(),
        Value::ZSet(entries) => {
            if entries.iter().any(|(_, score)| score.is_nan()) {
                return Err(RdbError::InvalidDouble);
            }
            entries.is_empty()
        }
    };

    if empty {
        return Err(RdbError::Malformed("empty collection"));
    }

    Ok(())
}

/// Groups a flat `[a, b, a, b, ...]` ziplist into pairs.
fn paired(entries: Vec<Vec<u8>>) -> Result<Vec<(Bytes, Bytes)>, RdbError> {
    if entries.len() % 2 != 0 {
        return Err(RdbError::Malformed("odd number of ziplist entries"));
    }

    let mut entries = entries.into_iter().map(Bytes::from);
    let mut pairs = Vec::new();
    while let (Some(first), Some(second)) = (entries.next(), entries.next()) {
        pairs.push((first, second));
    }

    Ok(pairs)
}

/// Decodes a `DUMP` payload, verifying its version and checksum first.
pub fn load_value(payload: &[u8]) -> Result<Value, RdbError> {
    if payload.len() < FOOTER_LEN {
        return Err(RdbError::BadPayload);
    }

    let (covered, checksum) = payload.split_at(payload.len() - 8);
    let (body, version) = covered.split_at(covered.len() - 2);

    let version = u16::from_le_bytes([version[0], version[1]]);
    if version > RDB_VERSION {
        return Err(RdbError::BadPayload);
    }

    let mut expected = [0u8; 8];
    expected.copy_from_slice(checksum);
    if crc64::crc64(covered) != u64::from_le_bytes(expected) {
        return Err(RdbError::BadPayload);
    }

    let mut loader = ObjectLoader::new(body);
    let object_type = loader.read_u8()?;
    loader.read_object(object_type)
}
