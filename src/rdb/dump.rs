use std::io::Write;

use super::{crc64, encoding, object_type, opcode, RdbError, MAGIC, RDB_VERSION};
use crate::keyspace::Value;

/// Integral doubles strictly inside this range are written as plain integers.
const EXACT_INTEGER_MIN: f64 = -4_503_599_627_370_495.0;
const EXACT_INTEGER_MAX: f64 = 4_503_599_627_370_496.0;

/// Significant digits of `%.17g`, enough to round-trip any double.
const DOUBLE_PRECISION: i32 = 17;

/// Writes RDB primitives while keeping a running CRC64 of everything written.
pub struct ObjectDumper<W> {
    writer: W,
    crc: u64,
}

impl<W: Write> ObjectDumper<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, crc: 0 }
    }

    /// Checksum of every byte written so far.
    pub fn crc(&self) -> u64 {
        self.crc
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), RdbError> {
        self.writer.write_all(bytes)?;
        self.crc = crc64::update(self.crc, bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, byte: u8) -> Result<(), RdbError> {
        self.write_bytes(&[byte])
    }

    /// `REDIS` followed by the zero-padded format version.
    pub fn write_header(&mut self) -> Result<(), RdbError> {
        self.write_bytes(MAGIC)?;
        self.write_bytes(format!("{RDB_VERSION:04}").as_bytes())
    }

    pub fn write_aux(&mut self, key: &[u8], value: &[u8]) -> Result<(), RdbError> {
        self.write_u8(opcode::AUX)?;
        self.write_string(key)?;
        self.write_string(value)
    }

    pub fn write_length(&mut self, len: u64) -> Result<(), RdbError> {
        if len < 1 << 6 {
            self.write_u8((encoding::LEN_6BIT << 6) | len as u8)
        } else if len < 1 << 14 {
            self.write_u8((encoding::LEN_14BIT << 6) | (len >> 8) as u8)?;
            self.write_u8(len as u8)
        } else if let Ok(len) = u32::try_from(len) {
            self.write_u8(encoding::LEN_32BIT)?;
            self.write_bytes(&len.to_be_bytes())
        } else {
            Err(RdbError::LengthTooLarge(len))
        }
    }

    /// Writes a string, packing canonical integers into 1, 2 or 4 bytes.
    pub fn write_string(&mut self, s: &[u8]) -> Result<(), RdbError> {
        if let Some(n) = as_packable_integer(s) {
            if let Ok(n) = i8::try_from(n) {
                self.write_u8((encoding::ENCVAL << 6) | encoding::INT8)?;
                return self.write_bytes(&n.to_le_bytes());
            }
            if let Ok(n) = i16::try_from(n) {
                self.write_u8((encoding::ENCVAL << 6) | encoding::INT16)?;
                return self.write_bytes(&n.to_le_bytes());
            }
            self.write_u8((encoding::ENCVAL << 6) | encoding::INT32)?;
            return self.write_bytes(&n.to_le_bytes());
        }

        self.write_length(s.len() as u64)?;
        self.write_bytes(s)
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), RdbError> {
        if value.is_nan() {
            return self.write_u8(encoding::DOUBLE_NAN);
        }
        if value.is_infinite() {
            return self.write_u8(if value > 0.0 {
                encoding::DOUBLE_POS_INF
            } else {
                encoding::DOUBLE_NEG_INF
            });
        }

        let text = format_double(value);
        self.write_u8(text.len() as u8)?;
        self.write_bytes(text.as_bytes())
    }

    pub fn write_object_type(&mut self, value: &Value) -> Result<(), RdbError> {
        self.write_u8(match value {
            Value::String(_) => object_type::STRING,
            Value::Set(_) => object_type::SET,
            Value::ZSet(_) => object_type::ZSET,
            Value::Hash(_) => object_type::HASH,
        })
    }

    pub fn write_object(&mut self, value: &Value) -> Result<(), RdbError> {
        match value {
            Value::String(value) => self.write_string(value),
            Value::Set(members) => {
                self.write_length(members.len() as u64)?;
                members
                    .iter()
                    .try_for_each(|member| self.write_string(member))
            }
            Value::ZSet(entries) => {
                self.write_length(entries.len() as u64)?;
                entries.iter().try_for_each(|(member, score)| {
                    self.write_string(member)?;
                    self.write_double(*score)
                })
            }
            Value::Hash(fields) => {
                self.write_length(fields.len() as u64)?;
                fields.iter().try_for_each(|(field, value)| {
                    self.write_string(field)?;
                    self.write_string(value)
                })
            }
        }
    }
}

/// The integer `s` spells, when it is canonical and fits in 32 bits.
fn as_packable_integer(s: &[u8]) -> Option<i32> {
    // Longest i32: "-2147483648".
    if s.is_empty() || s.len() > 11 {
        return None;
    }

    let text = std::str::from_utf8(s).ok()?;
    let n = text.parse::<i32>().ok()?;
    (n.to_string() == text).then_some(n)
}

/// Serializes a single object as a `DUMP` payload.
pub fn dump_value(value: &Value) -> Result<Vec<u8>, RdbError> {
    let mut dumper = ObjectDumper::new(Vec::new());
    dumper.write_object_type(value)?;
    dumper.write_object(value)?;
    dumper.write_bytes(&RDB_VERSION.to_le_bytes())?;

    let crc = dumper.crc();
    let mut payload = dumper.into_inner();
    payload.extend_from_slice(&crc.to_le_bytes());

    Ok(payload)
}

/// Formats a double the way the RDB text encoding expects: exact integers as
/// integers, everything else as C's `%.17g`.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    if value > EXACT_INTEGER_MIN && value < EXACT_INTEGER_MAX && value.trunc() == value {
        return (value as i64).to_string();
    }

    let scientific = format!("{:.*e}", (DOUBLE_PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= DOUBLE_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (DOUBLE_PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
