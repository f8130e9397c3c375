//! Readers for the compact encodings older servers embed in RDB strings.
//!
//! Ziplist:
//!
//! ```text
//! <zlbytes u32><zltail u32><zllen u16> <entry>... <0xff>
//! entry: <prevlen 1|5 bytes> <encoding> <payload>
//! ```
//!
//! Intset:
//!
//! ```text
//! <encoding u32 (2|4|8)> <length u32> <little-endian integers>
//! ```

use super::RdbError;

const ZIPLIST_HEADER_LEN: usize = 10;
const ZIPLIST_END: u8 = 0xff;
const ZIPLIST_BIG_PREVLEN: u8 = 0xfe;

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], RdbError> {
    if buf.len() < n {
        return Err(RdbError::Malformed("truncated ziplist or intset"));
    }

    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, RdbError> {
    Ok(take(buf, 1)?[0])
}

/// Reads a little-endian signed integer of `width` bytes.
fn take_int(buf: &mut &[u8], width: usize) -> Result<i64, RdbError> {
    let bytes = take(buf, width)?;

    let mut extended = [0u8; 8];
    extended[..width].copy_from_slice(bytes);
    // Sign-extend from the most significant byte read.
    if bytes[width - 1] & 0x80 != 0 {
        extended[width..].fill(0xff);
    }

    Ok(i64::from_le_bytes(extended))
}

/// Decodes every entry of a ziplist. Integer entries come back as their
/// decimal text.
pub(super) fn parse_ziplist(blob: &[u8]) -> Result<Vec<Vec<u8>>, RdbError> {
    let mut buf = blob;
    take(&mut buf, ZIPLIST_HEADER_LEN)?;

    let mut entries = Vec::new();
    loop {
        let first = take_u8(&mut buf)?;
        if first == ZIPLIST_END {
            break;
        }
        if first == ZIPLIST_BIG_PREVLEN {
            take(&mut buf, 4)?;
        }

        let header = take_u8(&mut buf)?;
        let entry = match header >> 6 {
            0 => take(&mut buf, usize::from(header & 0x3f))?.to_vec(),
            1 => {
                let len = (usize::from(header & 0x3f) << 8) | usize::from(take_u8(&mut buf)?);
                take(&mut buf, len)?.to_vec()
            }
            2 => {
                let len = u32::from_be_bytes(
                    take(&mut buf, 4)?
                        .try_into()
                        .map_err(|_| RdbError::Malformed("bad ziplist entry length"))?,
                );
                take(&mut buf, len as usize)?.to_vec()
            }
            _ => {
                let n = match header {
                    0xc0 => take_int(&mut buf, 2)?,
                    0xd0 => take_int(&mut buf, 4)?,
                    0xe0 => take_int(&mut buf, 8)?,
                    0xf0 => take_int(&mut buf, 3)?,
                    0xfe => take_int(&mut buf, 1)?,
                    0xf1..=0xfd => i64::from(header & 0x0f) - 1,
                    _ => return Err(RdbError::Malformed("unknown ziplist entry encoding")),
                };
                n.to_string().into_bytes()
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

/// Decodes the members of an intset as decimal text.
pub(super) fn parse_intset(blob: &[u8]) -> Result<Vec<Vec<u8>>, RdbError> {
    let mut buf = blob;
    let width = take_int(&mut buf, 4)? as usize;
    if !matches!(width, 2 | 4 | 8) {
        return Err(RdbError::Malformed("unknown intset encoding"));
    }
    let len = take_int(&mut buf, 4)? as u32;

    (0..len)
        .map(|_| -> Result<Vec<u8>, RdbError> {
            Ok(take_int(&mut buf, width)?.to_string().into_bytes())
        })
        .collect()
}
