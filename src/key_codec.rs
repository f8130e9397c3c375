//! Flat key layout for composite Redis objects.
//!
//! Every backend key has the shape
//!
//! ```text
//! +-----+--------------+------------+-------------+
//! | tag | len (u32 BE) | identifier | [component] |
//! +-----+--------------+------------+-------------+
//! ```
//!
//! Container keys (string, set, hash, zset) use the user-visible name as the
//! identifier. Component keys (members, fields, scores) use the object's key id,
//! a random 16-byte value stored in the container's value together with a
//! component count. Deleting an object only has to drop the container to make
//! the name unresolvable; components are reclaimed later by the garbage
//! collector through tombstone keys.

use thiserror::Error as ThisError;
use uuid::Uuid;

use crate::float_codec;

/// Length of the opaque identifier assigned to every composite object.
pub const KEY_ID_LEN: usize = 16;

const LEN_PREFIX: usize = 4;
const HEADER_LEN: usize = 1 + LEN_PREFIX;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum KeyCodecError {
    #[error("ERR corrupt key; expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("ERR corrupt key; unknown tag {0:#04x}")]
    UnknownTag(u8),
    #[error("ERR corrupt key; malformed score component")]
    MalformedScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum KeyKind {
    String = 0x01,
    Set = 0x02,
    SetMember = 0x03,
    Hash = 0x04,
    HashField = 0x05,
    ZSet = 0x06,
    ZSetValue = 0x07,
    ZSetScore = 0x08,
    Tombstone = 0x7f,
}

impl KeyKind {
    /// Kinds whose keys are addressed by the user-visible name.
    pub const CONTAINERS: [KeyKind; 4] = [KeyKind::String, KeyKind::Set, KeyKind::Hash, KeyKind::ZSet];

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Component kinds owned by a container kind.
    pub fn components(self) -> &'static [KeyKind] {
        match self {
            KeyKind::Set => &[KeyKind::SetMember],
            KeyKind::Hash => &[KeyKind::HashField],
            KeyKind::ZSet => &[KeyKind::ZSetValue, KeyKind::ZSetScore],
            _ => &[],
        }
    }
}

impl TryFrom<u8> for KeyKind {
    type Error = KeyCodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::String),
            0x02 => Ok(Self::Set),
            0x03 => Ok(Self::SetMember),
            0x04 => Ok(Self::Hash),
            0x05 => Ok(Self::HashField),
            0x06 => Ok(Self::ZSet),
            0x07 => Ok(Self::ZSetValue),
            0x08 => Ok(Self::ZSetScore),
            0x7f => Ok(Self::Tombstone),
            _ => Err(KeyCodecError::UnknownTag(byte)),
        }
    }
}

/// A backend key split back into its parts.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedKey<'a> {
    pub kind: KeyKind,
    pub length: u32,
    pub identifier: &'a [u8],
    pub component: &'a [u8],
}

/// Builds the backend key for `(kind, identifier, component)`.
pub fn encode(kind: KeyKind, identifier: &[u8], component: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(HEADER_LEN + identifier.len() + component.len());
    key.push(kind.tag());
    key.extend_from_slice(&(identifier.len() as u32).to_be_bytes());
    key.extend_from_slice(identifier);
    key.extend_from_slice(component);
    key
}

/// The shared prefix of every key of `kind` under `identifier`.
pub fn prefix(kind: KeyKind, identifier: &[u8]) -> Vec<u8> {
    encode(kind, identifier, &[])
}

/// The prefix covering every key of `kind`, regardless of identifier.
pub fn kind_prefix(kind: KeyKind) -> Vec<u8> {
    vec![kind.tag()]
}

pub fn decode(bytes: &[u8]) -> Result<DecodedKey<'_>, KeyCodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(KeyCodecError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let kind = KeyKind::try_from(bytes[0])?;
    let length = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

    let end = HEADER_LEN + length as usize;
    if bytes.len() < end {
        return Err(KeyCodecError::Truncated {
            expected: end,
            actual: bytes.len(),
        });
    }

    Ok(DecodedKey {
        kind,
        length,
        identifier: &bytes[HEADER_LEN..end],
        component: &bytes[end..],
    })
}

/// Splits a sorted-set score component into its score and member.
pub fn split_score(component: &[u8]) -> Result<(f64, &[u8]), KeyCodecError> {
    let score = float_codec::decode_prefix(component).ok_or(KeyCodecError::MalformedScore)?;
    Ok((score, &component[float_codec::ENCODED_LEN..]))
}

/// Builds the `score || member` component of a sorted-set score key.
pub fn score_component(score: f64, member: &[u8]) -> Vec<u8> {
    let mut component = Vec::with_capacity(float_codec::ENCODED_LEN + member.len());
    component.extend_from_slice(&float_codec::encode(score));
    component.extend_from_slice(member);
    component
}

/// Allocates a fresh key id for a composite object.
pub fn new_key_id() -> [u8; KEY_ID_LEN] {
    *Uuid::new_v4().as_bytes()
}

/// Container value: `key_id || count (u64 BE)`.
pub fn encode_container(key_id: &[u8], count: u64) -> Vec<u8> {
    let mut value = Vec::with_capacity(key_id.len() + 8);
    value.extend_from_slice(key_id);
    value.extend_from_slice(&count.to_be_bytes());
    value
}

/// Reads the identifier and component count out of a container value.
///
/// Containers written before key ids existed store only a bare count, so any
/// value shorter than [`KEY_ID_LEN`] resolves to the object name itself. The
/// count is `None` when it is missing or unreadable, in which case callers
/// count components with a scan.
pub fn decode_identifier_and_length(stored: &[u8], name: &[u8]) -> (Vec<u8>, Option<u64>) {
    if stored.len() >= KEY_ID_LEN {
        let (key_id, count) = stored.split_at(KEY_ID_LEN);
        (key_id.to_vec(), decode_count(count))
    } else {
        (name.to_vec(), decode_count(stored))
    }
}

fn decode_count(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }

    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}
