//! The RDB binary format, version 7.
//!
//! [`dump_value`] and [`load_value`] handle the single-object payloads of
//! `DUMP` and `RESTORE`:
//!
//! ```text
//! +------+--------+-----------------+------------------+
//! | type | body   | version (u16 LE)| crc64 (u64 LE)   |
//! +------+--------+-----------------+------------------+
//! ```
//!
//! [`save_snapshot`] and [`load_snapshot`] handle whole-instance snapshot files:
//!
//! ```text
//! | REDIS0007 | AUX pairs | SELECTDB n | RESIZEDB | entries... | EOF | crc64 |
//! ```

mod crc64;
mod dump;
mod load;
mod snapshot;
mod ziplist;

use thiserror::Error as ThisError;

pub use crc64::crc64;
pub use dump::{dump_value, format_double, ObjectDumper};
pub use load::{load_value, ObjectLoader};
pub use snapshot::{load_from_file, load_snapshot, save_snapshot, save_to_file, SNAPSHOT_FILE};

pub const RDB_VERSION: u16 = 7;
pub const MAGIC: &[u8; 5] = b"REDIS";
/// Reported in the `redis-ver` aux field of saved snapshots.
pub const REDIS_VER: &str = "3.2.0";

pub mod object_type {
    pub const STRING: u8 = 0;
    pub const SET: u8 = 2;
    pub const ZSET: u8 = 3;
    pub const HASH: u8 = 4;
    pub const SET_INTSET: u8 = 11;
    pub const ZSET_ZIPLIST: u8 = 12;
    pub const HASH_ZIPLIST: u8 = 13;
}

pub mod opcode {
    pub const AUX: u8 = 250;
    pub const RESIZEDB: u8 = 251;
    pub const EXPIRETIME_MS: u8 = 252;
    pub const EXPIRETIME: u8 = 253;
    pub const SELECTDB: u8 = 254;
    pub const EOF: u8 = 255;
}

pub mod encoding {
    pub const LEN_6BIT: u8 = 0;
    pub const LEN_14BIT: u8 = 1;
    pub const LEN_32BIT: u8 = 0x80;
    pub const LEN_64BIT: u8 = 0x81;
    pub const ENCVAL: u8 = 3;

    pub const INT8: u8 = 0;
    pub const INT16: u8 = 1;
    pub const INT32: u8 = 2;
    pub const LZF: u8 = 3;

    pub const DOUBLE_NAN: u8 = 253;
    pub const DOUBLE_POS_INF: u8 = 254;
    pub const DOUBLE_NEG_INF: u8 = 255;
}

#[derive(Debug, ThisError)]
pub enum RdbError {
    #[error("ERR Wrong signature trying to load DB from file")]
    BadMagic,
    #[error("ERR Can't handle RDB format version {0}")]
    UnsupportedVersion(String),
    #[error("ERR Wrong RDB checksum (expected {expected:#018x}, got {computed:#018x})")]
    ChecksumMismatch { expected: u64, computed: u64 },
    #[error("ERR DUMP payload version or checksum are wrong")]
    BadPayload,
    #[error("ERR Bad data format; unexpected end of input")]
    Truncated,
    #[error("ERR Bad data format; unknown string encoding {0}")]
    UnknownEncoding(u8),
    #[error("ERR Bad data format; unsupported object type {0}")]
    UnsupportedType(u8),
    #[error("ERR Bad data format; invalid double")]
    InvalidDouble,
    #[error("ERR Bad data format; {0}")]
    Malformed(&'static str),
    #[error("ERR length {0} does not fit the RDB length encoding")]
    LengthTooLarge(u64),
    #[error("ERR RDB I/O error: {0}")]
    Io(#[from] std::io::Error),
}
