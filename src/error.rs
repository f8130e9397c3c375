use thiserror::Error as ThisError;

use crate::backend::BackendError;
use crate::commands::CommandParserError;
use crate::key_codec::KeyCodecError;
use crate::rdb::RdbError;

/// Errors surfaced by keyspace operations.
///
/// The `Display` text of each variant is the Redis error reply sent to
/// clients.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("ERR syntax error")]
    Syntax,
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR min or max is not a float")]
    NotFloat,
    #[error("ERR value is not a valid float")]
    InvalidFloat,
    #[error("ERR increment or decrement would overflow")]
    Overflow,
    #[error("ERR DB index is out of range")]
    DbIndexOutOfRange,
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("BUSYKEY Target key name already exists.")]
    BusyKey,
    #[error("ERR {0}")]
    Script(String),
    #[error(transparent)]
    Command(#[from] CommandParserError),
    #[error(transparent)]
    Rdb(#[from] RdbError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    CorruptKey(#[from] KeyCodecError),
}

pub type StoreResult<T> = Result<T, StoreError>;
