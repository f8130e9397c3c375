use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Increments the number stored at `field` in the hash stored at `key` by `increment`.
///
/// Ref: <https://redis.io/docs/latest/commands/hincrby/>
#[derive(Debug, PartialEq)]
pub struct HincrBy {
    pub key: Bytes,
    pub field: Bytes,
    pub increment: i64,
}

impl Executable for HincrBy {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let value = keyspace.hincr_by(&self.key, &self.field, self.increment)?;
        Ok(Frame::Integer(value))
    }
}

impl TryFrom<&mut CommandParser> for HincrBy {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let field = parser.next_bytes()?;
        let increment = parser.next_integer()?;

        Ok(Self {
            key,
            field,
            increment,
        })
    }
}
