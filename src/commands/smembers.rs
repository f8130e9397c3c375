use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns all the members of the set stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/smembers/>
#[derive(Debug, PartialEq)]
pub struct Smembers {
    pub key: Bytes,
}

impl Executable for Smembers {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let members = keyspace.smembers(&self.key)?;
        Ok(Frame::Array(members.into_iter().map(Frame::Bulk).collect()))
    }
}

impl TryFrom<&mut CommandParser> for Smembers {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}
