use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns if `member` is a member of the set stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/sismember/>
#[derive(Debug, PartialEq)]
pub struct Sismember {
    pub key: Bytes,
    pub member: Bytes,
}

impl Executable for Sismember {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let found = keyspace.sismember(&self.key, &self.member)?;
        Ok(Frame::Integer(i64::from(found)))
    }
}

impl TryFrom<&mut CommandParser> for Sismember {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let member = parser.next_bytes()?;

        Ok(Self { key, member })
    }
}
