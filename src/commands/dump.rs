use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Serialize the value stored at `key` in the RDB object format and return it to the user. The
/// returned value can be synthesized back into a key using [`super::restore::Restore`].
///
/// Ref: <https://redis.io/docs/latest/commands/dump/>
#[derive(Debug, PartialEq)]
pub struct Dump {
    pub key: Bytes,
}

impl Executable for Dump {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        match keyspace.dump(&self.key)? {
            Some(payload) => Ok(Frame::Bulk(Bytes::from(payload))),
            None => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Dump {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}
