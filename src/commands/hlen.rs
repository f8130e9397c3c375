use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns the number of fields contained in the hash stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/hlen/>
#[derive(Debug, PartialEq)]
pub struct Hlen {
    pub key: Bytes,
}

impl Executable for Hlen {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.hlen(&self.key)?))
    }
}

impl TryFrom<&mut CommandParser> for Hlen {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}
