use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns how many of the given keys exist. A key mentioned multiple times is counted multiple
/// times.
///
/// Ref: <https://redis.io/docs/latest/commands/exists/>
#[derive(Debug, PartialEq)]
pub struct Exists {
    pub keys: Vec<Bytes>,
}

impl Executable for Exists {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.exists(&self.keys)?))
    }
}

impl TryFrom<&mut CommandParser> for Exists {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let keys = parser.remaining_bytes()?;
        Ok(Self { keys })
    }
}
