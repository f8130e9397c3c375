use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Adds all the specified members with the specified scores to the sorted set stored at `key`.
/// Members already present are rescored. Returns the number of members that were newly added.
///
/// Ref: <https://redis.io/docs/latest/commands/zadd/>
#[derive(Debug, PartialEq)]
pub struct Zadd {
    pub key: Bytes,
    pub members: Vec<(f64, Bytes)>,
}

impl Executable for Zadd {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.zadd(&self.key, &self.members)?))
    }
}

impl TryFrom<&mut CommandParser> for Zadd {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;

        let mut members = vec![(parser.next_float()?, parser.next_bytes()?)];
        loop {
            match parser.next_float() {
                Ok(score) => members.push((score, parser.next_bytes()?)),
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(Self { key, members })
    }
}
