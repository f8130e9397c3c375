use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Sets the specified fields to their respective values in the hash stored at `key`. Returns
/// the number of fields that were added.
///
/// Ref: <https://redis.io/docs/latest/commands/hset/>
#[derive(Debug, PartialEq)]
pub struct Hset {
    pub key: Bytes,
    pub pairs: Vec<(Bytes, Bytes)>,
}

impl Executable for Hset {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.hset(&self.key, &self.pairs)?))
    }
}

impl TryFrom<&mut CommandParser> for Hset {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;

        let mut pairs = vec![(parser.next_bytes()?, parser.next_bytes()?)];
        loop {
            match parser.next_bytes() {
                Ok(field) => pairs.push((field, parser.next_bytes()?)),
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(Self { key, pairs })
    }
}
