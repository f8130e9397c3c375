use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Create a key associated with a value that is obtained by deserializing the provided
/// serialized value (obtained via [`super::dump::Dump`]). Keys do not expire, so `ttl` is
/// accepted and ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/restore/>
#[derive(Debug, PartialEq)]
pub struct Restore {
    pub key: Bytes,
    pub ttl: i64,
    pub payload: Bytes,
    pub replace: bool,
}

impl Executable for Restore {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        keyspace.restore(&self.key, self.ttl, &self.payload, self.replace)?;
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Restore {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let ttl = parser.next_integer()?;
        let payload = parser.next_bytes()?;

        let replace = match parser.next_string() {
            Ok(option) if option.eq_ignore_ascii_case("replace") => true,
            Ok(option) => {
                return Err(CommandParserError::InvalidCommandArgument {
                    command: "restore".to_string(),
                    argument: option,
                })
            }
            Err(CommandParserError::EndOfStream) => false,
            Err(err) => return Err(err),
        };

        Ok(Self {
            key,
            ttl,
            payload,
            replace,
        })
    }
}
