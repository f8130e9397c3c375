use crate::commands::executable::Executable;
use crate::commands::flushdb::parse_flush_mode;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Delete all the keys of all the existing databases. `ASYNC` and `SYNC` are accepted; the flush
/// always completes before the reply.
///
/// Ref: <https://redis.io/docs/latest/commands/flushall/>
#[derive(Debug, PartialEq)]
pub struct FlushAll;

impl Executable for FlushAll {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        keyspace.flushall()?;
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for FlushAll {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parse_flush_mode(parser, "flushall")?;
        Ok(Self)
    }
}
