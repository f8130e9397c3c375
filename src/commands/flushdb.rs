use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Delete all the keys of the currently selected database. `ASYNC` and `SYNC` are accepted; the
/// flush always completes before the reply.
///
/// Ref: <https://redis.io/docs/latest/commands/flushdb/>
#[derive(Debug, PartialEq)]
pub struct FlushDb;

impl Executable for FlushDb {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        keyspace.flushdb()?;
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for FlushDb {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parse_flush_mode(parser, "flushdb")?;
        Ok(Self)
    }
}

/// Consumes the optional `ASYNC` or `SYNC` modifier.
pub(crate) fn parse_flush_mode(
    parser: &mut CommandParser,
    command: &str,
) -> Result<(), CommandParserError> {
    match parser.next_string() {
        Ok(mode) if mode.eq_ignore_ascii_case("async") || mode.eq_ignore_ascii_case("sync") => {
            Ok(())
        }
        Ok(mode) => Err(CommandParserError::InvalidCommandArgument {
            command: command.to_string(),
            argument: mode,
        }),
        Err(CommandParserError::EndOfStream) => Ok(()),
        Err(err) => Err(err),
    }
}
