use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;
use crate::rdb;

/// Performs a synchronous save of every database, producing an RDB snapshot in the data
/// directory.
///
/// Ref: <https://redis.io/docs/latest/commands/save/>
#[derive(Debug, PartialEq)]
pub struct Save;

impl Executable for Save {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let manager = keyspace.manager();
        rdb::save_to_file(manager, &manager.snapshot_path())?;
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Save {
    type Error = CommandParserError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}
