use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Invoke the execution of a server-side script. The first `numkeys` arguments after the script
/// are key names, the rest are plain arguments.
///
/// Ref: <https://redis.io/docs/latest/commands/eval/>
#[derive(Debug, PartialEq)]
pub struct Eval {
    pub script: String,
    pub keys: Vec<Bytes>,
    pub args: Vec<Bytes>,
}

impl Executable for Eval {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        keyspace.eval(&self.script, &self.keys, &self.args)
    }
}

impl TryFrom<&mut CommandParser> for Eval {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let script = parser.next_string()?;

        let numkeys = parser.next_integer()?;
        if numkeys < 0 {
            return Err(CommandParserError::InvalidCommandArgument {
                command: "eval".to_string(),
                argument: numkeys.to_string(),
            });
        }

        let keys = (0..numkeys)
            .map(|_| parser.next_bytes())
            .collect::<Result<Vec<_>, _>>()?;
        let args = match parser.remaining_bytes() {
            Ok(args) => args,
            Err(CommandParserError::EndOfStream) => Vec::new(),
            Err(err) => return Err(err),
        };

        Ok(Self { script, keys, args })
    }
}
