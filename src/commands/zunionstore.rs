use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Computes the union of `numkeys` sorted sets and stores the result in `destination`. Scores of
/// a member are summed, each multiplied by the weight of its source set. Returns the number of
/// members in the resulting set.
///
/// Ref: <https://redis.io/docs/latest/commands/zunionstore/>
#[derive(Debug, PartialEq)]
pub struct ZunionStore {
    pub destination: Bytes,
    pub keys: Vec<Bytes>,
    pub weights: Vec<f64>,
}

impl Executable for ZunionStore {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let count = keyspace.zunionstore(&self.destination, &self.keys, &self.weights)?;
        Ok(Frame::Integer(count))
    }
}

impl TryFrom<&mut CommandParser> for ZunionStore {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let destination = parser.next_bytes()?;

        let numkeys = parser.next_integer()?;
        if numkeys < 1 {
            return Err(CommandParserError::InvalidCommandArgument {
                command: "zunionstore".to_string(),
                argument: numkeys.to_string(),
            });
        }

        let keys = (0..numkeys)
            .map(|_| parser.next_bytes())
            .collect::<Result<Vec<_>, _>>()?;

        let weights = match parser.next_string() {
            Ok(option) if option.eq_ignore_ascii_case("weights") => keys
                .iter()
                .map(|_| parser.next_float())
                .collect::<Result<Vec<_>, _>>()?,
            Ok(option) => {
                return Err(CommandParserError::InvalidCommandArgument {
                    command: "zunionstore".to_string(),
                    argument: option,
                })
            }
            Err(CommandParserError::EndOfStream) => vec![1.0; keys.len()],
            Err(err) => return Err(err),
        };

        Ok(Self {
            destination,
            keys,
            weights,
        })
    }
}
