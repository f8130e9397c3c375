use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::zrange::range_reply;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::{Keyspace, ScoreBound};

/// Returns all the members in the sorted set at `key` with a score between `min` and `max`,
/// ordered from low to high scores.
///
/// Ref: <https://redis.io/docs/latest/commands/zrangebyscore/>
#[derive(Debug, PartialEq)]
pub struct ZrangeByScore {
    pub key: Bytes,
    pub min: ScoreBound,
    pub max: ScoreBound,
    pub with_scores: bool,
    pub offset: i64,
    /// Negative means no limit.
    pub count: i64,
}

impl Executable for ZrangeByScore {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let range =
            keyspace.zrange_by_score(&self.key, self.min, self.max, self.offset, self.count)?;
        Ok(range_reply(range, self.with_scores))
    }
}

impl TryFrom<&mut CommandParser> for ZrangeByScore {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let min = next_bound(parser)?;
        let max = next_bound(parser)?;

        let mut with_scores = false;
        let mut offset = 0;
        let mut count = -1;
        loop {
            let option = match parser.next_string() {
                Ok(option) => option.to_lowercase(),
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err),
            };

            match option.as_str() {
                "withscores" => with_scores = true,
                "limit" => {
                    offset = parser.next_integer()?;
                    count = parser.next_integer()?;
                }
                _ => {
                    return Err(CommandParserError::InvalidCommandArgument {
                        command: "zrangebyscore".to_string(),
                        argument: option,
                    })
                }
            }
        }

        Ok(Self {
            key,
            min,
            max,
            with_scores,
            offset,
            count,
        })
    }
}

fn next_bound(parser: &mut CommandParser) -> Result<ScoreBound, CommandParserError> {
    parser
        .next_string()?
        .parse()
        .map_err(|_| CommandParserError::InvalidScoreBound)
}
