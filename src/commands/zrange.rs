use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;
use crate::rdb::format_double;

/// Returns the members of the sorted set at `key` between ranks `start` and `stop`, both
/// inclusive. Negative ranks count from the end.
///
/// Ref: <https://redis.io/docs/latest/commands/zrange/>
#[derive(Debug, PartialEq)]
pub struct Zrange {
    pub key: Bytes,
    pub start: i64,
    pub stop: i64,
    pub with_scores: bool,
}

impl Executable for Zrange {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let range = keyspace.zrange(&self.key, self.start, self.stop)?;
        Ok(range_reply(range, self.with_scores))
    }
}

impl TryFrom<&mut CommandParser> for Zrange {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let start = parser.next_integer()?;
        let stop = parser.next_integer()?;

        let with_scores = match parser.next_string() {
            Ok(option) if option.eq_ignore_ascii_case("withscores") => true,
            Ok(option) => {
                return Err(CommandParserError::InvalidCommandArgument {
                    command: "zrange".to_string(),
                    argument: option,
                })
            }
            Err(CommandParserError::EndOfStream) => false,
            Err(err) => return Err(err),
        };

        Ok(Self {
            key,
            start,
            stop,
            with_scores,
        })
    }
}

/// Members, each followed by its score when `with_scores` is set.
pub(crate) fn range_reply(range: Vec<(Bytes, f64)>, with_scores: bool) -> Frame {
    let mut frames = Vec::with_capacity(if with_scores { range.len() * 2 } else { range.len() });
    for (member, score) in range {
        frames.push(Frame::Bulk(member));
        if with_scores {
            frames.push(Frame::Bulk(Bytes::from(format_double(score))));
        }
    }

    Frame::Array(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{bulk, request};
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    fn populated() -> (tempfile::TempDir, Keyspace) {
        let (dir, keyspace) = keyspace(1);
        keyspace
            .zadd(
                b"z",
                &[
                    (3.0, Bytes::from("c")),
                    (1.0, Bytes::from("a")),
                    (2.0, Bytes::from("b")),
                ],
            )
            .unwrap();
        (dir, keyspace)
    }

    #[test]
    fn ranks() {
        let (_dir, mut keyspace) = populated();

        let cmd = Command::try_from(request(&["ZRANGE", "z", "0", "-1"])).unwrap();
        assert_eq!(
            cmd.exec(&mut keyspace).unwrap(),
            Frame::Array(vec![bulk("a"), bulk("b"), bulk("c")])
        );

        let cmd = Command::try_from(request(&["ZRANGE", "z", "-2", "10"])).unwrap();
        assert_eq!(
            cmd.exec(&mut keyspace).unwrap(),
            Frame::Array(vec![bulk("b"), bulk("c")])
        );

        let cmd = Command::try_from(request(&["ZRANGE", "z", "2", "1"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Array(vec![]));
    }

    #[test]
    fn with_scores() {
        let (_dir, mut keyspace) = populated();

        let cmd = Command::try_from(request(&["ZRANGE", "z", "0", "1", "WithScores"])).unwrap();
        assert_eq!(
            cmd.exec(&mut keyspace).unwrap(),
            Frame::Array(vec![bulk("a"), bulk("1"), bulk("b"), bulk("2")])
        );
    }

    #[test]
    fn unknown_option() {
        let err = Command::try_from(request(&["ZRANGE", "z", "0", "1", "REV"])).unwrap_err();
        assert_eq!(err.to_string(), "ERR syntax error");
    }
}
