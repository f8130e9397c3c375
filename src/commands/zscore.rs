use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;
use crate::rdb::format_double;

/// Returns the score of `member` in the sorted set at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/zscore/>
#[derive(Debug, PartialEq)]
pub struct Zscore {
    pub key: Bytes,
    pub member: Bytes,
}

impl Executable for Zscore {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        match keyspace.zscore(&self.key, &self.member)? {
            Some(score) => Ok(Frame::Bulk(Bytes::from(format_double(score)))),
            None => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Zscore {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let member = parser.next_bytes()?;

        Ok(Self { key, member })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{bulk, request};
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn formats_scores() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace
            .zadd(
                b"z",
                &[
                    (1.5, Bytes::from("a")),
                    (f64::INFINITY, Bytes::from("b")),
                    (3.0, Bytes::from("c")),
                ],
            )
            .unwrap();

        let cmd = Command::try_from(request(&["ZSCORE", "z", "a"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), bulk("1.5"));

        let cmd = Command::try_from(request(&["ZSCORE", "z", "b"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), bulk("inf"));

        let cmd = Command::try_from(request(&["ZSCORE", "z", "c"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), bulk("3"));

        let cmd = Command::try_from(request(&["ZSCORE", "z", "d"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Null);
    }
}
