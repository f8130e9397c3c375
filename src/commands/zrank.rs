use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns the rank of `member` in the sorted set stored at `key`, with the scores ordered from
/// low to high. The rank is 0-based.
///
/// Ref: <https://redis.io/docs/latest/commands/zrank/>
#[derive(Debug, PartialEq)]
pub struct Zrank {
    pub key: Bytes,
    pub member: Bytes,
}

impl Executable for Zrank {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        match keyspace.zrank(&self.key, &self.member)? {
            Some(rank) => Ok(Frame::Integer(rank)),
            None => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Zrank {
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
    use crate::commands::tests::request;
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn ties_are_ordered_by_member() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace
            .zadd(
                b"z",
                &[
                    (1.0, Bytes::from("b")),
                    (1.0, Bytes::from("a")),
                    (0.0, Bytes::from("c")),
                ],
            )
            .unwrap();

        let cmd = Command::try_from(request(&["ZRANK", "z", "b"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(2));

        let cmd = Command::try_from(request(&["ZRANK", "z", "c"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(0));

        let cmd = Command::try_from(request(&["ZRANK", "z", "x"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Null);
    }
}
