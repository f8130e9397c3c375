use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Add the specified members to the set stored at `key`. Returns how many were not already
/// members.
///
/// Ref: <https://redis.io/docs/latest/commands/sadd/>
#[derive(Debug, PartialEq)]
pub struct Sadd {
    pub key: Bytes,
    pub members: Vec<Bytes>,
}

impl Executable for Sadd {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.sadd(&self.key, &self.members)?))
    }
}

impl TryFrom<&mut CommandParser> for Sadd {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let members = parser.remaining_bytes()?;

        Ok(Self { key, members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::request;
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn counts_new_members() {
        let (_dir, mut keyspace) = keyspace(1);

        let cmd = Command::try_from(request(&["SADD", "s", "a", "b", "a"])).unwrap();
        assert_eq!(
            cmd,
            Command::Sadd(Sadd {
                key: Bytes::from("s"),
                members: vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("a")],
            })
        );
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(2));

        let cmd = Command::try_from(request(&["SADD", "s", "b", "c"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(1));
        assert_eq!(keyspace.scard(b"s").unwrap(), 3);
    }

    #[test]
    fn requires_a_member() {
        let err = Command::try_from(request(&["SADD", "s"])).unwrap_err();
        assert_eq!(
            err,
            CommandParserError::WrongArity {
                command: "sadd".to_string()
            }
        );
    }
}
