use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Remove the specified members from the set stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/srem/>
#[derive(Debug, PartialEq)]
pub struct Srem {
    pub key: Bytes,
    pub members: Vec<Bytes>,
}

impl Executable for Srem {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.srem(&self.key, &self.members)?))
    }
}

impl TryFrom<&mut CommandParser> for Srem {
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
    fn removes_existing_members() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace
            .sadd(b"s", &[Bytes::from("a"), Bytes::from("b")])
            .unwrap();

        let cmd = Command::try_from(request(&["SREM", "s", "a", "z"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(1));

        let cmd = Command::try_from(request(&["SREM", "s", "b"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(1));
        assert_eq!(keyspace.key_type(b"s").unwrap(), None);
    }
}
