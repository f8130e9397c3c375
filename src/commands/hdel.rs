use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Removes the specified fields from the hash stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/hdel/>
#[derive(Debug, PartialEq)]
pub struct Hdel {
    pub key: Bytes,
    pub fields: Vec<Bytes>,
}

impl Executable for Hdel {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.hdel(&self.key, &self.fields)?))
    }
}

impl TryFrom<&mut CommandParser> for Hdel {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let fields = parser.remaining_bytes()?;

        Ok(Self { key, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::request;
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn removes_fields() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace
            .hset(
                b"h",
                &[
                    (Bytes::from("a"), Bytes::from("1")),
                    (Bytes::from("b"), Bytes::from("2")),
                ],
            )
            .unwrap();

        let cmd = Command::try_from(request(&["HDEL", "h", "a", "x"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(1));
        assert_eq!(keyspace.hlen(b"h").unwrap(), 1);
    }
}
