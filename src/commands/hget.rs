use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns the value associated with `field` in the hash stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/hget/>
#[derive(Debug, PartialEq)]
pub struct Hget {
    pub key: Bytes,
    pub field: Bytes,
}

impl Executable for Hget {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        match keyspace.hget(&self.key, &self.field)? {
            Some(value) => Ok(Frame::Bulk(value)),
            None => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Hget {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let field = parser.next_bytes()?;

        Ok(Self { key, field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{bulk, request};
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn existing_and_missing_fields() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace
            .hset(b"h", &[(Bytes::from("f"), Bytes::from("v"))])
            .unwrap();

        let cmd = Command::try_from(request(&["HGET", "h", "f"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), bulk("v"));

        let cmd = Command::try_from(request(&["HGET", "h", "g"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Null);
    }
}
