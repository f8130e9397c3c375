use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Increments the number stored at `key` by one.
///
/// Ref: <https://redis.io/docs/latest/commands/incr/>
#[derive(Debug, PartialEq)]
pub struct Incr {
    pub key: Bytes,
}

impl Executable for Incr {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.incr_by(&self.key, 1)?))
    }
}

impl TryFrom<&mut CommandParser> for Incr {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::request;
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn missing_key_starts_at_zero() {
        let (_dir, mut keyspace) = keyspace(1);

        for expected in 1..=3 {
            let cmd = Command::try_from(request(&["INCR", "counter"])).unwrap();
            assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(expected));
        }
    }

    #[test]
    fn invalid_value() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace.set(b"key", b"value").unwrap();

        let cmd = Command::try_from(request(&["INCR", "key"])).unwrap();
        let err = cmd.exec(&mut keyspace).unwrap_err();

        assert_eq!(err.to_string(), "ERR value is not an integer or out of range");
        assert_eq!(keyspace.get(b"key").unwrap(), Some(Bytes::from("value")));
    }
}
