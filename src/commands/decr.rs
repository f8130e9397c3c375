use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Decrements the number stored at `key` by one.
///
/// Ref: <https://redis.io/docs/latest/commands/decr/>
#[derive(Debug, PartialEq)]
pub struct Decr {
    pub key: Bytes,
}

impl Executable for Decr {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.incr_by(&self.key, -1)?))
    }
}

impl TryFrom<&mut CommandParser> for Decr {
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
    fn decrements() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace.set(b"key", b"10").unwrap();

        let cmd = Command::try_from(request(&["DECR", "key"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(9));
    }

    #[test]
    fn underflow() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace.set(b"key", i64::MIN.to_string().as_bytes()).unwrap();

        let cmd = Command::try_from(request(&["DECR", "key"])).unwrap();
        assert!(matches!(cmd.exec(&mut keyspace), Err(StoreError::Overflow)));
    }
}
