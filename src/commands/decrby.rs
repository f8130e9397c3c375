use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Decrements the number stored at `key` by `decrement`.
///
/// Ref: <https://redis.io/docs/latest/commands/decrby/>
#[derive(Debug, PartialEq)]
pub struct DecrBy {
    pub key: Bytes,
    pub decrement: i64,
}

impl Executable for DecrBy {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let delta = self.decrement.checked_neg().ok_or(StoreError::Overflow)?;
        Ok(Frame::Integer(keyspace.incr_by(&self.key, delta)?))
    }
}

impl TryFrom<&mut CommandParser> for DecrBy {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let decrement = parser.next_integer()?;

        Ok(Self { key, decrement })
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

        let cmd = Command::try_from(request(&["DECRBY", "key", "5"])).unwrap();
        assert_eq!(
            cmd,
            Command::DecrBy(DecrBy {
                key: Bytes::from("key"),
                decrement: 5
            })
        );
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(-5));
    }

    #[test]
    fn minimum_decrement_overflows() {
        let (_dir, mut keyspace) = keyspace(1);

        let cmd = Command::try_from(request(&["DECRBY", "key", &i64::MIN.to_string()])).unwrap();
        assert!(matches!(cmd.exec(&mut keyspace), Err(StoreError::Overflow)));
        assert_eq!(keyspace.get(b"key").unwrap(), None);
    }

    #[test]
    fn invalid_decrement() {
        let err = Command::try_from(request(&["DECRBY", "key", "five"])).unwrap_err();
        assert_eq!(err, CommandParserError::NotInteger);
    }
}
