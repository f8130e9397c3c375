use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Removes the specified keys. A key is ignored if it does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/del/>
#[derive(Debug, PartialEq)]
pub struct Del {
    pub keys: Vec<Bytes>,
}

impl Executable for Del {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        Ok(Frame::Integer(keyspace.delete(&self.keys)?))
    }
}

impl TryFrom<&mut CommandParser> for Del {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let keys = parser.remaining_bytes()?;
        Ok(Self { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::request;
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn multiple_keys() {
        let cmd = Command::try_from(request(&["DEL", "foo", "bar", "baz"])).unwrap();
        assert_eq!(
            cmd,
            Command::Del(Del {
                keys: vec![Bytes::from("foo"), Bytes::from("bar"), Bytes::from("baz")]
            })
        );
    }

    #[test]
    fn zero_keys() {
        let err = Command::try_from(request(&["DEL"])).unwrap_err();
        assert_eq!(
            err,
            CommandParserError::WrongArity {
                command: "del".to_string()
            }
        );
    }

    #[test]
    fn invalid_frame() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("DEL")),
            Frame::Integer(42),
            Frame::Bulk(Bytes::from("foo")),
        ]);
        let err = Command::try_from(frame).unwrap_err();

        assert_eq!(
            err,
            CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: Frame::Integer(42)
            }
        );
    }

    #[test]
    fn deletes_any_type() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace.set(b"string", b"value").unwrap();
        keyspace.sadd(b"set", &[Bytes::from("a")]).unwrap();
        keyspace
            .zadd(b"zset", &[(1.0, Bytes::from("a"))])
            .unwrap();

        let cmd = Command::try_from(request(&["DEL", "string", "set", "zset", "missing"])).unwrap();
        assert_eq!(cmd.exec(&mut keyspace).unwrap(), Frame::Integer(3));
        assert_eq!(keyspace.dbsize().unwrap(), 0);
    }
}
