use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Select the Redis logical database having the specified zero-based numeric index. New
/// connections always use the database 0.
///
/// Ref: <https://redis.io/docs/latest/commands/select/>
#[derive(Debug, PartialEq)]
pub struct Select {
    pub index: i64,
}

impl Executable for Select {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        keyspace.select(self.index)?;
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Select {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let index = parser.next_integer()?;
        Ok(Self { index })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::tests::request;
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    #[test]
    fn databases_are_isolated() {
        let (_dir, mut keyspace) = keyspace(2);
        keyspace.set(b"key", b"zero").unwrap();

        let cmd = Command::try_from(request(&["SELECT", "1"])).unwrap();
        assert_eq!(
            cmd.exec(&mut keyspace).unwrap(),
            Frame::Simple("OK".to_string())
        );
        assert_eq!(keyspace.get(b"key").unwrap(), None);

        keyspace.select(0).unwrap();
        assert_eq!(keyspace.get(b"key").unwrap(), Some(Bytes::from("zero")));
    }

    #[test]
    fn out_of_range() {
        let (_dir, mut keyspace) = keyspace(2);

        for index in ["2", "-1"] {
            let cmd = Command::try_from(request(&["SELECT", index])).unwrap();
            let err = cmd.exec(&mut keyspace).unwrap_err();
            assert!(matches!(err, StoreError::DbIndexOutOfRange));
        }
    }
}
