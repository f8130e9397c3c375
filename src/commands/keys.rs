use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::error::StoreError;
use crate::frame::Frame;
use crate::keyspace::Keyspace;

/// Returns all keys matching the glob-style `pattern`.
///
/// Ref: <https://redis.io/docs/latest/commands/keys/>
#[derive(Debug, PartialEq)]
pub struct Keys {
    pub pattern: Bytes,
}

impl Executable for Keys {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        let keys = keyspace.keys(&self.pattern)?;
        Ok(Frame::Array(keys.into_iter().map(Frame::Bulk).collect()))
    }
}

impl TryFrom<&mut CommandParser> for Keys {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let pattern = parser.next_bytes()?;
        Ok(Self { pattern })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{bulk, request};
    use crate::commands::Command;
    use crate::keyspace::tests::keyspace;

    fn sorted(frame: Frame) -> Frame {
        match frame {
            Frame::Array(mut frames) => {
                frames.sort_by_key(|frame| frame.to_string());
                Frame::Array(frames)
            }
            frame => frame,
        }
    }

    #[test]
    fn matches_pattern() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace.set(b"user:1", b"a").unwrap();
        keyspace.sadd(b"user:2", &[Bytes::from("b")]).unwrap();
        keyspace.set(b"other", b"c").unwrap();

        let cmd = Command::try_from(request(&["KEYS", "user:*"])).unwrap();
        assert_eq!(
            sorted(cmd.exec(&mut keyspace).unwrap()),
            Frame::Array(vec![bulk("user:1"), bulk("user:2")])
        );

        let cmd = Command::try_from(request(&["KEYS", "*"])).unwrap();
        match cmd.exec(&mut keyspace).unwrap() {
            Frame::Array(frames) => assert_eq!(frames.len(), 3),
            frame => panic!("unexpected reply {frame:?}"),
        }
    }
}
