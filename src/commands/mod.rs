pub mod dbsize;
pub mod decr;
pub mod decrby;
pub mod del;
pub mod dump;
pub mod eval;
pub mod executable;
pub mod exists;
pub mod flushall;
pub mod flushdb;
pub mod get;
pub mod hdel;
pub mod hget;
pub mod hgetall;
pub mod hincrby;
pub mod hkeys;
pub mod hlen;
pub mod hset;
pub mod hvals;
pub mod incr;
pub mod incrby;
pub mod keys;
pub mod ping;
pub mod restore;
pub mod sadd;
pub mod save;
pub mod scard;
pub mod select;
pub mod set;
pub mod sismember;
pub mod smembers;
pub mod srem;
pub mod type_;
pub mod zadd;
pub mod zcard;
pub mod zrange;
pub mod zrangebyscore;
pub mod zrank;
pub mod zrem;
pub mod zscore;
pub mod zunionstore;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::error::{StoreError, StoreResult};
use crate::frame::Frame;
use crate::keyspace::Keyspace;
use crate::script::ScriptHost;

use dbsize::DBSize;
use decr::Decr;
use decrby::DecrBy;
use del::Del;
use dump::Dump;
use eval::Eval;
use exists::Exists;
use flushall::FlushAll;
use flushdb::FlushDb;
use get::Get;
use hdel::Hdel;
use hget::Hget;
use hgetall::Hgetall;
use hincrby::HincrBy;
use hkeys::Hkeys;
use hlen::Hlen;
use hset::Hset;
use hvals::Hvals;
use incr::Incr;
use incrby::IncrBy;
use keys::Keys;
use ping::Ping;
use restore::Restore;
use sadd::Sadd;
use save::Save;
use scard::Scard;
use select::Select;
use set::Set;
use sismember::Sismember;
use smembers::Smembers;
use srem::Srem;
use type_::Type;
use zadd::Zadd;
use zcard::Zcard;
use zrange::Zrange;
use zrangebyscore::ZrangeByScore;
use zrank::Zrank;
use zrem::Zrem;
use zscore::Zscore;
use zunionstore::ZunionStore;

#[derive(Debug, PartialEq)]
pub enum Command {
    Get(Get),
    Set(Set),
    Incr(Incr),
    IncrBy(IncrBy),
    Decr(Decr),
    DecrBy(DecrBy),

    Sadd(Sadd),
    Srem(Srem),
    Smembers(Smembers),
    Sismember(Sismember),
    Scard(Scard),

    Hset(Hset),
    Hget(Hget),
    Hdel(Hdel),
    Hgetall(Hgetall),
    Hkeys(Hkeys),
    Hvals(Hvals),
    Hlen(Hlen),
    HincrBy(HincrBy),

    Zadd(Zadd),
    Zrem(Zrem),
    Zscore(Zscore),
    Zcard(Zcard),
    Zrange(Zrange),
    ZrangeByScore(ZrangeByScore),
    Zrank(Zrank),
    ZunionStore(ZunionStore),

    DBsize(DBSize),
    Del(Del),
    Exists(Exists),
    Keys(Keys),
    Type(Type),
    Dump(Dump),
    Restore(Restore),

    Eval(Eval),
    FlushAll(FlushAll),
    FlushDb(FlushDb),
    Ping(Ping),
    Save(Save),
    Select(Select),
}

impl Command {
    /// Whether the command does whole-database work (snapshot files, store
    /// resets) that must not run on an async worker.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Command::FlushAll(_) | Command::FlushDb(_) | Command::Save(_)
        )
    }
}

impl Executable for Command {
    fn exec(self, keyspace: &mut Keyspace) -> Result<Frame, StoreError> {
        match self {
            Command::Get(cmd) => cmd.exec(keyspace),
            Command::Set(cmd) => cmd.exec(keyspace),
            Command::Incr(cmd) => cmd.exec(keyspace),
            Command::IncrBy(cmd) => cmd.exec(keyspace),
            Command::Decr(cmd) => cmd.exec(keyspace),
            Command::DecrBy(cmd) => cmd.exec(keyspace),
            Command::Sadd(cmd) => cmd.exec(keyspace),
            Command::Srem(cmd) => cmd.exec(keyspace),
            Command::Smembers(cmd) => cmd.exec(keyspace),
            Command::Sismember(cmd) => cmd.exec(keyspace),
            Command::Scard(cmd) => cmd.exec(keyspace),
            Command::Hset(cmd) => cmd.exec(keyspace),
            Command::Hget(cmd) => cmd.exec(keyspace),
            Command::Hdel(cmd) => cmd.exec(keyspace),
            Command::Hgetall(cmd) => cmd.exec(keyspace),
            Command::Hkeys(cmd) => cmd.exec(keyspace),
            Command::Hvals(cmd) => cmd.exec(keyspace),
            Command::Hlen(cmd) => cmd.exec(keyspace),
            Command::HincrBy(cmd) => cmd.exec(keyspace),
            Command::Zadd(cmd) => cmd.exec(keyspace),
            Command::Zrem(cmd) => cmd.exec(keyspace),
            Command::Zscore(cmd) => cmd.exec(keyspace),
            Command::Zcard(cmd) => cmd.exec(keyspace),
            Command::Zrange(cmd) => cmd.exec(keyspace),
            Command::ZrangeByScore(cmd) => cmd.exec(keyspace),
            Command::Zrank(cmd) => cmd.exec(keyspace),
            Command::ZunionStore(cmd) => cmd.exec(keyspace),
            Command::DBsize(cmd) => cmd.exec(keyspace),
            Command::Del(cmd) => cmd.exec(keyspace),
            Command::Exists(cmd) => cmd.exec(keyspace),
            Command::Keys(cmd) => cmd.exec(keyspace),
            Command::Type(cmd) => cmd.exec(keyspace),
            Command::Dump(cmd) => cmd.exec(keyspace),
            Command::Restore(cmd) => cmd.exec(keyspace),
            Command::Eval(cmd) => cmd.exec(keyspace),
            Command::FlushAll(cmd) => cmd.exec(keyspace),
            Command::FlushDb(cmd) => cmd.exec(keyspace),
            Command::Ping(cmd) => cmd.exec(keyspace),
            Command::Save(cmd) => cmd.exec(keyspace),
            Command::Select(cmd) => cmd.exec(keyspace),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandParserError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                })
            }
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
        };

        let command_name = parser.parse_command_name()?;

        let command = match &command_name[..] {
            "get" => Get::try_from(&mut *parser).map(Command::Get),
            "set" => Set::try_from(&mut *parser).map(Command::Set),
            "incr" => Incr::try_from(&mut *parser).map(Command::Incr),
            "incrby" => IncrBy::try_from(&mut *parser).map(Command::IncrBy),
            "decr" => Decr::try_from(&mut *parser).map(Command::Decr),
            "decrby" => DecrBy::try_from(&mut *parser).map(Command::DecrBy),
            "sadd" => Sadd::try_from(&mut *parser).map(Command::Sadd),
            "srem" => Srem::try_from(&mut *parser).map(Command::Srem),
            "smembers" => Smembers::try_from(&mut *parser).map(Command::Smembers),
            "sismember" => Sismember::try_from(&mut *parser).map(Command::Sismember),
            "scard" => Scard::try_from(&mut *parser).map(Command::Scard),
            "hset" => Hset::try_from(&mut *parser).map(Command::Hset),
            "hget" => Hget::try_from(&mut *parser).map(Command::Hget),
            "hdel" => Hdel::try_from(&mut *parser).map(Command::Hdel),
            "hgetall" => Hgetall::try_from(&mut *parser).map(Command::Hgetall),
            "hkeys" => Hkeys::try_from(&mut *parser).map(Command::Hkeys),
            "hvals" => Hvals::try_from(&mut *parser).map(Command::Hvals),
            "hlen" => Hlen::try_from(&mut *parser).map(Command::Hlen),
            "hincrby" => HincrBy::try_from(&mut *parser).map(Command::HincrBy),
            "zadd" => Zadd::try_from(&mut *parser).map(Command::Zadd),
            "zrem" => Zrem::try_from(&mut *parser).map(Command::Zrem),
            "zscore" => Zscore::try_from(&mut *parser).map(Command::Zscore),
            "zcard" => Zcard::try_from(&mut *parser).map(Command::Zcard),
            "zrange" => Zrange::try_from(&mut *parser).map(Command::Zrange),
            "zrangebyscore" => ZrangeByScore::try_from(&mut *parser).map(Command::ZrangeByScore),
            "zrank" => Zrank::try_from(&mut *parser).map(Command::Zrank),
            "zunionstore" => ZunionStore::try_from(&mut *parser).map(Command::ZunionStore),
            "dbsize" => DBSize::try_from(&mut *parser).map(Command::DBsize),
            "del" => Del::try_from(&mut *parser).map(Command::Del),
            "exists" => Exists::try_from(&mut *parser).map(Command::Exists),
            "keys" => Keys::try_from(&mut *parser).map(Command::Keys),
            "type" => Type::try_from(&mut *parser).map(Command::Type),
            "dump" => Dump::try_from(&mut *parser).map(Command::Dump),
            "restore" => Restore::try_from(&mut *parser).map(Command::Restore),
            "eval" => Eval::try_from(&mut *parser).map(Command::Eval),
            "flushall" => FlushAll::try_from(&mut *parser).map(Command::FlushAll),
            "flushdb" => FlushDb::try_from(&mut *parser).map(Command::FlushDb),
            "ping" => Ping::try_from(&mut *parser).map(Command::Ping),
            "save" => Save::try_from(&mut *parser).map(Command::Save),
            "select" => Select::try_from(&mut *parser).map(Command::Select),
            _ => {
                return Err(CommandParserError::UnknownCommand {
                    command: command_name,
                })
            }
        };

        command
            .and_then(|command| parser.finish().map(|_| command))
            .map_err(|err| match err {
                CommandParserError::EndOfStream => CommandParserError::WrongArity {
                    command: command_name,
                },
                err => err,
            })
    }
}

/// Runs commands issued by a script against the script's keyspace.
impl ScriptHost for Keyspace {
    fn call(&mut self, args: Vec<Bytes>) -> StoreResult<Frame> {
        let frame = Frame::Array(args.into_iter().map(Frame::Bulk).collect());

        match Command::try_from(frame)? {
            Command::Eval(_) => Err(StoreError::Script(
                "This Redis command is not allowed from scripts".to_string(),
            )),
            command => command.exec(self),
        }
    }
}

pub struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        let command_name = self
            .parts
            .next()
            .ok_or(CommandParserError::EndOfStream)?;

        match command_name {
            Frame::Simple(s) => Ok(s.to_lowercase()),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_lowercase())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple string".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_string(&mut self) -> Result<String, CommandParserError> {
        let bytes = self.next_bytes()?;

        str::from_utf8(&bytes[..])
            .map(|s| s.to_string())
            .map_err(CommandParserError::InvalidUTF8String)
    }

    fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        let frame = self
            .parts
            .next()
            .ok_or(CommandParserError::EndOfStream)?;

        match frame {
            Frame::Integer(i) => Ok(i),
            Frame::Simple(string) => string
                .parse::<i64>()
                .map_err(|_| CommandParserError::NotInteger),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandParserError::NotInteger),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "integer".to_string(),
                actual: frame,
            }),
        }
    }

    /// Parses a double, accepting `inf`, `+inf` and `-inf`.
    fn next_float(&mut self) -> Result<f64, CommandParserError> {
        let bytes = self.next_bytes()?;

        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or(CommandParserError::NotFloat)
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        let frame = self
            .parts
            .next()
            .ok_or(CommandParserError::EndOfStream)?;

        match frame {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Collects every remaining argument, requiring at least one.
    fn remaining_bytes(&mut self) -> Result<Vec<Bytes>, CommandParserError> {
        let mut values = vec![self.next_bytes()?];
        loop {
            match self.next_bytes() {
                Ok(value) => values.push(value),
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(values)
    }

    /// Fails when arguments are left over.
    fn finish(&mut self) -> Result<(), CommandParserError> {
        match self.parts.next() {
            None => Ok(()),
            Some(_) => Err(CommandParserError::EndOfStream),
        }
    }
}

/// Reasons a request cannot be turned into a [`Command`]. The `Display` text
/// is the error reply.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR Protocol error: expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR syntax error")]
    InvalidCommandArgument { command: String, argument: String },
    #[error("ERR Protocol error: invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("ERR wrong number of arguments")]
    EndOfStream,
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR value is not a valid float")]
    NotFloat,
    #[error("ERR min or max is not a float")]
    InvalidScoreBound,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A request frame as clients send it: an array of bulk strings.
    pub(crate) fn request(args: &[&str]) -> Frame {
        Frame::Array(
            args.iter()
                .map(|arg| Frame::Bulk(Bytes::from(arg.to_string())))
                .collect(),
        )
    }

    pub(crate) fn bulk(value: &str) -> Frame {
        Frame::Bulk(Bytes::from(value.to_string()))
    }

    #[test]
    fn parse_command_name_case_insensitive() {
        let frame = Frame::Array(vec![
            Frame::Simple(String::from("GeT")),
            Frame::Simple(String::from("foo")),
        ]);

        assert_eq!(
            Command::try_from(frame).unwrap(),
            Command::Get(Get {
                key: Bytes::from("foo")
            })
        );
    }

    #[test]
    fn unknown_command() {
        let err = Command::try_from(request(&["FLY", "away"])).unwrap_err();

        assert_eq!(
            err,
            CommandParserError::UnknownCommand {
                command: "fly".to_string()
            }
        );
        assert_eq!(err.to_string(), "ERR unknown command 'fly'");
    }

    #[test]
    fn wrong_arity() {
        let err = Command::try_from(request(&["GET"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERR wrong number of arguments for 'get' command"
        );

        let err = Command::try_from(request(&["GET", "a", "b"])).unwrap_err();
        assert_eq!(
            err,
            CommandParserError::WrongArity {
                command: "get".to_string()
            }
        );
    }

    #[test]
    fn requests_must_be_arrays() {
        let err = Command::try_from(bulk("GET")).unwrap_err();

        assert_eq!(
            err,
            CommandParserError::InvalidFrame {
                expected: "array".to_string(),
                actual: bulk("GET"),
            }
        );
    }

    #[test]
    fn parse_errors_become_store_errors() {
        let err: StoreError = Command::try_from(request(&["INCRBY", "k", "x"]))
            .unwrap_err()
            .into();

        assert_eq!(err.to_string(), "ERR value is not an integer or out of range");
    }
}
