//! Hooks for an embedded script engine.
//!
//! No engine ships with the server. An embedder provides a [`ScriptBridge`],
//! and scripts reach the keyspace back through [`ScriptHost::call`], which
//! dispatches through the same command table as network clients.

use bytes::Bytes;

use crate::error::StoreResult;
use crate::frame::Frame;

pub trait ScriptBridge: Send + Sync {
    /// Runs `script` with `KEYS` and `ARGV` bound, returning its reply.
    fn eval(
        &self,
        script: &str,
        keys: &[Bytes],
        argv: &[Bytes],
        host: &mut dyn ScriptHost,
    ) -> StoreResult<Frame>;
}

/// The server side of a running script.
pub trait ScriptHost {
    /// Executes one command, `args[0]` being its name. Error replies come
    /// back as `Err`.
    fn call(&mut self, args: Vec<Bytes>) -> StoreResult<Frame>;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::StoreError;
    use crate::keyspace::tests::keyspace;

    /// Understands two scripts: `set-and-get`, which stores `ARGV[1]` at
    /// `KEYS[1]` and reads it back, and `call`, which runs `ARGV` as a command.
    pub(crate) struct TestBridge;

    impl ScriptBridge for TestBridge {
        fn eval(
            &self,
            script: &str,
            keys: &[Bytes],
            argv: &[Bytes],
            host: &mut dyn ScriptHost,
        ) -> StoreResult<Frame> {
            match script {
                "set-and-get" => {
                    host.call(vec![Bytes::from("SET"), keys[0].clone(), argv[0].clone()])?;
                    host.call(vec![Bytes::from("GET"), keys[0].clone()])
                }
                "call" => host.call(argv.to_vec()),
                _ => Err(StoreError::Script("unknown script".to_string())),
            }
        }
    }

    #[test]
    fn scripts_run_commands_on_the_keyspace() {
        let (_dir, keyspace) = keyspace(1);
        let mut keyspace = keyspace.with_script_bridge(Arc::new(TestBridge));

        let reply = keyspace
            .eval("set-and-get", &[Bytes::from("key")], &[Bytes::from("value")])
            .unwrap();

        assert_eq!(reply, Frame::Bulk(Bytes::from("value")));
        assert_eq!(keyspace.get(b"key").unwrap(), Some(Bytes::from("value")));
    }

    #[test]
    fn script_errors_are_typed() {
        let (_dir, keyspace) = keyspace(1);
        let mut keyspace = keyspace.with_script_bridge(Arc::new(TestBridge));
        keyspace.sadd(b"set", &[Bytes::from("a")]).unwrap();

        let err = keyspace
            .eval("call", &[], &[Bytes::from("GET"), Bytes::from("set")])
            .unwrap_err();
        assert!(matches!(err, StoreError::WrongType));

        let err = keyspace
            .eval("call", &[], &[Bytes::from("NOPE")])
            .unwrap_err();
        assert_eq!(err.to_string(), "ERR unknown command 'nope'");
    }

    #[test]
    fn scripts_cannot_nest() {
        let (_dir, keyspace) = keyspace(1);
        let mut keyspace = keyspace.with_script_bridge(Arc::new(TestBridge));

        let err = keyspace
            .eval(
                "call",
                &[],
                &[Bytes::from("EVAL"), Bytes::from("call"), Bytes::from("0")],
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERR This Redis command is not allowed from scripts"
        );
    }
}
