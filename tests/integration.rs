use std::future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Value};
use serial_test::serial;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::sleep;

use redikv::config::Config;
use redikv::db::DatabaseManager;
use redikv::gc::GarbageCollector;
use redikv::keyspace::Keyspace;
use redikv::rdb;
use redikv::server::{run, serve};

/// Starts a server on an ephemeral port over in-memory databases.
async fn start_server(dir: &Path) -> SocketAddr {
    let manager = Arc::new(DatabaseManager::in_memory(dir, 16).unwrap());
    let gc = GarbageCollector::new(manager.clone(), Duration::from_millis(10), 100);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(
        listener,
        Keyspace::new(manager),
        gc,
        future::pending::<()>(),
    ));

    addr
}

async fn connect(addr: SocketAddr) -> Result<MultiplexedConnection, RedisError> {
    let client = redis::Client::open(format!("redis://{addr}/"))?;

    let mut attempts = 0;
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(connection) => return Ok(connection),
            Err(_) if attempts < 50 => {
                attempts += 1;
                sleep(Duration::from_millis(20)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn query(
    connection: &mut MultiplexedConnection,
    f: impl FnOnce(&mut redis::Pipeline),
) -> Result<Vec<Value>, RedisError> {
    let mut pipeline = redis::pipe();
    f(&mut pipeline);
    pipeline.query_async(connection).await
}

fn data(value: &str) -> Value {
    Value::Data(value.as_bytes().to_vec())
}

fn array(values: &[&str]) -> Value {
    Value::Bulk(values.iter().map(|v| data(v)).collect())
}

#[tokio::test]
async fn test_strings() {
    let dir = TempDir::new().unwrap();
    let mut connection = connect(start_server(dir.path()).await).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("SET").arg("key_1").arg(1);
        p.cmd("SET").arg("key_2").arg("Argentina");
        p.cmd("GET").arg("key_2");
        p.cmd("GET").arg("nonexistent");
        p.cmd("INCR").arg("key_1");
        p.cmd("INCRBY").arg("key_1").arg(10);
        p.cmd("DECR").arg("counter");
        p.cmd("DECRBY").arg("key_1").arg(20);
    })
    .await
    .unwrap();

    assert_eq!(
        res,
        vec![
            Value::Okay,
            Value::Okay,
            data("Argentina"),
            Value::Nil,
            Value::Int(2),
            Value::Int(12),
            Value::Int(-1),
            Value::Int(-8),
        ]
    );
}

#[tokio::test]
async fn test_sets_and_hashes() {
    let dir = TempDir::new().unwrap();
    let mut connection = connect(start_server(dir.path()).await).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("SADD").arg("set").arg("b").arg("a").arg("b");
        p.cmd("SCARD").arg("set");
        p.cmd("SISMEMBER").arg("set").arg("a");
        p.cmd("SMEMBERS").arg("set");
        p.cmd("SREM").arg("set").arg("a").arg("b");
        p.cmd("EXISTS").arg("set");
        p.cmd("HSET").arg("hash").arg("f1").arg("v1").arg("f2").arg("v2");
        p.cmd("HGET").arg("hash").arg("f2");
        p.cmd("HINCRBY").arg("hash").arg("n").arg(3);
        p.cmd("HGETALL").arg("hash");
        p.cmd("HLEN").arg("hash");
        p.cmd("HDEL").arg("hash").arg("f1");
        p.cmd("HKEYS").arg("hash");
    })
    .await
    .unwrap();

    assert_eq!(
        res,
        vec![
            Value::Int(2),
            Value::Int(2),
            Value::Int(1),
            array(&["a", "b"]),
            Value::Int(2),
            Value::Int(0),
            Value::Int(2),
            data("v2"),
            Value::Int(3),
            array(&["f1", "v1", "f2", "v2", "n", "3"]),
            Value::Int(3),
            Value::Int(1),
            array(&["f2", "n"]),
        ]
    );
}

#[tokio::test]
async fn test_sorted_sets() {
    let dir = TempDir::new().unwrap();
    let mut connection = connect(start_server(dir.path()).await).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("ZADD").arg("z").arg(1).arg("a").arg(2).arg("b").arg(3).arg("c");
        p.cmd("ZADD").arg("z").arg("-inf").arg("a").arg(0.5).arg("d");
        p.cmd("ZCARD").arg("z");
        p.cmd("ZRANGE").arg("z").arg(0).arg(-1);
        p.cmd("ZRANGE").arg("z").arg(-2).arg(-1).arg("WITHSCORES");
        p.cmd("ZRANGEBYSCORE").arg("z").arg("(0.5").arg("+inf").arg("LIMIT").arg(0).arg(1);
        p.cmd("ZSCORE").arg("z").arg("a");
        p.cmd("ZRANK").arg("z").arg("c");
        p.cmd("ZREM").arg("z").arg("a");
        p.cmd("ZUNIONSTORE").arg("u").arg(2).arg("z").arg("z").arg("WEIGHTS").arg(1).arg(2);
        p.cmd("ZRANGE").arg("u").arg(0).arg(-1).arg("WITHSCORES");
    })
    .await
    .unwrap();

    assert_eq!(
        res,
        vec![
            Value::Int(3),
            Value::Int(1),
            Value::Int(4),
            array(&["a", "d", "b", "c"]),
            array(&["b", "2", "c", "3"]),
            array(&["b"]),
            data("-inf"),
            Value::Int(3),
            Value::Int(1),
            Value::Int(3),
            array(&["d", "1.5", "b", "6", "c", "9"]),
        ]
    );
}

#[tokio::test]
async fn test_keyspace_commands() {
    let dir = TempDir::new().unwrap();
    let mut connection = connect(start_server(dir.path()).await).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("PING");
        p.cmd("SET").arg("string").arg("v");
        p.cmd("SADD").arg("set").arg("m");
        p.cmd("TYPE").arg("set");
        p.cmd("TYPE").arg("missing");
        p.cmd("DBSIZE");
        p.cmd("KEYS").arg("s*");
        p.cmd("DEL").arg("set").arg("missing");
        p.cmd("SELECT").arg(1);
        p.cmd("DBSIZE");
        p.cmd("SELECT").arg(0);
        p.cmd("FLUSHDB");
        p.cmd("DBSIZE");
    })
    .await
    .unwrap();

    assert_eq!(res[0], Value::Status("PONG".to_string()));
    assert_eq!(res[3], Value::Status("set".to_string()));
    assert_eq!(res[4], Value::Status("none".to_string()));
    assert_eq!(res[5], Value::Int(2));
    match &res[6] {
        Value::Bulk(keys) => {
            let mut keys = keys.clone();
            keys.sort_by_key(|key| format!("{key:?}"));
            assert_eq!(keys, vec![data("set"), data("string")]);
        }
        value => panic!("unexpected KEYS reply {value:?}"),
    }
    assert_eq!(res[7], Value::Int(1));
    assert_eq!(res[9], Value::Int(0));
    assert_eq!(res[12], Value::Int(0));
}

#[tokio::test]
async fn test_dump_and_restore() {
    let dir = TempDir::new().unwrap();
    let mut connection = connect(start_server(dir.path()).await).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("ZADD").arg("z").arg(1.5).arg("a").arg(-2).arg("b");
        p.cmd("DUMP").arg("z");
    })
    .await
    .unwrap();
    let Value::Data(payload) = res[1].clone() else {
        panic!("unexpected DUMP reply {:?}", res[1]);
    };

    let res = query(&mut connection, |p| {
        p.cmd("RESTORE").arg("copy").arg(0).arg(&payload[..]);
        p.cmd("ZRANGE").arg("copy").arg(0).arg(-1).arg("WITHSCORES");
        p.cmd("DUMP").arg("missing");
    })
    .await
    .unwrap();
    assert_eq!(
        res,
        vec![Value::Okay, array(&["b", "-2", "a", "1.5"]), Value::Nil]
    );

    let err = query(&mut connection, |p| {
        p.cmd("RESTORE").arg("copy").arg(0).arg(&payload[..]);
    })
    .await
    .unwrap_err();
    assert_eq!(err.detail(), Some("Target key name already exists."));

    let err = query(&mut connection, |p| {
        p.cmd("RESTORE").arg("other").arg(0).arg("garbage");
    })
    .await
    .unwrap_err();
    assert_eq!(err.detail(), Some("DUMP payload version or checksum are wrong"));
}

#[tokio::test]
async fn test_errors() {
    let dir = TempDir::new().unwrap();
    let mut connection = connect(start_server(dir.path()).await).await.unwrap();

    query(&mut connection, |p| {
        p.cmd("SET").arg("string").arg("text");
    })
    .await
    .unwrap();

    let err = query(&mut connection, |p| {
        p.cmd("SADD").arg("string").arg("m");
    })
    .await
    .unwrap_err();
    assert_eq!(
        err.detail(),
        Some("Operation against a key holding the wrong kind of value")
    );

    let err = query(&mut connection, |p| {
        p.cmd("INCR").arg("string");
    })
    .await
    .unwrap_err();
    assert_eq!(err.detail(), Some("value is not an integer or out of range"));

    let err = query(&mut connection, |p| {
        p.cmd("SELECT").arg(16);
    })
    .await
    .unwrap_err();
    assert_eq!(err.detail(), Some("DB index is out of range"));

    let err = query(&mut connection, |p| {
        p.cmd("EVAL").arg("return 1").arg(0);
    })
    .await
    .unwrap_err();
    assert_eq!(err.detail(), Some("scripting is not enabled"));
}

#[tokio::test]
async fn test_deleted_objects_are_collected() {
    let dir = TempDir::new().unwrap();
    let manager = Arc::new(DatabaseManager::in_memory(dir.path(), 1).unwrap());
    let gc = GarbageCollector::new(manager.clone(), Duration::from_millis(10), 100);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(
        listener,
        Keyspace::new(manager.clone()),
        gc,
        future::pending::<()>(),
    ));
    let mut connection = connect(addr).await.unwrap();

    query(&mut connection, |p| {
        p.cmd("SADD").arg("set").arg("a").arg("b").arg("c");
        p.cmd("HSET").arg("hash").arg("f").arg("v");
        p.cmd("DEL").arg("set").arg("hash");
    })
    .await
    .unwrap();

    let mut remaining = usize::MAX;
    for _ in 0..100 {
        let db = manager.get(0).unwrap();
        remaining = db.iterate(b"", None).count();
        drop(db);
        if remaining == 0 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);
}

fn config(dir: &Path) -> Config {
    Config::try_parse_from([
        "redikv",
        "--port",
        "6378",
        "--backend",
        "lsm",
        "--dir",
        dir.to_str().unwrap(),
    ])
    .unwrap()
}

#[tokio::test]
#[serial]
async fn test_snapshot_is_loaded_at_startup() {
    let dir = TempDir::new().unwrap();
    {
        let source = TempDir::new().unwrap();
        let manager = Arc::new(DatabaseManager::in_memory(source.path(), 16).unwrap());
        let mut keyspace = Keyspace::new(manager.clone());
        keyspace.set(b"greeting", b"hello").unwrap();
        keyspace.select(3).unwrap();
        keyspace.sadd(b"set", &["x".into(), "y".into()]).unwrap();
        rdb::save_to_file(&manager, &dir.path().join("dump.rdb")).unwrap();
    }

    tokio::spawn(run(config(dir.path())));
    let mut connection = connect("127.0.0.1:6378".parse().unwrap()).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("GET").arg("greeting");
        p.cmd("SELECT").arg(3);
        p.cmd("SMEMBERS").arg("set");
    })
    .await
    .unwrap();

    assert_eq!(res, vec![data("hello"), Value::Okay, array(&["x", "y"])]);
}

#[tokio::test]
#[serial]
async fn test_save_writes_snapshot() {
    let dir = TempDir::new().unwrap();

    tokio::spawn(run(config(dir.path())));
    let mut connection = connect("127.0.0.1:6378".parse().unwrap()).await.unwrap();

    let res = query(&mut connection, |p| {
        p.cmd("HSET").arg("hash").arg("f").arg("v");
        p.cmd("SAVE");
    })
    .await
    .unwrap();
    assert_eq!(res, vec![Value::Int(1), Value::Okay]);

    let target = TempDir::new().unwrap();
    let manager = Arc::new(DatabaseManager::in_memory(target.path(), 16).unwrap());
    let loaded = rdb::load_from_file(&manager, &dir.path().join("dump.rdb")).unwrap();
    assert_eq!(loaded, 1);

    let keyspace = Keyspace::new(manager);
    assert_eq!(
        keyspace.hget(b"hash", b"f").unwrap(),
        Some(bytes::Bytes::from("v"))
    );
}
