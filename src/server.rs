use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::Config;
use crate::connection::Connection;
use crate::db::DatabaseManager;
use crate::error::StoreError;
use crate::frame::Frame;
use crate::gc::GarbageCollector;
use crate::keyspace::Keyspace;
use crate::rdb;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let manager = open_databases(config.clone()).await?;
    let gc = GarbageCollector::new(manager.clone(), config.gc_interval(), config.gc_batch_size);

    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;

    serve(listener, Keyspace::new(manager), gc, tokio::signal::ctrl_c()).await
}

/// Opens the configured databases and loads the snapshot file if there is one.
pub async fn open_databases(config: Config) -> Result<Arc<DatabaseManager>, Error> {
    task::spawn_blocking(move || -> Result<Arc<DatabaseManager>, Error> {
        let manager = DatabaseManager::setup_databases(
            &config.dir,
            config.backend,
            config.backend_options(),
            config.databases,
        )?
        .with_snapshot_file(config.dbfilename.clone());
        let manager = Arc::new(manager);

        let snapshot = manager.snapshot_path();
        if snapshot.exists() {
            rdb::load_from_file(&manager, &snapshot)?;
        }

        Ok(manager)
    })
    .await?
}

/// Accepts connections on `listener` until `shutdown` completes, each served
/// by its own copy of `keyspace`. The garbage collector is stopped before
/// returning.
pub async fn serve(
    listener: TcpListener,
    keyspace: Keyspace,
    gc: GarbageCollector,
    shutdown: impl Future,
) -> Result<(), Error> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gc = tokio::spawn(gc.run(shutdown_rx));

    info!("Redis server listening on {}", listener.local_addr()?);

    let res = tokio::select! {
        res = accept_loop(&listener, &keyspace) => res,
        _ = shutdown => {
            info!("Shutting down");
            Ok(())
        }
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = gc.await {
        error!("Garbage collector task failed: {}", e);
    }

    res
}

async fn accept_loop(listener: &TcpListener, keyspace: &Keyspace) -> Result<(), Error> {
    loop {
        let (socket, client_address) = listener.accept().await?;
        let keyspace = keyspace.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, keyspace).await {
                error!("Connection failed: {}", e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, keyspace),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    mut keyspace: Keyspace,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    loop {
        let args = match conn.read_command().await {
            Ok(Some(args)) => args,
            Ok(None) => break,
            Err(e) => {
                // The stream cannot be resynchronized after a framing error.
                warn!("Closing connection after protocol error: {}", e);
                conn.write_frame(&Frame::Error(format!("ERR Protocol error: {e}")))
                    .await?;
                break;
            }
        };

        debug!("Received command from client: {:?}", args);
        let res = execute(&mut keyspace, args).await;
        debug!("Sending response to client: {:?}", res);

        conn.write_frame(&res).await?;
    }

    info!("Connection closed");
    Ok(())
}

/// Runs one request and turns any failure into an error reply.
///
/// Blocking commands run on the blocking pool against a copy of the
/// connection's keyspace.
async fn execute(keyspace: &mut Keyspace, args: Vec<Bytes>) -> Frame {
    let request = Frame::Array(args.into_iter().map(Frame::Bulk).collect());

    let res = match Command::try_from(request) {
        Ok(cmd) if cmd.is_blocking() => {
            let mut worker = keyspace.clone();
            match task::spawn_blocking(move || cmd.exec(&mut worker)).await {
                Ok(res) => res,
                Err(e) => {
                    error!("Blocking command failed: {}", e);
                    return Frame::Error("ERR command aborted".to_string());
                }
            }
        }
        Ok(cmd) => cmd.exec(keyspace),
        Err(e) => Err(e.into()),
    };

    match res {
        Ok(frame) => frame,
        Err(err) => {
            if matches!(
                err,
                StoreError::Backend(_) | StoreError::Rdb(_) | StoreError::CorruptKey(_)
            ) {
                error!("Command failed: {}", err);
            }
            Frame::Error(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::tests::keyspace;

    fn args(values: &[&str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from(v.to_string())).collect()
    }

    #[tokio::test]
    async fn errors_become_replies() {
        let (_dir, mut keyspace) = keyspace(1);
        keyspace.set(b"s", b"text").unwrap();

        assert_eq!(
            execute(&mut keyspace, args(&["INCR", "s"])).await,
            Frame::Error("ERR value is not an integer or out of range".to_string())
        );
        assert_eq!(
            execute(&mut keyspace, args(&["SADD", "s", "m"])).await,
            Frame::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string()
            )
        );
        assert_eq!(
            execute(&mut keyspace, args(&["FOO"])).await,
            Frame::Error("ERR unknown command 'foo'".to_string())
        );
        assert_eq!(
            execute(&mut keyspace, args(&["GET"])).await,
            Frame::Error("ERR wrong number of arguments for 'get' command".to_string())
        );
    }

    #[tokio::test]
    async fn selection_is_per_keyspace() {
        let (_dir, mut first) = keyspace(2);
        let mut second = first.clone();

        execute(&mut first, args(&["SELECT", "1"])).await;
        execute(&mut first, args(&["SET", "k", "v"])).await;

        assert_eq!(execute(&mut second, args(&["GET", "k"])).await, Frame::Null);
        assert_eq!(
            execute(&mut first, args(&["GET", "k"])).await,
            Frame::Bulk(Bytes::from("v"))
        );
    }

    #[tokio::test]
    async fn whole_database_commands_run_off_the_async_workers() {
        let (dir, mut keyspace) = keyspace(2);
        keyspace.set(b"k", b"v").unwrap();
        execute(&mut keyspace, args(&["SELECT", "1"])).await;
        keyspace.set(b"other", b"v").unwrap();

        assert!(Command::try_from(Frame::Array(vec![Frame::Bulk(Bytes::from("save"))]))
            .unwrap()
            .is_blocking());
        assert_eq!(
            execute(&mut keyspace, args(&["SAVE"])).await,
            Frame::Simple("OK".to_string())
        );
        assert!(dir.path().join("dump.rdb").exists());

        assert_eq!(
            execute(&mut keyspace, args(&["FLUSHDB"])).await,
            Frame::Simple("OK".to_string())
        );
        assert_eq!(keyspace.selected(), 1);
        assert_eq!(execute(&mut keyspace, args(&["DBSIZE"])).await, Frame::Integer(0));

        execute(&mut keyspace, args(&["SELECT", "0"])).await;
        assert_eq!(execute(&mut keyspace, args(&["DBSIZE"])).await, Frame::Integer(1));
        assert_eq!(
            execute(&mut keyspace, args(&["FLUSHALL"])).await,
            Frame::Simple("OK".to_string())
        );
        assert_eq!(execute(&mut keyspace, args(&["DBSIZE"])).await, Frame::Integer(0));
    }
}
