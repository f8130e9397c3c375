use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::backend::{BackendKind, BackendOptions};
use crate::rdb::SNAPSHOT_FILE;

pub const PORT: u16 = 6379;

/// Server settings. Every flag can also be set through its environment
/// variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "redikv", version, about)]
pub struct Config {
    /// The port to listen on
    #[arg(short, long, env = "REDIKV_PORT", default_value_t = PORT)]
    pub port: u16,

    /// Directory holding the databases and the snapshot file
    #[arg(short, long, env = "REDIKV_DIR", default_value = "data")]
    pub dir: PathBuf,

    /// Number of logical databases
    #[arg(long, env = "REDIKV_DATABASES", default_value_t = 16)]
    pub databases: usize,

    /// Storage engine: lsm, btree or memory
    #[arg(short, long, env = "REDIKV_BACKEND", default_value_t = BackendKind::Lsm)]
    pub backend: BackendKind,

    /// Engine option as key=value, may be repeated
    #[arg(long = "backend-option", value_name = "KEY=VALUE", value_parser = parse_backend_option)]
    pub backend_options: Vec<(String, String)>,

    /// Milliseconds between garbage collection passes
    #[arg(long, env = "REDIKV_GC_INTERVAL_MS", default_value_t = 500)]
    pub gc_interval_ms: u64,

    /// Most keys reclaimed by a single garbage collection pass
    #[arg(long, env = "REDIKV_GC_BATCH_SIZE", default_value_t = 1000)]
    pub gc_batch_size: usize,

    /// Snapshot file name inside the data directory
    #[arg(long, env = "REDIKV_DBFILENAME", default_value = SNAPSHOT_FILE)]
    pub dbfilename: String,
}

impl Config {
    pub fn backend_options(&self) -> BackendOptions {
        self.backend_options.iter().cloned().collect()
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.dbfilename)
    }
}

fn parse_backend_option(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid option `{s}`, expected KEY=VALUE"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid option `{s}`, empty key"));
    }

    Ok((key.to_string(), value.trim().to_string()))
}
