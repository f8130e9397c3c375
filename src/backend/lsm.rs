use std::collections::BTreeMap;
use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tracing::{debug, instrument};

use super::{
    scan_lower_bound, BackendError, BackendOptions, BackendResult, BatchOp, StorageBackend,
    WriteBatch,
};

const PARTITION: &str = "redikv";

fn lsm_err<E: Into<fjall::Error>>(err: E) -> BackendError {
    BackendError::Lsm(err.into())
}

fn parse_option<T: std::str::FromStr>(key: &str, value: &str) -> BackendResult<T> {
    value.parse().map_err(|_| BackendError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Disk-backed log-structured merge tree.
///
/// Options:
///
/// - `sync`: `true` flushes the journal to disk after every batch.
/// - `max_write_buffer_size`: memtable budget in bytes.
pub struct LsmBackend {
    keyspace: Keyspace,
    partition: PartitionHandle,
    sync: bool,
}

impl LsmBackend {
    #[instrument(skip(options))]
    pub fn open(path: &Path, options: &BackendOptions) -> BackendResult<Self> {
        let mut config = Config::new(path);
        let mut sync = false;

        for (key, value) in options {
            match key.as_str() {
                "sync" => sync = parse_option(key, value)?,
                "max_write_buffer_size" => {
                    config = config.max_write_buffer_size(parse_option(key, value)?)
                }
                _ => debug!(option = %key, "ignoring unknown lsm backend option"),
            }
        }

        let keyspace = config.open().map_err(lsm_err)?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .map_err(lsm_err)?;

        Ok(Self {
            keyspace,
            partition,
            sync,
        })
    }
}

impl StorageBackend for LsmBackend {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        let value = self.partition.get(key).map_err(lsm_err)?;
        Ok(value.map(|value| value.to_vec()))
    }

    fn write(&self, batch: WriteBatch) -> BackendResult<()> {
        // Every item of a fjall batch shares one sequence number, so only the
        // last operation on each key may be staged.
        let mut last = BTreeMap::new();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put(key, value) => last.insert(key, Some(value)),
                BatchOp::Delete(key) => last.insert(key, None),
            };
        }

        let mut staged = self.keyspace.batch();
        for (key, value) in last {
            match value {
                Some(value) => staged.insert(&self.partition, key, value),
                None => staged.remove(&self.partition, key),
            }
        }
        staged.commit().map_err(lsm_err)?;

        if self.sync {
            self.keyspace
                .persist(PersistMode::SyncAll)
                .map_err(lsm_err)?;
        }

        Ok(())
    }

    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: usize,
    ) -> BackendResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let lower = scan_lower_bound(prefix, start).to_vec();
        let mut page = Vec::new();

        for item in self.partition.range(lower..) {
            if page.len() >= limit {
                break;
            }

            let (key, value) = item.map_err(lsm_err)?;
            if !key.starts_with(prefix) {
                break;
            }
            page.push((key.to_vec(), value.to_vec()));
        }

        Ok(page)
    }
}
