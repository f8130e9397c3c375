use std::fs;
use std::path::Path;

use redb::{Database, Durability, ReadableTable, TableDefinition};
use tracing::{debug, instrument};

use super::{
    scan_lower_bound, BackendError, BackendOptions, BackendResult, BatchOp, StorageBackend,
    WriteBatch,
};

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("redikv");
const FILE_NAME: &str = "data.redb";

fn btree_err<E: Into<redb::Error>>(err: E) -> BackendError {
    BackendError::Btree(err.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitDurability {
    Immediate,
    Eventual,
    None,
}

impl CommitDurability {
    fn parse(value: &str) -> BackendResult<Self> {
        match value {
            "immediate" => Ok(Self::Immediate),
            "eventual" => Ok(Self::Eventual),
            "none" => Ok(Self::None),
            _ => Err(BackendError::InvalidOption {
                key: "durability".to_string(),
                value: value.to_string(),
            }),
        }
    }

    fn as_redb(self) -> Durability {
        match self {
            Self::Immediate => Durability::Immediate,
            Self::Eventual => Durability::Eventual,
            Self::None => Durability::None,
        }
    }
}

/// Single-file, memory-mapped copy-on-write B-tree.
///
/// Options:
///
/// - `cache_size`: page cache budget in bytes.
/// - `durability`: `immediate` (default), `eventual` or `none`.
pub struct BtreeBackend {
    db: Database,
    durability: CommitDurability,
}

impl BtreeBackend {
    #[instrument(skip(options))]
    pub fn open(path: &Path, options: &BackendOptions) -> BackendResult<Self> {
        fs::create_dir_all(path)?;

        let mut builder = Database::builder();
        let mut durability = CommitDurability::Immediate;

        for (key, value) in options {
            match key.as_str() {
                "cache_size" => {
                    let bytes = value.parse().map_err(|_| BackendError::InvalidOption {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                    builder.set_cache_size(bytes);
                }
                "durability" => durability = CommitDurability::parse(value)?,
                _ => debug!(option = %key, "ignoring unknown btree backend option"),
            }
        }

        let db = builder.create(path.join(FILE_NAME)).map_err(btree_err)?;

        // Readers open the table without creating it.
        let txn = db.begin_write().map_err(btree_err)?;
        {
            let _table = txn.open_table(TABLE).map_err(btree_err)?;
        }
        txn.commit().map_err(btree_err)?;

        Ok(Self { db, durability })
    }
}

impl StorageBackend for BtreeBackend {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(btree_err)?;
        let table = txn.open_table(TABLE).map_err(btree_err)?;
        let value = table.get(key).map_err(btree_err)?;

        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn write(&self, batch: WriteBatch) -> BackendResult<()> {
        let mut txn = self.db.begin_write().map_err(btree_err)?;
        txn.set_durability(self.durability.as_redb());
        {
            let mut table = txn.open_table(TABLE).map_err(btree_err)?;
            for op in batch.into_ops() {
                match op {
                    BatchOp::Put(key, value) => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(btree_err)?;
                    }
                    BatchOp::Delete(key) => {
                        table.remove(key.as_slice()).map_err(btree_err)?;
                    }
                }
            }
        }
        // An error before this point drops `txn`, which aborts it.
        txn.commit().map_err(btree_err)?;

        Ok(())
    }

    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: usize,
    ) -> BackendResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let lower = scan_lower_bound(prefix, start);
        let txn = self.db.begin_read().map_err(btree_err)?;
        let table = txn.open_table(TABLE).map_err(btree_err)?;

        let mut page = Vec::new();
        for item in table.range::<&[u8]>(lower..).map_err(btree_err)? {
            if page.len() >= limit {
                break;
            }

            let (key, value) = item.map_err(btree_err)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            page.push((key.to_vec(), value.value().to_vec()));
        }

        Ok(page)
    }
}
