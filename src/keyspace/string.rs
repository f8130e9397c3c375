use bytes::Bytes;

use super::{ensure_kind, increment, Container, Keyspace};
use crate::backend::{StorageBackend, WriteBatch};
use crate::error::StoreResult;
use crate::key_codec::{self, KeyKind};

fn read_string(db: &dyn StorageBackend, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
    match db.get(&key_codec::encode(KeyKind::String, key, &[]))? {
        Some(value) => Ok(Some(value)),
        None => {
            ensure_kind(db, key, KeyKind::String)?;
            Ok(None)
        }
    }
}

impl Keyspace {
    /// Stores `value` at `key`, replacing an object of any type.
    pub fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let db = self.db_for_write()?;
        let db = &**db;

        let mut batch = WriteBatch::new();
        for kind in [KeyKind::Set, KeyKind::Hash, KeyKind::ZSet] {
            if let Some(stored) = db.get(&key_codec::encode(kind, key, &[]))? {
                Container::from_stored(kind, key, &stored).stage_removal(&mut batch);
            }
        }
        batch.put(key_codec::encode(KeyKind::String, key, &[]), value);
        db.write(batch)?;

        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let db = self.db()?;
        Ok(read_string(&**db, key)?.map(Bytes::from))
    }

    /// Adds `delta` to the integer at `key` and returns the result.
    pub fn incr_by(&self, key: &[u8], delta: i64) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let current = read_string(db, key)?;
        let value = increment(current.as_deref(), delta)?;
        db.put(
            &key_codec::encode(KeyKind::String, key, &[]),
            value.to_string().as_bytes(),
        )?;

        Ok(value)
    }
}
