use bytes::Bytes;
use itertools::Itertools;

use super::{increment, load_container, Container, Keyspace};
use crate::backend::{StorageBackend, WriteBatch};
use crate::error::StoreResult;
use crate::key_codec::KeyKind;

impl Keyspace {
    /// Sets `fields` on the hash at `key`, returning how many fields were new.
    ///
    /// A field repeated within `fields` takes its last value.
    pub fn hset(&self, key: &[u8], fields: &[(Bytes, Bytes)]) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let container = match load_container(db, KeyKind::Hash, key)? {
            Some(container) => container,
            None => Container::new(KeyKind::Hash, key),
        };

        let mut batch = WriteBatch::new();
        let mut added = 0;
        for (field, value) in fields.iter().rev().unique_by(|(field, _)| field.clone()) {
            let field_key = container.component_key(KeyKind::HashField, field);
            if db.get(&field_key)?.is_none() {
                added += 1;
            }
            batch.put(field_key, value.to_vec());
        }

        if batch.is_empty() {
            return Ok(0);
        }

        if added > 0 {
            let count = container.len(db)? + added;
            container.stage_len(&mut batch, count);
        }
        db.write(batch)?;

        Ok(added as i64)
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::Hash, key)? else {
            return Ok(None);
        };

        let value = db.get(&container.component_key(KeyKind::HashField, field))?;
        Ok(value.map(Bytes::from))
    }

    /// Removes `fields` from the hash at `key`, returning how many existed.
    pub fn hdel(&self, key: &[u8], fields: &[Bytes]) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::Hash, key)? else {
            return Ok(0);
        };

        let mut batch = WriteBatch::new();
        let mut removed = 0;
        for field in fields.iter().unique() {
            let field_key = container.component_key(KeyKind::HashField, field);
            if db.get(&field_key)?.is_some() {
                batch.delete(field_key);
                removed += 1;
            }
        }

        if removed > 0 {
            let count = container.len(db)?.saturating_sub(removed);
            container.stage_len(&mut batch, count);
            db.write(batch)?;
        }

        Ok(removed as i64)
    }

    /// All field/value pairs of the hash at `key`, ordered by field.
    pub fn hgetall(&self, key: &[u8]) -> StoreResult<Vec<(Bytes, Bytes)>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::Hash, key)? else {
            return Ok(Vec::new());
        };

        let prefix = container.component_prefix(KeyKind::HashField);
        db.iterate(&prefix, None)
            .map(|entry| -> StoreResult<(Bytes, Bytes)> {
                let (field_key, value) = entry?;
                Ok((
                    Bytes::copy_from_slice(&field_key[prefix.len()..]),
                    Bytes::from(value),
                ))
            })
            .collect()
    }

    pub fn hkeys(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        let pairs = self.hgetall(key)?;
        Ok(pairs.into_iter().map(|(field, _)| field).collect())
    }

    pub fn hvals(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        let pairs = self.hgetall(key)?;
        Ok(pairs.into_iter().map(|(_, value)| value).collect())
    }

    pub fn hlen(&self, key: &[u8]) -> StoreResult<i64> {
        let db = self.db()?;
        let db = &**db;

        match load_container(db, KeyKind::Hash, key)? {
            Some(container) => Ok(container.len(db)? as i64),
            None => Ok(0),
        }
    }

    /// Adds `delta` to the integer stored in `field` and returns the result.
    pub fn hincr_by(&self, key: &[u8], field: &[u8], delta: i64) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let container = match load_container(db, KeyKind::Hash, key)? {
            Some(container) => container,
            None => Container::new(KeyKind::Hash, key),
        };

        let field_key = container.component_key(KeyKind::HashField, field);
        let current = db.get(&field_key)?;
        let value = increment(current.as_deref(), delta)?;

        let mut batch = WriteBatch::new();
        batch.put(field_key, value.to_string());
        if current.is_none() {
            container.stage_len(&mut batch, container.len(db)? + 1);
        }
        db.write(batch)?;

        Ok(value)
    }
}
