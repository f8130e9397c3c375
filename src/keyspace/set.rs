use bytes::Bytes;
use itertools::Itertools;

use super::{load_container, Container, Keyspace};
use crate::backend::{StorageBackend, WriteBatch};
use crate::error::StoreResult;
use crate::key_codec::KeyKind;

impl Keyspace {
    /// Adds `members` to the set at `key`, returning how many were new.
    pub fn sadd(&self, key: &[u8], members: &[Bytes]) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let container = match load_container(db, KeyKind::Set, key)? {
            Some(container) => container,
            None => Container::new(KeyKind::Set, key),
        };

        let mut batch = WriteBatch::new();
        let mut added = 0;
        for member in members.iter().unique() {
            let member_key = container.component_key(KeyKind::SetMember, member);
            if db.get(&member_key)?.is_none() {
                batch.put(member_key, Vec::new());
                added += 1;
            }
        }

        if added > 0 {
            let count = container.len(db)? + added;
            container.stage_len(&mut batch, count);
            db.write(batch)?;
        }

        Ok(added as i64)
    }

    /// Removes `members` from the set at `key`, returning how many existed.
    pub fn srem(&self, key: &[u8], members: &[Bytes]) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::Set, key)? else {
            return Ok(0);
        };

        let mut batch = WriteBatch::new();
        let mut removed = 0;
        for member in members.iter().unique() {
            let member_key = container.component_key(KeyKind::SetMember, member);
            if db.get(&member_key)?.is_some() {
                batch.delete(member_key);
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

    /// Members of the set at `key`, in byte order.
    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        let db = self.db()?;
        let db = &**db;

        let Some(container) = load_container(db, KeyKind::Set, key)? else {
            return Ok(Vec::new());
        };

        let prefix = container.component_prefix(KeyKind::SetMember);
        db.iterate(&prefix, None)
            .map(|entry| -> StoreResult<Bytes> {
                let (member_key, _) = entry?;
                Ok(Bytes::copy_from_slice(&member_key[prefix.len()..]))
            })
            .collect()
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        let db = self.db()?;
        let db = &**db;

        match load_container(db, KeyKind::Set, key)? {
            Some(container) => {
                let member_key = container.component_key(KeyKind::SetMember, member);
                Ok(db.get(&member_key)?.is_some())
            }
            None => Ok(false),
        }
    }

    pub fn scard(&self, key: &[u8]) -> StoreResult<i64> {
        let db = self.db()?;
        let db = &**db;

        match load_container(db, KeyKind::Set, key)? {
            Some(container) => Ok(container.len(db)? as i64),
            None => Ok(0),
        }
    }
}
