use bytes::Bytes;
use itertools::Itertools;

use super::zset::stage_member;
use super::{find_object, stage_delete, Container, Keyspace, ObjectType, Value};
use crate::backend::{StorageBackend, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::frame::Frame;
use crate::glob::glob_match;
use crate::key_codec::{self, KeyCodecError, KeyKind};
use crate::rdb;

/// `(component, value)` pairs stored under one component kind of `container`.
fn components(
    db: &dyn StorageBackend,
    container: &Container,
    kind: KeyKind,
) -> StoreResult<Vec<(Bytes, Bytes)>> {
    let prefix = container.component_prefix(kind);
    db.iterate(&prefix, None)
        .map(|entry| -> StoreResult<(Bytes, Bytes)> {
            let (key, value) = entry?;
            Ok((
                Bytes::copy_from_slice(&key[prefix.len()..]),
                Bytes::from(value),
            ))
        })
        .collect()
}

/// Stages `value` as a new object named `key`. Whatever lived there must
/// already be staged for removal.
fn stage_value(batch: &mut WriteBatch, key: &[u8], value: &Value) {
    match value {
        Value::String(value) => {
            batch.put(key_codec::encode(KeyKind::String, key, &[]), value.to_vec());
        }
        Value::Set(members) => {
            let container = Container::new(KeyKind::Set, key);
            let mut count = 0;
            for member in members.iter().unique() {
                batch.put(container.component_key(KeyKind::SetMember, member), Vec::new());
                count += 1;
            }
            container.stage_len(batch, count);
        }
        Value::Hash(fields) => {
            let container = Container::new(KeyKind::Hash, key);
            let mut count = 0;
            for (field, value) in fields.iter().rev().unique_by(|(field, _)| field.clone()) {
                batch.put(container.component_key(KeyKind::HashField, field), value.to_vec());
                count += 1;
            }
            container.stage_len(batch, count);
        }
        Value::ZSet(entries) => {
            let container = Container::new(KeyKind::ZSet, key);
            let mut count = 0;
            for (member, score) in entries.iter().rev().unique_by(|(member, _)| member.clone()) {
                let score = if *score == 0.0 { 0.0 } else { *score };
                stage_member(batch, &container, member, score);
                count += 1;
            }
            container.stage_len(batch, count);
        }
    }
}

impl Keyspace {
    /// How many of `keys` exist. A key named twice is counted twice.
    pub fn exists(&self, keys: &[Bytes]) -> StoreResult<i64> {
        let db = self.db()?;
        let db = &**db;

        let mut count = 0;
        for key in keys {
            if find_object(db, key)?.is_some() {
                count += 1;
            }
        }

        Ok(count)
    }

    pub fn key_type(&self, key: &[u8]) -> StoreResult<Option<ObjectType>> {
        let db = self.db()?;
        let found = find_object(&**db, key)?;
        Ok(found.and_then(|(kind, _)| ObjectType::from_kind(kind)))
    }

    /// Deletes `keys`, returning how many existed.
    ///
    /// Composite objects become unreachable immediately; their members are
    /// reclaimed by the garbage collector.
    pub fn delete(&self, keys: &[Bytes]) -> StoreResult<i64> {
        let db = self.db_for_write()?;
        let db = &**db;

        let mut batch = WriteBatch::new();
        let mut removed = 0;
        for key in keys.iter().unique() {
            if stage_delete(db, &mut batch, key)? {
                removed += 1;
            }
        }

        if !batch.is_empty() {
            db.write(batch)?;
        }

        Ok(removed)
    }

    /// Names matching the glob `pattern`, in no particular order.
    pub fn keys(&self, pattern: &[u8]) -> StoreResult<Vec<Bytes>> {
        let db = self.db()?;
        let db = &**db;

        let match_all = pattern == b"*";

        let mut names = Vec::new();
        for kind in KeyKind::CONTAINERS {
            for entry in db.iterate(&key_codec::kind_prefix(kind), None) {
                let (key, _) = entry?;
                let decoded = key_codec::decode(&key)?;

                if match_all || glob_match(pattern, decoded.identifier) {
                    names.push(Bytes::copy_from_slice(decoded.identifier));
                }
            }
        }

        Ok(names)
    }

    pub fn dbsize(&self) -> StoreResult<i64> {
        let db = self.db()?;
        let db = &**db;

        let mut count = 0;
        for kind in KeyKind::CONTAINERS {
            for entry in db.iterate(&key_codec::kind_prefix(kind), None) {
                entry?;
                count += 1;
            }
        }

        Ok(count)
    }

    pub fn flushdb(&self) -> StoreResult<()> {
        self.manager.reset_database(self.selected)?;
        Ok(())
    }

    pub fn flushall(&self) -> StoreResult<()> {
        self.manager.reset_all()?;
        Ok(())
    }

    /// Reads the whole object stored at `key`.
    pub fn value(&self, key: &[u8]) -> StoreResult<Option<Value>> {
        let db = self.db()?;
        let db = &**db;

        let Some((kind, stored)) = find_object(db, key)? else {
            return Ok(None);
        };

        let value = match kind {
            KeyKind::String => Value::String(Bytes::from(stored)),
            KeyKind::Set => {
                let container = Container::from_stored(kind, key, &stored);
                let members = components(db, &container, KeyKind::SetMember)?;
                Value::Set(members.into_iter().map(|(member, _)| member).collect())
            }
            KeyKind::Hash => {
                let container = Container::from_stored(kind, key, &stored);
                Value::Hash(components(db, &container, KeyKind::HashField)?)
            }
            KeyKind::ZSet => Value::ZSet(self.zset_value(db, key, &stored)?),
            other => return Err(KeyCodecError::UnknownTag(other as u8).into()),
        };

        Ok(Some(value))
    }

    /// Puts `value` at `key`, replacing whatever object was there, in one
    /// batch.
    pub(crate) fn replace(&self, key: &[u8], value: &Value) -> StoreResult<()> {
        let db = self.db_for_write()?;
        let db = &**db;

        let mut batch = WriteBatch::new();
        stage_delete(db, &mut batch, key)?;
        stage_value(&mut batch, key, value);
        db.write(batch)?;

        Ok(())
    }

    /// Serializes the object at `key`, or `None` when there is none.
    pub fn dump(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.value(key)? {
            Some(value) => Ok(Some(rdb::dump_value(&value)?)),
            None => Ok(None),
        }
    }

    /// Recreates an object from a [`Keyspace::dump`] payload.
    ///
    /// The payload is fully decoded and verified before the keyspace is
    /// touched. Expiry is not supported, so `_ttl` is ignored.
    pub fn restore(&self, key: &[u8], _ttl: i64, payload: &[u8], replace: bool) -> StoreResult<()> {
        let value = rdb::load_value(payload)?;

        let db = self.db_for_write()?;
        let db = &**db;

        let mut batch = WriteBatch::new();
        if stage_delete(db, &mut batch, key)? && !replace {
            return Err(StoreError::BusyKey);
        }
        stage_value(&mut batch, key, &value);
        db.write(batch)?;

        Ok(())
    }

    /// Runs `script` through the configured scripting bridge.
    pub fn eval(&mut self, script: &str, keys: &[Bytes], argv: &[Bytes]) -> StoreResult<Frame> {
        let bridge = self
            .script_bridge()
            .ok_or_else(|| StoreError::Script("scripting is not enabled".to_string()))?;

        bridge.eval(script, keys, argv, self)
    }
}
