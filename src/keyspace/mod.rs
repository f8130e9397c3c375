//! The Redis object model on top of a flat ordered store.
//!
//! A [`Keyspace`] is cheap to clone and carries the per-connection state: the
//! selected database and the scripting bridge, if any. Every operation borrows
//! the selected database from the [`DatabaseManager`] for its whole duration and
//! applies its writes as a single [`WriteBatch`]. Mutations also hold the
//! database's writer lock, so two read-modify-write cycles never interleave.

mod generic;
mod hash;
mod set;
mod string;
mod zset;

use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use num_traits::{CheckedAdd, Zero};
use parking_lot::MutexGuard;
use strum_macros::{Display, IntoStaticStr};

use crate::backend::{StorageBackend, WriteBatch};
use crate::db::{DatabaseManager, DbHandle};
use crate::error::{StoreError, StoreResult};
use crate::key_codec::{self, KeyKind};
use crate::script::ScriptBridge;

pub use zset::ScoreBound;

/// The type of a stored object, as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectType {
    String,
    Set,
    Hash,
    Zset,
}

impl ObjectType {
    fn from_kind(kind: KeyKind) -> Option<Self> {
        match kind {
            KeyKind::String => Some(Self::String),
            KeyKind::Set => Some(Self::Set),
            KeyKind::Hash => Some(Self::Hash),
            KeyKind::ZSet => Some(Self::Zset),
            _ => None,
        }
    }
}

/// A fully materialized object, used by dump, restore and snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Bytes),
    Set(Vec<Bytes>),
    Hash(Vec<(Bytes, Bytes)>),
    ZSet(Vec<(Bytes, f64)>),
}

impl Value {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Value::String(_) => ObjectType::String,
            Value::Set(_) => ObjectType::Set,
            Value::Hash(_) => ObjectType::Hash,
            Value::ZSet(_) => ObjectType::Zset,
        }
    }
}

#[derive(Clone)]
pub struct Keyspace {
    manager: Arc<DatabaseManager>,
    selected: usize,
    scripts: Option<Arc<dyn ScriptBridge>>,
}

impl Keyspace {
    pub fn new(manager: Arc<DatabaseManager>) -> Self {
        Self {
            manager,
            selected: 0,
            scripts: None,
        }
    }

    pub fn with_script_bridge(mut self, bridge: Arc<dyn ScriptBridge>) -> Self {
        self.scripts = Some(bridge);
        self
    }

    pub fn manager(&self) -> &Arc<DatabaseManager> {
        &self.manager
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, index: i64) -> StoreResult<()> {
        let index = usize::try_from(index).map_err(|_| StoreError::DbIndexOutOfRange)?;
        if index >= self.manager.count() {
            return Err(StoreError::DbIndexOutOfRange);
        }

        self.selected = index;
        Ok(())
    }

    pub(crate) fn script_bridge(&self) -> Option<Arc<dyn ScriptBridge>> {
        self.scripts.clone()
    }

    fn db(&self) -> StoreResult<DbHandle<'_>> {
        self.manager
            .get(self.selected)
            .ok_or(StoreError::DbIndexOutOfRange)
    }

    fn db_for_write(&self) -> StoreResult<WriteHandle<'_>> {
        let writer = self
            .manager
            .write_lock(self.selected)
            .ok_or(StoreError::DbIndexOutOfRange)?;
        let db = self.db()?;

        Ok(WriteHandle {
            db,
            _writer: writer,
        })
    }
}

/// The selected database, borrowed by the only writer allowed on it.
struct WriteHandle<'a> {
    db: DbHandle<'a>,
    _writer: MutexGuard<'a, ()>,
}

impl Deref for WriteHandle<'_> {
    type Target = Box<dyn StorageBackend>;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// The container key of a composite object and what its value says.
struct Container {
    kind: KeyKind,
    key: Vec<u8>,
    key_id: Vec<u8>,
    count: Option<u64>,
    // Written before key ids existed: the name is the identifier and the value
    // is a bare count.
    legacy: bool,
}

impl Container {
    fn new(kind: KeyKind, name: &[u8]) -> Self {
        Self {
            kind,
            key: key_codec::encode(kind, name, &[]),
            key_id: key_codec::new_key_id().to_vec(),
            count: Some(0),
            legacy: false,
        }
    }

    fn from_stored(kind: KeyKind, name: &[u8], stored: &[u8]) -> Self {
        let (key_id, count) = key_codec::decode_identifier_and_length(stored, name);
        Self {
            kind,
            key: key_codec::encode(kind, name, &[]),
            key_id,
            count,
            legacy: stored.len() < key_codec::KEY_ID_LEN,
        }
    }

    fn component_key(&self, component_kind: KeyKind, component: &[u8]) -> Vec<u8> {
        key_codec::encode(component_kind, &self.key_id, component)
    }

    fn component_prefix(&self, component_kind: KeyKind) -> Vec<u8> {
        key_codec::prefix(component_kind, &self.key_id)
    }

    /// The number of members, scanning the store when the count is missing.
    fn len(&self, db: &dyn StorageBackend) -> StoreResult<u64> {
        if let Some(count) = self.count {
            return Ok(count);
        }

        let primary = self.kind.components()[0];
        let mut count = 0;
        for entry in db.iterate(&self.component_prefix(primary), None) {
            entry?;
            count += 1;
        }

        Ok(count)
    }

    /// Stages the new member count. An empty container is removed.
    fn stage_len(&self, batch: &mut WriteBatch, count: u64) {
        if count == 0 {
            batch.delete(self.key.clone());
        } else if self.legacy {
            batch.put(self.key.clone(), count.to_be_bytes().to_vec());
        } else {
            batch.put(self.key.clone(), key_codec::encode_container(&self.key_id, count));
        }
    }

    /// Stages removal of the container and tombstones for its components.
    fn stage_removal(&self, batch: &mut WriteBatch) {
        batch.delete(self.key.clone());
        for component_kind in self.kind.components() {
            let prefix = self.component_prefix(*component_kind);
            batch.put(
                key_codec::encode(KeyKind::Tombstone, &prefix, &[]),
                prefix,
            );
        }
    }
}

/// Finds whichever object currently lives under `name`.
fn find_object(db: &dyn StorageBackend, name: &[u8]) -> StoreResult<Option<(KeyKind, Vec<u8>)>> {
    for kind in KeyKind::CONTAINERS {
        if let Some(stored) = db.get(&key_codec::encode(kind, name, &[]))? {
            return Ok(Some((kind, stored)));
        }
    }

    Ok(None)
}

/// Fails with `WRONGTYPE` when `name` holds an object other than `kind`.
fn ensure_kind(db: &dyn StorageBackend, name: &[u8], kind: KeyKind) -> StoreResult<()> {
    for other in KeyKind::CONTAINERS {
        if other != kind && db.get(&key_codec::encode(other, name, &[]))?.is_some() {
            return Err(StoreError::WrongType);
        }
    }

    Ok(())
}

/// Loads the composite object of `kind` stored under `name`.
fn load_container(
    db: &dyn StorageBackend,
    kind: KeyKind,
    name: &[u8],
) -> StoreResult<Option<Container>> {
    match db.get(&key_codec::encode(kind, name, &[]))? {
        Some(stored) => Ok(Some(Container::from_stored(kind, name, &stored))),
        None => {
            ensure_kind(db, name, kind)?;
            Ok(None)
        }
    }
}

/// Stages removal of whatever object lives under `name`. Returns whether one did.
fn stage_delete(db: &dyn StorageBackend, batch: &mut WriteBatch, name: &[u8]) -> StoreResult<bool> {
    let Some((kind, stored)) = find_object(db, name)? else {
        return Ok(false);
    };

    if kind == KeyKind::String {
        batch.delete(key_codec::encode(kind, name, &[]));
    } else {
        Container::from_stored(kind, name, &stored).stage_removal(batch);
    }

    Ok(true)
}

/// Adds `delta` to the integer stored in `current`, a missing or empty value
/// counting as zero.
fn increment<T>(current: Option<&[u8]>, delta: T) -> StoreResult<T>
where
    T: FromStr + CheckedAdd + Zero,
{
    let value = match current {
        None | Some(b"") => T::zero(),
        Some(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<T>().ok())
            .ok_or(StoreError::NotInteger)?,
    };

    value.checked_add(&delta).ok_or(StoreError::Overflow)
}

#[cfg(test)]
pub(crate) mod tests {
    use itertools::Itertools;
    use tempfile::TempDir;

    use super::*;

    /// A keyspace over a fresh in-memory manager. Keep the directory alive for
    /// the duration of the test.
    pub(crate) fn keyspace(databases: usize) -> (TempDir, Keyspace) {
        let dir = TempDir::new().unwrap();
        let manager = DatabaseManager::in_memory(dir.path(), databases).unwrap();
        (dir, Keyspace::new(Arc::new(manager)))
    }

    /// Every raw backend key of the selected database.
    pub(crate) fn raw_keys(keyspace: &Keyspace) -> Vec<Vec<u8>> {
        let db = keyspace.db().unwrap();
        db.iterate(&[], None).map(|entry| entry.unwrap().0).collect()
    }

    #[test]
    fn select_validates_index() {
        let (_dir, mut keyspace) = keyspace(2);

        keyspace.select(1).unwrap();
        assert_eq!(keyspace.selected(), 1);

        assert!(matches!(keyspace.select(2), Err(StoreError::DbIndexOutOfRange)));
        assert!(matches!(keyspace.select(-1), Err(StoreError::DbIndexOutOfRange)));
        assert_eq!(keyspace.selected(), 1);
    }

    #[test]
    fn increment_rules() {
        assert_eq!(increment::<i64>(None, 5).unwrap(), 5);
        assert_eq!(increment::<i64>(Some(b""), -2).unwrap(), -2);
        assert_eq!(increment::<i64>(Some(b"40"), 2).unwrap(), 42);
        assert!(matches!(
            increment::<i64>(Some(b"abc"), 1),
            Err(StoreError::NotInteger)
        ));
        assert!(matches!(
            increment::<i64>(Some(b"9223372036854775807"), 1),
            Err(StoreError::Overflow)
        ));
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let (_dir, keyspace) = keyspace(1);

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let keyspace = keyspace.clone();
                scope.spawn(move || {
                    for round in 0..100 {
                        keyspace.incr_by(b"counter", 1).unwrap();
                        keyspace
                            .sadd(b"set", &[Bytes::from(format!("{writer}:{round}"))])
                            .unwrap();
                        keyspace
                            .hincr_by(b"hash", b"field", 1)
                            .unwrap();
                        if round % 10 == 0 {
                            keyspace.delete(&[Bytes::from("scratch")]).unwrap();
                            keyspace.sadd(b"scratch", &[Bytes::from("m")]).unwrap();
                        }
                    }
                });
            }
        });

        assert_eq!(keyspace.get(b"counter").unwrap(), Some(Bytes::from("800")));
        assert_eq!(keyspace.scard(b"set").unwrap(), 800);
        assert_eq!(keyspace.smembers(b"set").unwrap().len(), 800);
        assert_eq!(keyspace.hget(b"hash", b"field").unwrap(), Some(Bytes::from("800")));
        assert_eq!(keyspace.scard(b"scratch").unwrap(), 1);

        // Each live container owns a distinct key id.
        let db = keyspace.db().unwrap();
        let ids: Vec<Vec<u8>> = KeyKind::CONTAINERS
            .into_iter()
            .filter(|kind| *kind != KeyKind::String)
            .flat_map(|kind| {
                db.iterate(&key_codec::kind_prefix(kind), None)
                    .map(|entry| entry.unwrap().1[..key_codec::KEY_ID_LEN].to_vec())
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all_unique());
    }

    #[test]
    fn legacy_containers_are_readable() {
        let (_dir, keyspace) = keyspace(1);

        {
            let db = keyspace.db().unwrap();
            let mut batch = WriteBatch::new();
            batch.put(
                key_codec::encode(KeyKind::Set, b"old", &[]),
                2u64.to_be_bytes().to_vec(),
            );
            batch.put(key_codec::encode(KeyKind::SetMember, b"old", b"a"), vec![]);
            batch.put(key_codec::encode(KeyKind::SetMember, b"old", b"b"), vec![]);
            db.write(batch).unwrap();
        }

        assert_eq!(keyspace.scard(b"old").unwrap(), 2);
        assert!(keyspace.sismember(b"old", b"a").unwrap());

        assert_eq!(keyspace.sadd(b"old", &[Bytes::from("c")]).unwrap(), 1);
        assert_eq!(
            keyspace.smembers(b"old").unwrap(),
            vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]
        );
    }
}
