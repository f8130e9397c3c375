//! Fixed array of numbered databases, each backed by its own store.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::{info, instrument};

use crate::backend::{BackendKind, BackendOptions, BackendResult, MemoryBackend, StorageBackend};
use crate::rdb::SNAPSHOT_FILE;

/// A borrowed database. The database cannot be reset while a handle is alive.
pub type DbHandle<'a> = RwLockReadGuard<'a, Box<dyn StorageBackend>>;

pub struct DatabaseManager {
    root: PathBuf,
    kind: BackendKind,
    options: BackendOptions,
    slots: Vec<RwLock<Box<dyn StorageBackend>>>,
    // One per database. Held across the read-modify-write of a mutation.
    writers: Vec<Mutex<()>>,
    snapshot_file: String,
    // Serializes resets against garbage collection passes.
    structural: Mutex<()>,
}

impl DatabaseManager {
    /// Opens `count` databases, database `i` living under `root/i`.
    #[instrument(skip(root, options), fields(root = %root.as_ref().display()))]
    pub fn setup_databases(
        root: impl AsRef<Path>,
        kind: BackendKind,
        options: BackendOptions,
        count: usize,
    ) -> BackendResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut slots = Vec::with_capacity(count);
        for index in 0..count {
            let backend = kind.open(&database_path(&root, index), &options)?;
            slots.push(RwLock::new(backend));
        }
        info!(count, %kind, "databases ready");

        let writers = (0..count).map(|_| Mutex::new(())).collect();

        Ok(Self {
            root,
            kind,
            options,
            slots,
            writers,
            snapshot_file: SNAPSHOT_FILE.to_string(),
            structural: Mutex::new(()),
        })
    }

    /// An in-memory manager that never touches `root` beyond creating it.
    pub fn in_memory(root: impl AsRef<Path>, count: usize) -> BackendResult<Self> {
        Self::setup_databases(root, BackendKind::Memory, BackendOptions::new(), count)
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names the file `SAVE` writes, relative to the root directory.
    pub fn with_snapshot_file(mut self, name: impl Into<String>) -> Self {
        self.snapshot_file = name.into();
        self
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(&self.snapshot_file)
    }

    pub fn get(&self, index: usize) -> Option<DbHandle<'_>> {
        self.slots.get(index).map(|slot| slot.read())
    }

    /// Excludes every other writer of database `index` until the guard drops.
    ///
    /// Take it before [`DatabaseManager::get`] so that the order is always
    /// writer lock first, then the slot.
    pub fn write_lock(&self, index: usize) -> Option<MutexGuard<'_, ()>> {
        self.writers.get(index).map(|writer| writer.lock())
    }

    /// Replaces database `index` with a fresh, empty store.
    ///
    /// Waits for every outstanding handle on that database to be released.
    #[instrument(skip(self))]
    pub fn reset_database(&self, index: usize) -> BackendResult<()> {
        let _structural = self.structural.lock();
        self.reset_locked(index)
    }

    pub fn reset_all(&self) -> BackendResult<()> {
        let _structural = self.structural.lock();
        (0..self.slots.len()).try_for_each(|index| self.reset_locked(index))
    }

    /// Runs `f` while no database can be reset.
    pub fn with_structural_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _structural = self.structural.lock();
        f()
    }

    fn reset_locked(&self, index: usize) -> BackendResult<()> {
        let Some(slot) = self.slots.get(index) else {
            return Ok(());
        };

        let mut backend = slot.write();
        // Close the old store before its files are removed.
        *backend = Box::new(MemoryBackend::new());

        let path = database_path(&self.root, index);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        *backend = self.kind.open(&path, &self.options)?;
        info!(index, "database reset");

        Ok(())
    }
}

fn database_path(root: &Path, index: usize) -> PathBuf {
    root.join(index.to_string())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn databases_are_isolated() {
        let dir = TempDir::new().unwrap();
        let manager = DatabaseManager::in_memory(dir.path(), 2).unwrap();

        manager.get(0).unwrap().put(b"key", b"zero").unwrap();
        assert_eq!(manager.get(1).unwrap().get(b"key").unwrap(), None);
        assert!(manager.get(2).is_none());
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn snapshot_path_defaults_to_dump_rdb() {
        let dir = TempDir::new().unwrap();
        let manager = DatabaseManager::in_memory(dir.path(), 1).unwrap();
        assert_eq!(manager.snapshot_path(), dir.path().join("dump.rdb"));

        let manager = manager.with_snapshot_file("backup.rdb");
        assert_eq!(manager.snapshot_path(), dir.path().join("backup.rdb"));
    }

    #[test]
    fn write_lock_is_per_database() {
        let dir = TempDir::new().unwrap();
        let manager = DatabaseManager::in_memory(dir.path(), 2).unwrap();

        let _zero = manager.write_lock(0).unwrap();
        assert!(manager.writers[0].try_lock().is_none());
        assert!(manager.writers[1].try_lock().is_some());
        assert!(manager.write_lock(2).is_none());
    }

    #[test]
    fn reset_empties_only_the_target() {
        let dir = TempDir::new().unwrap();
        let manager =
            DatabaseManager::setup_databases(dir.path(), BackendKind::Lsm, BackendOptions::new(), 2)
                .unwrap();

        manager.get(0).unwrap().put(b"key", b"zero").unwrap();
        manager.get(1).unwrap().put(b"key", b"one").unwrap();

        manager.reset_database(0).unwrap();

        assert_eq!(manager.get(0).unwrap().get(b"key").unwrap(), None);
        assert_eq!(
            manager.get(1).unwrap().get(b"key").unwrap(),
            Some(b"one".to_vec())
        );
    }

    #[test]
    fn reset_all_empties_everything() {
        let dir = TempDir::new().unwrap();
        let manager = DatabaseManager::setup_databases(
            dir.path(),
            BackendKind::Btree,
            BackendOptions::new(),
            3,
        )
        .unwrap();

        for index in 0..3 {
            manager.get(index).unwrap().put(b"key", b"value").unwrap();
        }
        manager.reset_all().unwrap();

        for index in 0..3 {
            assert_eq!(manager.get(index).unwrap().get(b"key").unwrap(), None);
        }
    }
}
