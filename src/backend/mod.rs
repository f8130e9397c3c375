//! Ordered key/value storage backends.
//!
//! Everything above this module sees a flat, byte-ordered namespace with point
//! reads, atomic write batches and ascending prefix scans. Three stores plug in
//! behind [`StorageBackend`]:
//!
//! - [`LsmBackend`]: disk-backed sorted LSM store, the default.
//! - [`BtreeBackend`]: transactional copy-on-write B-tree in a single file.
//! - [`MemoryBackend`]: sorted in-memory map for tests and throwaway instances.

pub mod btree;
pub mod lsm;
pub mod memory;

use std::collections::HashMap;
use std::path::Path;

use strum_macros::{Display, EnumString};
use thiserror::Error as ThisError;

pub use btree::BtreeBackend;
pub use lsm::LsmBackend;
pub use memory::MemoryBackend;

/// Number of entries fetched per page while iterating.
const PAGE_SIZE: usize = 256;

#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("ERR storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ERR lsm storage error: {0}")]
    Lsm(#[from] fjall::Error),
    #[error("ERR btree storage error: {0}")]
    Btree(#[from] redb::Error),
    #[error("ERR invalid backend option {key}={value}")]
    InvalidOption { key: String, value: String },
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Free-form options handed to the selected backend when it is opened.
pub type BackendOptions = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Lsm,
    Btree,
    Memory,
}

impl BackendKind {
    /// Opens a backend of this kind rooted at `path`.
    pub fn open(self, path: &Path, options: &BackendOptions) -> BackendResult<Box<dyn StorageBackend>> {
        let backend: Box<dyn StorageBackend> = match self {
            BackendKind::Lsm => Box::new(LsmBackend::open(path, options)?),
            BackendKind::Btree => Box::new(BtreeBackend::open(path, options)?),
            BackendKind::Memory => Box::new(MemoryBackend::new()),
        };

        Ok(backend)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// A set of writes applied as one unit by [`StorageBackend::write`].
///
/// Dropping a batch without writing it discards every staged operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put(key.into(), value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete(key.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Pluggable ordered key/value store.
///
/// Implementations must apply a [`WriteBatch`] atomically, and a page returned
/// by [`StorageBackend::scan`] must never expose half of a batch.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &[u8]) -> BackendResult<Option<Vec<u8>>>;

    fn write(&self, batch: WriteBatch) -> BackendResult<()>;

    /// Returns up to `limit` entries whose key starts with `prefix`, in
    /// ascending key order, beginning at `start` when it sorts after `prefix`.
    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: usize,
    ) -> BackendResult<Vec<(Vec<u8>, Vec<u8>)>>;

    fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch)
    }

    fn delete(&self, key: &[u8]) -> BackendResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write(batch)
    }
}

impl<'b> dyn StorageBackend + 'b {
    /// Iterates every entry under `prefix` (from `start` when given), fetching
    /// pages lazily.
    pub fn iterate(&self, prefix: &[u8], start: Option<&[u8]>) -> ScanIter<'_> {
        ScanIter {
            backend: self,
            prefix: prefix.to_vec(),
            next_start: start.map(<[u8]>::to_vec),
            page: Vec::new().into_iter(),
            exhausted: false,
        }
    }
}

/// The lower bound a scan starts from: whichever of `prefix` and `start` sorts last.
pub(crate) fn scan_lower_bound<'a>(prefix: &'a [u8], start: Option<&'a [u8]>) -> &'a [u8] {
    match start {
        Some(start) if start > prefix => start,
        _ => prefix,
    }
}

/// Ascending iterator over a key range, see [`StorageBackend::scan`].
pub struct ScanIter<'a> {
    backend: &'a dyn StorageBackend,
    prefix: Vec<u8>,
    next_start: Option<Vec<u8>>,
    page: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
    exhausted: bool,
}

impl Iterator for ScanIter<'_> {
    type Item = BackendResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.page.next() {
                return Some(Ok(entry));
            }

            if self.exhausted {
                return None;
            }

            let page = match self
                .backend
                .scan(&self.prefix, self.next_start.as_deref(), PAGE_SIZE)
            {
                Ok(page) => page,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            };

            self.exhausted = page.len() < PAGE_SIZE;
            if let Some((last, _)) = page.last() {
                // The smallest key sorting after `last`.
                let mut next = last.clone();
                next.push(0);
                self.next_start = Some(next);
            }
            self.page = page.into_iter();
        }
    }
}
