//! Background reclamation of the components of deleted objects.
//!
//! Deleting a composite object only removes its container key and leaves a
//! tombstone per component kind:
//!
//! ```text
//! key:   0x7f | len | <component prefix>
//! value: <component prefix>
//! ```
//!
//! Each pass walks the tombstones of every database and deletes the keys under
//! their prefixes, at most `batch_size` keys per pass. A tombstone goes away in
//! the same batch as the last of its keys, so an interrupted pass resumes where
//! it stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::backend::{StorageBackend, WriteBatch};
use crate::db::DatabaseManager;
use crate::error::StoreResult;
use crate::key_codec::{self, KeyKind};

/// What a single pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub tombstones_seen: usize,
    pub tombstones_removed: usize,
    pub keys_removed: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct GarbageCollector {
    manager: Arc<DatabaseManager>,
    interval: Duration,
    batch_size: usize,
}

impl GarbageCollector {
    pub fn new(manager: Arc<DatabaseManager>, interval: Duration, batch_size: usize) -> Self {
        Self {
            manager,
            interval,
            batch_size: batch_size.max(1),
        }
    }

    /// Sweeps every `interval` until `shutdown` changes or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    debug!("garbage collector stopped");
                    return;
                }
            }

            let collector = self.clone();
            match tokio::task::spawn_blocking(move || collector.sweep()).await {
                Ok(stats) if stats.keys_removed > 0 || stats.errors > 0 => {
                    debug!(?stats, "garbage collection pass");
                }
                Ok(_) => {}
                Err(err) => error!(cause = %err, "garbage collection pass failed"),
            }
        }
    }

    /// Runs one bounded pass over every database.
    pub fn sweep(&self) -> GcStats {
        self.manager.with_structural_lock(|| {
            let mut stats = GcStats::default();
            let mut budget = self.batch_size;

            for index in 0..self.manager.count() {
                if budget == 0 {
                    break;
                }
                let Some(db) = self.manager.get(index) else {
                    continue;
                };
                sweep_database(&**db, index, &mut budget, &mut stats);
            }

            stats
        })
    }
}

fn sweep_database(db: &dyn StorageBackend, index: usize, budget: &mut usize, stats: &mut GcStats) {
    let tombstones = key_codec::kind_prefix(KeyKind::Tombstone);

    for entry in db.iterate(&tombstones, None) {
        if *budget == 0 {
            return;
        }

        let (tombstone, prefix) = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(database = index, cause = %err, "cannot list tombstones");
                stats.errors += 1;
                return;
            }
        };
        stats.tombstones_seen += 1;

        match reclaim(db, &tombstone, &prefix, *budget) {
            Ok(Reclaimed { keys, finished }) => {
                *budget -= keys;
                stats.keys_removed += keys;
                if finished {
                    stats.tombstones_removed += 1;
                }
            }
            Err(err) => {
                warn!(database = index, cause = %err, "cannot reclaim tombstone");
                stats.errors += 1;
            }
        }
    }
}

struct Reclaimed {
    keys: usize,
    finished: bool,
}

/// Deletes up to `budget` keys under the prefix a tombstone names.
fn reclaim(db: &dyn StorageBackend, tombstone: &[u8], prefix: &[u8], budget: usize) -> StoreResult<Reclaimed> {
    if !is_component_prefix(tombstone, prefix) {
        // Never scan a prefix that could cover live objects.
        warn!("dropping malformed tombstone");
        db.delete(tombstone)?;
        return Ok(Reclaimed {
            keys: 0,
            finished: true,
        });
    }

    let mut keys = db
        .iterate(prefix, None)
        .take(budget + 1)
        .map(|entry| entry.map(|(key, _)| key))
        .collect::<Result<Vec<_>, _>>()?;

    let finished = keys.len() <= budget;
    keys.truncate(budget);

    let removed = keys.len();
    let mut batch = WriteBatch::new();
    for key in keys {
        batch.delete(key);
    }
    if finished {
        batch.delete(tombstone.to_vec());
    }
    db.write(batch)?;

    Ok(Reclaimed {
        keys: removed,
        finished,
    })
}

fn is_component_prefix(tombstone: &[u8], prefix: &[u8]) -> bool {
    let Ok(decoded) = key_codec::decode(prefix) else {
        return false;
    };

    let is_component = KeyKind::CONTAINERS
        .iter()
        .any(|container| container.components().contains(&decoded.kind));

    is_component
        && decoded.component.is_empty()
        && tombstone == key_codec::encode(KeyKind::Tombstone, prefix, &[]).as_slice()
}
