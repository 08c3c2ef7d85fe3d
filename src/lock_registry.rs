// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Process-wide per-base-path read/write lock registry (spec §4.3).
//!
//! Every [`crate::Reader`] and [`crate::Writer`] opened against the same
//! base path shares one [`std::sync::RwLock`] instance, obtained from a
//! global table keyed by the canonicalized path. This is the same shape as
//! the teacher's file descriptor table (`descriptor_table/mod.rs`): a
//! global map guarded by its own lock, entries held behind `Arc`, with dead
//! entries reclaimed opportunistically rather than via an explicit
//! unregister call.

use rustc_hash::FxHashMap;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock, RwLock, Weak},
};

type StoreLock = Arc<RwLock<()>>;

fn registry() -> &'static Mutex<FxHashMap<PathBuf, Weak<RwLock<()>>>> {
    static REGISTRY: OnceLock<Mutex<FxHashMap<PathBuf, Weak<RwLock<()>>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(FxHashMap::default()))
}

/// Normalizes `path` into the key used for lock sharing.
///
/// Falls back to the path as given when it doesn't exist yet (e.g. before
/// the very first [`crate::Writer::open`] call creates the content file).
fn canonical_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Returns the shared lock for `path`'s store, creating it if this is the
/// first reader or writer to touch that path in this process.
pub fn get_or_create(path: &Path) -> StoreLock {
    let key = canonical_key(path);

    #[expect(clippy::unwrap_used, reason = "registry mutex is never poisoned by a panic while held")]
    let mut table = registry().lock().unwrap();

    if let Some(existing) = table.get(&key).and_then(Weak::upgrade) {
        return existing;
    }

    // Opportunistically drop dead entries while we already hold the table
    // lock, instead of maintaining a separate sweep pass.
    table.retain(|_, weak| weak.strong_count() > 0);

    let lock = Arc::new(RwLock::new(()));
    table.insert(key, Arc::downgrade(&lock));
    lock
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_path_shares_lock() {
        let dir = std::env::temp_dir().join("skiplog-lock-registry-test-shared");
        let a = get_or_create(&dir);
        let b = get_or_create(&dir);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_paths_get_different_locks() {
        let a = get_or_create(Path::new("/tmp/skiplog-lock-registry-test-a"));
        let b = get_or_create(Path::new("/tmp/skiplog-lock-registry-test-b"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn dead_entries_are_reclaimed() {
        let path = Path::new("/tmp/skiplog-lock-registry-test-reclaim");
        let key = canonical_key(path);

        {
            let lock = get_or_create(path);
            drop(lock);
        }

        // Force a sweep by requesting an unrelated path, then check that
        // the dead weak entry for `path` no longer lingers.
        let _ = get_or_create(Path::new("/tmp/skiplog-lock-registry-test-other"));

        let table = registry().lock().unwrap();
        assert!(table.get(&key).is_none());
    }
}
