use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Instant,
};

use crate::{
    result::{Error, Result},
    utils::MutexUtils,
};

/// One tracked temporary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub created_at: Instant,
}

/// Thread-safe mapping from a scratch file path to its registration time.
///
/// Every operation only mutates the in-memory mapping under a single lock.
/// No filesystem access is ever done here, callers do it outside the lock.
///
/// An entry in the registry means the file *may* exist on disk, not that it does.
#[derive(Debug, Default)]
pub struct FileRegistry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<PathBuf, Entry>,

    /// Once set, no new entry can be registered
    sealed: bool,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `path` with the timestamp `now`.
    ///
    /// Registering an already tracked path refreshes its age.
    /// Fails with [`Error::ShutDown`] once the registry is sealed.
    pub fn register(&self, path: PathBuf, now: Instant) -> Result<Entry> {
        self.inner.with_lock(|mut inner| {
            if inner.sealed {
                return Err(Error::ShutDown);
            }

            let entry = Entry {
                path: path.clone(),
                created_at: now,
            };
            inner.entries.insert(path, entry.clone());
            Ok(entry)
        })
    }

    /// Remove the entry if present and return whether it was.
    pub fn unregister(&self, path: &Path) -> bool {
        self.inner
            .with_lock(|mut inner| inner.entries.remove(path).is_some())
    }

    /// Remove the entry only if it was registered strictly before `cutoff`.
    ///
    /// An entry refreshed since a stale snapshot was taken is kept.
    pub fn unregister_if_stale(&self, path: &Path, cutoff: Instant) -> bool {
        self.inner.with_lock(|mut inner| {
            let stale = inner
                .entries
                .get(path)
                .is_some_and(|entry| entry.created_at < cutoff);
            if stale {
                inner.entries.remove(path);
            }
            stale
        })
    }

    /// Paths of all the entries registered strictly before `cutoff`.
    ///
    /// The entries are left in place.
    pub fn snapshot_stale_before(&self, cutoff: Instant) -> Vec<PathBuf> {
        self.inner.with_lock(|inner| {
            inner
                .entries
                .values()
                .filter(|entry| entry.created_at < cutoff)
                .map(|entry| entry.path.clone())
                .collect()
        })
    }

    pub fn snapshot_all(&self) -> Vec<PathBuf> {
        self.inner
            .with_lock(|inner| inner.entries.keys().cloned().collect())
    }

    /// Refuse every future registration.
    /// Return whether the registry was already sealed.
    pub fn seal(&self) -> bool {
        self.inner
            .with_lock(|mut inner| std::mem::replace(&mut inner.sealed, true))
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.with_lock(|inner| inner.sealed)
    }

    pub fn get(&self, path: &Path) -> Option<Entry> {
        self.inner.with_lock(|inner| inner.entries.get(path).cloned())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.with_lock(|inner| inner.entries.contains_key(path))
    }

    pub fn len(&self) -> usize {
        self.inner.with_lock(|inner| inner.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[test]
    fn test_register_refreshes_age() {
        let registry = FileRegistry::new();
        let path = PathBuf::from("/scratch/v1.mp4");
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(10);

        registry.register(path.clone(), t0).unwrap();
        let entry = registry.register(path.clone(), t1).unwrap();

        assert_eq!(entry.created_at, t1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&path).unwrap().created_at, t1);
    }

    #[test]
    fn test_unregister_if_stale_keeps_refreshed_entry() {
        let registry = FileRegistry::new();
        let path = PathBuf::from("/scratch/v1.mp4");
        let t0 = Instant::now();
        let cutoff = t0 + Duration::from_secs(5);

        registry.register(path.clone(), t0).unwrap();
        assert_eq!(registry.snapshot_stale_before(cutoff), [path.clone()]);

        // Re-allocated after the snapshot
        registry.register(path.clone(), cutoff).unwrap();
        assert!(!registry.unregister_if_stale(&path, cutoff));
        assert!(registry.contains(&path));

        assert!(registry.unregister_if_stale(&path, cutoff + Duration::from_secs(1)));
        assert!(!registry.contains(&path));
        assert!(!registry.unregister_if_stale(&path, cutoff + Duration::from_secs(1)));
    }

    #[test]
    fn test_unregister_reports_presence() {
        let registry = FileRegistry::new();
        let path = PathBuf::from("/scratch/v1.mp4");

        assert!(!registry.unregister(&path));
        registry.register(path.clone(), Instant::now()).unwrap();
        assert!(registry.unregister(&path));
        assert!(!registry.unregister(&path));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_stale_before_is_strict_and_non_destructive() {
        let registry = FileRegistry::new();
        let t0 = Instant::now();
        let old = PathBuf::from("/scratch/old.mp4");
        let edge = PathBuf::from("/scratch/edge.mp4");
        let new = PathBuf::from("/scratch/new.mp4");

        registry.register(old.clone(), t0).unwrap();
        registry
            .register(edge.clone(), t0 + Duration::from_secs(5))
            .unwrap();
        registry
            .register(new, t0 + Duration::from_secs(9))
            .unwrap();

        let stale = registry.snapshot_stale_before(t0 + Duration::from_secs(5));
        assert_eq!(stale, vec![old]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&edge));
    }

    #[test]
    fn test_sealed_registry_refuses_registration() {
        let registry = FileRegistry::new();
        let path = PathBuf::from("/scratch/v1.mp4");
        registry.register(path.clone(), Instant::now()).unwrap();

        assert!(!registry.seal());
        assert!(registry.seal());
        assert!(registry.is_sealed());
        assert!(matches!(
            registry.register(PathBuf::from("/scratch/v2.mp4"), Instant::now()),
            Err(Error::ShutDown)
        ));

        // Existing entries can still be drained
        assert_eq!(registry.snapshot_all(), vec![path.clone()]);
        assert!(registry.unregister(&path));
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(FileRegistry::new());
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let path = PathBuf::from(format!("/scratch/{t}-{i}.mp4"));
                        registry.register(path, now).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 800);
        assert_eq!(registry.snapshot_all().len(), 800);
    }
}
