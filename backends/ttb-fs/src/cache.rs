// this_file: backends/ttb-fs/src/cache.rs

//! File digest cache.

use log::trace;
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use ttb_core::utils::sha256_reader;
use ttb_core::Digest;

/// Files modified more recently than this are hashed but never cached: a
/// rewrite inside the filesystem's timestamp granularity keeps the same
/// mtime.
pub const RACY_WINDOW: Duration = Duration::from_secs(2);

/// Key for digest lookups. A file that changes size or mtime misses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct DigestKey {
    pub path: PathBuf,
    pub len: u64,
    pub mtime: Option<SystemTime>,
}

impl DigestKey {
    pub fn for_path(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            path: path.to_owned(),
            len: meta.len(),
            mtime: meta.modified().ok(),
        })
    }

    /// Whether the file has been left alone long enough to trust its mtime.
    fn is_settled(&self, now: SystemTime) -> bool {
        self.mtime
            .and_then(|mtime| now.duration_since(mtime).ok())
            .is_some_and(|age| age >= RACY_WINDOW)
    }
}

/// Shared LRU cache of file digests.
///
/// Can be handed to several hosts through an `Arc`, so repeated runs over
/// the same tree hash each unchanged file once.
pub struct DigestCache {
    entries: Option<Mutex<LruCache<DigestKey, Digest>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DigestCache {
    /// Create a cache holding up to `capacity` digests; 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// SHA-256 of the file at `path`, from cache when it is unchanged.
    pub fn file_digest(&self, path: &Path) -> io::Result<Digest> {
        let key = DigestKey::for_path(path)?;

        if let Some(entries) = &self.entries {
            if let Some(digest) = entries.lock().get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(digest.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let digest = sha256_reader(File::open(path)?)?;
        if let Some(entries) = &self.entries {
            if key.is_settled(SystemTime::now()) {
                entries.lock().put(key, digest.clone());
            } else {
                trace!(target: "ttb::fs", "not caching digest of recently modified {}", path.display());
            }
        }
        Ok(digest)
    }

    /// Forget every digest recorded for `path`.
    pub fn invalidate(&self, path: &Path) {
        let Some(entries) = &self.entries else {
            return;
        };
        let mut entries = entries.lock();
        let stale: Vec<DigestKey> = entries
            .iter()
            .filter(|(key, _)| key.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    pub fn stats(&self) -> DigestCacheStats {
        DigestCacheStats {
            entries: self.entries.as_ref().map_or(0, |e| e.lock().len()),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Digest cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttb_core::utils::sha256_digest;

    /// Move the file's mtime out of the racy window.
    fn settle(path: &Path) {
        let past = SystemTime::now() - Duration::from_secs(60);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(past)
            .unwrap();
    }

    #[test]
    fn test_repeated_lookup_hits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.fmt");
        fs::write(&path, b"format dump").unwrap();
        settle(&path);

        let cache = DigestCache::new(4);
        let first = cache.file_digest(&path).unwrap();
        let second = cache.file_digest(&path).unwrap();
        assert_eq!(first, sha256_digest(b"format dump"));
        assert_eq!(first, second);
        assert_eq!(
            cache.stats(),
            DigestCacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn test_changed_size_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.aux");
        fs::write(&path, b"\\relax").unwrap();

        let cache = DigestCache::new(4);
        cache.file_digest(&path).unwrap();
        fs::write(&path, b"\\relax\\citation{knuth}").unwrap();
        let digest = cache.file_digest(&path).unwrap();
        assert_eq!(digest, sha256_digest(b"\\relax\\citation{knuth}"));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_same_length_rewrite_is_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.aux");
        fs::write(&path, b"\\citation{aaaa}").unwrap();

        let cache = DigestCache::new(4);
        assert_eq!(cache.file_digest(&path).unwrap(), sha256_digest(b"\\citation{aaaa}"));
        fs::write(&path, b"\\citation{bbbb}").unwrap();
        assert_eq!(cache.file_digest(&path).unwrap(), sha256_digest(b"\\citation{bbbb}"));
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_invalidate_drops_settled_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.aux");
        fs::write(&path, b"\\citation{aaaa}").unwrap();
        settle(&path);
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();

        let cache = DigestCache::new(4);
        cache.file_digest(&path).unwrap();
        assert_eq!(cache.stats().entries, 1);

        // Same length and the same mtime: only invalidation reveals the change.
        fs::write(&path, b"\\citation{bbbb}").unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        cache.invalidate(&path);
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.file_digest(&path).unwrap(), sha256_digest(b"\\citation{bbbb}"));
    }

    #[test]
    fn test_disabled_cache_always_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, b"x").unwrap();

        let cache = DigestCache::new(0);
        cache.file_digest(&path).unwrap();
        cache.file_digest(&path).unwrap();
        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (0, 0, 2));
        cache.clear();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let cache = DigestCache::new(4);
        let err = cache.file_digest(Path::new("/nonexistent/file.tfm")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
