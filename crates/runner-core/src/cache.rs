//! MetadataCache — bounded LRU from file identity to metadata (spec §3, §9).
//!
//! Single-writer, driver-only: the cache is mutated between preprocessing
//! phases and read via copy-out to populate `FileMeta`s. No internal
//! locking is needed for that usage; `SharedMetadataCache` below adds a
//! mutex only for the process-global default, which may be reused across
//! multiple `Runner` invocations in the same process. `tokio::sync::Mutex`
//! rather than `std::sync::Mutex`, since the preprocessor holds the guard
//! across the `.await` points where probe tasks complete.

use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;

use lru::LruCache;

use crate::filemeta::{FileMeta, Metadata};

pub const DEFAULT_CAPACITY: usize = 100_000;

/// Key is `(filename, treename)` — FileMeta's identity, dataset excluded.
pub struct MetadataCache {
    inner: LruCache<(String, String), Metadata>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: LruCache::new(capacity),
        }
    }

    fn key(filemeta: &FileMeta) -> (String, String) {
        (filemeta.filename.clone(), filemeta.treename.clone())
    }

    /// Look up cached metadata for `filemeta`'s identity.
    pub fn get(&mut self, filemeta: &FileMeta) -> Option<Metadata> {
        self.inner.get(&Self::key(filemeta)).cloned()
    }

    /// Insert or refresh the cached metadata for `filemeta`'s identity.
    pub fn put(&mut self, filemeta: &FileMeta, metadata: Metadata) {
        self.inner.put(Self::key(filemeta), metadata);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

pub type SharedMetadataCache = Arc<Mutex<MetadataCache>>;

static GLOBAL_CACHE: OnceLock<SharedMetadataCache> = OnceLock::new();

/// The process-wide default metadata cache (spec §9 "Global LRU default").
/// Constructed on first use, reused across `Runner` invocations, and
/// replaceable per-run by passing an explicit cache into `RunnerConfig`.
pub fn global_metadata_cache() -> SharedMetadataCache {
    GLOBAL_CACHE
        .get_or_init(|| Arc::new(Mutex::new(MetadataCache::default())))
        .clone()
}
