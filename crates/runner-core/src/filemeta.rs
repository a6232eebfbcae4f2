//! FileMeta — driver-side record describing one input file (spec §3).

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arbitrary per-file metadata. `numentries`/`uuid`/`clusters` are reserved
/// keys managed by the preprocessor; anything else is user metadata that
/// gets propagated onto every `WorkItem` of the file.
pub type Metadata = serde_json::Map<String, Value>;

/// Keys a caller's user metadata may never use (spec §3).
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "dataset",
    "filename",
    "treename",
    "metadata",
    "entrystart",
    "entrystop",
    "fileuuid",
    "numentries",
    "uuid",
    "clusters",
];

/// One input file within a dataset. Mutable until the preprocessor
/// populates `metadata` exactly once; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub dataset: String,
    pub filename: String,
    pub treename: String,
    pub metadata: Option<Metadata>,
}

impl FileMeta {
    pub fn new(dataset: impl Into<String>, filename: impl Into<String>, treename: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            filename: filename.into(),
            treename: treename.into(),
            metadata: None,
        }
    }

    /// Populate `self.metadata` from a cache keyed on this file's identity,
    /// if present. A no-op otherwise (spec §4.3 step 5).
    pub fn maybe_populate(&mut self, cache: &mut crate::cache::MetadataCache) {
        if let Some(metadata) = cache.get(self) {
            self.metadata = Some(metadata);
        }
    }

    /// True iff `metadata` carries at least `numentries`/`uuid`, and
    /// additionally `clusters` when `require_clusters` is set.
    pub fn populated(&self, require_clusters: bool) -> bool {
        let Some(metadata) = &self.metadata else {
            return false;
        };
        if !metadata.contains_key("numentries") || !metadata.contains_key("uuid") {
            return false;
        }
        if require_clusters && !metadata.contains_key("clusters") {
            return false;
        }
        true
    }

    pub fn numentries(&self) -> Option<u64> {
        self.metadata.as_ref()?.get("numentries")?.as_u64()
    }

    pub fn uuid_bytes(&self) -> Option<Vec<u8>> {
        let v = self.metadata.as_ref()?.get("uuid")?;
        match v {
            Value::String(s) => hex::decode(s).ok(),
            Value::Array(arr) => arr.iter().map(|x| x.as_u64().map(|n| n as u8)).collect(),
            _ => None,
        }
    }

    pub fn clusters(&self) -> Option<Vec<u64>> {
        let arr = self.metadata.as_ref()?.get("clusters")?.as_array()?;
        arr.iter().map(|v| v.as_u64()).collect()
    }

    /// User-supplied keys outside the reserved set, copied verbatim onto
    /// every `WorkItem` the chunker emits for this file.
    pub fn user_metadata(&self) -> Metadata {
        let mut out = Metadata::new();
        if let Some(metadata) = &self.metadata {
            for (k, v) in metadata {
                if !RESERVED_METADATA_KEYS.contains(&k.as_str()) {
                    out.insert(k.clone(), v.clone());
                }
            }
        }
        out
    }
}

/// Identity is `(filename, treename)`; dataset is excluded (spec §3).
impl PartialEq for FileMeta {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename && self.treename == other.treename
    }
}
impl Eq for FileMeta {}

impl Hash for FileMeta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filename.hash(state);
        self.treename.hash(state);
    }
}
