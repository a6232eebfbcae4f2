//! WorkItem — immutable chunk descriptor — and the Chunker that emits them
//! from a populated FileMeta (spec §3, §4.2).

use crate::filemeta::{FileMeta, Metadata};

/// One contiguous entry range of one file. Immutable once produced.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub dataset: String,
    pub filename: String,
    pub treename: String,
    pub entrystart: u64,
    pub entrystop: u64,
    pub fileuuid: Vec<u8>,
    /// Excluded from identity/hash (spec §3) — carried for the work
    /// function but doesn't distinguish otherwise-identical chunks.
    pub usermeta: Option<Metadata>,
}

impl WorkItem {
    pub fn len(&self) -> u64 {
        self.entrystop - self.entrystart
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Format `fileuuid` the way the original work function does: a
    /// hyphenated UUID string when 16 bytes are present, empty otherwise.
    pub fn fileuuid_string(&self) -> String {
        if self.fileuuid.len() == 16 {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(&self.fileuuid);
            uuid::Uuid::from_bytes(buf).to_string()
        } else {
            String::new()
        }
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.dataset == other.dataset
            && self.filename == other.filename
            && self.treename == other.treename
            && self.entrystart == other.entrystart
            && self.entrystop == other.entrystop
            && self.fileuuid == other.fileuuid
    }
}
impl Eq for WorkItem {}

impl std::hash::Hash for WorkItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.dataset.hash(state);
        self.filename.hash(state);
        self.treename.hash(state);
        self.entrystart.hash(state);
        self.entrystop.hash(state);
        self.fileuuid.hash(state);
    }
}

enum ChunkerState {
    Aligned {
        boundaries: Vec<u64>,
        idx: usize,
    },
    Unaligned {
        start: u64,
        numentries: u64,
        target_chunksize: u64,
        actual_chunksize: u64,
        recompute: bool,
    },
}

/// Cooperative chunk generator over one cluster-ready FileMeta.
///
/// Rust has no bidirectional generators, so the Python `chunks()`
/// coroutine (which accepts a revised `target_chunksize` via `send`)
/// becomes an explicit state machine: call `advance` repeatedly, each
/// time optionally supplying a new target size for unaligned mode.
pub struct Chunker {
    dataset: String,
    filename: String,
    treename: String,
    fileuuid: Vec<u8>,
    usermeta: Metadata,
    state: ChunkerState,
}

fn build_item(
    dataset: &str,
    filename: &str,
    treename: &str,
    fileuuid: &[u8],
    usermeta: &Metadata,
    start: u64,
    stop: u64,
) -> WorkItem {
    WorkItem {
        dataset: dataset.to_string(),
        filename: filename.to_string(),
        treename: treename.to_string(),
        entrystart: start,
        entrystop: stop,
        fileuuid: fileuuid.to_vec(),
        usermeta: Some(usermeta.clone()),
    }
}

impl Chunker {
    /// Build a chunker over `filemeta` targeting `target_chunksize` entries
    /// per chunk. `align_clusters` selects cluster-aligned mode.
    ///
    /// Panics if `filemeta` is not ready (not cluster-ready when
    /// `align_clusters` is set) — per spec §4.2 this is a programmer
    /// error, not a recoverable condition.
    pub fn new(filemeta: &FileMeta, target_chunksize: u64, align_clusters: bool) -> Self {
        assert!(
            filemeta.populated(align_clusters),
            "Chunker::new invoked on a not-ready FileMeta: {}:{}",
            filemeta.filename,
            filemeta.treename
        );
        let numentries = filemeta.numentries().expect("checked by populated()");
        let fileuuid = filemeta.uuid_bytes().unwrap_or_default();
        let usermeta = filemeta.user_metadata();

        let state = if align_clusters {
            let clusters = filemeta.clusters().expect("checked by populated()");
            let mut boundaries = vec![0u64];
            for &c in &clusters {
                if c >= boundaries.last().copied().unwrap() + target_chunksize {
                    boundaries.push(c);
                }
            }
            let last_cluster = *clusters.last().expect("clusters is non-empty");
            if boundaries.last().copied() != Some(last_cluster) {
                boundaries.push(last_cluster);
            }
            ChunkerState::Aligned { boundaries, idx: 0 }
        } else {
            ChunkerState::Unaligned {
                start: 0,
                numentries,
                target_chunksize,
                actual_chunksize: target_chunksize,
                recompute: true,
            }
        };

        Self {
            dataset: filemeta.dataset.clone(),
            filename: filemeta.filename.clone(),
            treename: filemeta.treename.clone(),
            fileuuid,
            usermeta,
            state,
        }
    }

    /// Produce the next WorkItem, or `None` when the file is exhausted.
    ///
    /// `feedback_chunksize`, if given, becomes the new target for
    /// subsequent chunks in unaligned mode (ignored in aligned mode,
    /// since cluster boundaries are fixed once computed).
    pub fn advance(&mut self, feedback_chunksize: Option<u64>) -> Option<WorkItem> {
        match &mut self.state {
            ChunkerState::Aligned { boundaries, idx } => {
                if *idx + 1 >= boundaries.len() {
                    return None;
                }
                let start = boundaries[*idx];
                let stop = boundaries[*idx + 1];
                *idx += 1;
                Some(build_item(
                    &self.dataset,
                    &self.filename,
                    &self.treename,
                    &self.fileuuid,
                    &self.usermeta,
                    start,
                    stop,
                ))
            }
            ChunkerState::Unaligned {
                start,
                numentries,
                target_chunksize,
                actual_chunksize,
                recompute,
            } => {
                if *start >= *numentries {
                    return None;
                }
                if *recompute {
                    let remaining = *numentries - *start;
                    let n = ((remaining as f64 / *target_chunksize as f64).round() as u64).max(1);
                    *actual_chunksize = remaining.div_ceil(n);
                }
                let stop = (*start + *actual_chunksize).min(*numentries);
                let item = build_item(
                    &self.dataset,
                    &self.filename,
                    &self.treename,
                    &self.fileuuid,
                    &self.usermeta,
                    *start,
                    stop,
                );
                *start = stop;
                match feedback_chunksize {
                    Some(next) if next != *target_chunksize => {
                        *target_chunksize = next;
                        *recompute = true;
                    }
                    _ => *recompute = false,
                }
                Some(item)
            }
        }
    }

    /// Drain all chunks with no dynamic resizing — the common case.
    pub fn collect_all(mut self) -> Vec<WorkItem> {
        let mut out = Vec::new();
        while let Some(item) = self.advance(None) {
            out.push(item);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filemeta::Metadata;

    fn ready_filemeta(numentries: u64) -> FileMeta {
        let mut fm = FileMeta::new("A", "f.root", "Events");
        let mut meta = Metadata::new();
        meta.insert("numentries".into(), numentries.into());
        meta.insert("uuid".into(), serde_json::Value::Array(vec![]));
        fm.metadata = Some(meta);
        fm
    }

    fn clustered_filemeta(numentries: u64, clusters: &[u64]) -> FileMeta {
        let mut fm = ready_filemeta(numentries);
        fm.metadata.as_mut().unwrap().insert(
            "clusters".into(),
            serde_json::Value::Array(clusters.iter().map(|&c| c.into()).collect()),
        );
        fm
    }

    #[test]
    fn s1_single_small_file() {
        let fm = ready_filemeta(50);
        let chunks = Chunker::new(&fm, 100, false).collect_all();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].entrystart, 0);
        assert_eq!(chunks[0].entrystop, 50);
    }

    #[test]
    fn s2_chunk_split_250_over_100() {
        let fm = ready_filemeta(250);
        let chunks = Chunker::new(&fm, 100, false).collect_all();
        let lens: Vec<u64> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![84, 83, 83]);
    }

    #[test]
    fn s3_cluster_alignment() {
        let fm = clustered_filemeta(150, &[0, 40, 90, 150]);
        let chunks = Chunker::new(&fm, 50, true).collect_all();
        let ranges: Vec<(u64, u64)> = chunks.iter().map(|c| (c.entrystart, c.entrystop)).collect();
        assert_eq!(ranges, vec![(0, 90), (90, 150)]);
    }

    #[test]
    fn partition_completeness_and_disjointness() {
        let fm = ready_filemeta(977);
        let chunks = Chunker::new(&fm, 130, false).collect_all();
        let mut cursor = 0u64;
        for c in &chunks {
            assert_eq!(c.entrystart, cursor);
            assert!(c.entrystop > c.entrystart);
            cursor = c.entrystop;
        }
        assert_eq!(cursor, 977);
    }

    #[test]
    fn chunk_size_bound_unaligned() {
        let numentries = 977u64;
        let target = 130u64;
        let fm = ready_filemeta(numentries);
        let chunks = Chunker::new(&fm, target, false).collect_all();
        let n = ((numentries as f64 / target as f64).round() as u64).max(1);
        let bound = numentries.div_ceil(n);
        for c in &chunks {
            assert!(c.len() <= bound);
        }
    }

    #[test]
    fn adaptive_resize_takes_effect_next_iteration() {
        let fm = ready_filemeta(1000);
        let mut chunker = Chunker::new(&fm, 100, false);
        let first = chunker.advance(None).unwrap();
        assert_eq!(first.len(), 100);
        // Shrink target after the first chunk; the in-flight chunk already
        // emitted is unaffected, the next one reflects the new target.
        let second = chunker.advance(Some(50)).unwrap();
        assert_eq!(second.len(), 50);
    }

    #[test]
    fn user_metadata_propagates_to_every_chunk() {
        let mut fm = ready_filemeta(200);
        fm.metadata
            .as_mut()
            .unwrap()
            .insert("campaign".into(), "2018".into());
        let chunks = Chunker::new(&fm, 100, false).collect_all();
        for c in &chunks {
            assert_eq!(c.usermeta.as_ref().unwrap().get("campaign").unwrap(), "2018");
        }
    }

    #[test]
    #[should_panic]
    fn chunker_panics_on_unready_filemeta() {
        let fm = FileMeta::new("A", "f.root", "Events");
        Chunker::new(&fm, 100, false);
    }
}
