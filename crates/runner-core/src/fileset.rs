//! Fileset normalization (spec §4.7 step 1, §6 "Fileset input").
//!
//! A fileset is a mapping from dataset label to either a bare list of
//! filenames (requiring a top-level tree name) or a structured entry
//! carrying its own tree name, per-file tree names, and metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RunnerError;
use crate::filemeta::{FileMeta, Metadata, RESERVED_METADATA_KEYS};

pub type Fileset = BTreeMap<String, FilesetEntry>;

/// One dataset's worth of input. `serde(untagged)` mirrors the original's
/// duck-typed `list | {files, treename?, metadata?}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilesetEntry {
    List(Vec<String>),
    Structured {
        files: FilesOrMap,
        #[serde(default)]
        treename: Option<String>,
        #[serde(default)]
        metadata: Option<Metadata>,
    },
}

/// `files` may be a bare list sharing one tree name, or a map assigning a
/// tree name per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilesOrMap {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

fn validate_metadata(metadata: &Metadata) -> Result<(), RunnerError> {
    for key in metadata.keys() {
        if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
            return Err(RunnerError::Configuration(format!(
                "user metadata key {key:?} collides with a reserved FileMeta field"
            )));
        }
    }
    Ok(())
}

fn build_filemetas(
    dataset: &str,
    files: &FilesOrMap,
    entry_treename: Option<&str>,
    default_treename: Option<&str>,
    metadata: Option<&Metadata>,
) -> Result<Vec<FileMeta>, RunnerError> {
    if let Some(metadata) = metadata {
        validate_metadata(metadata)?;
    }

    let per_file: Vec<(String, Option<&str>)> = match files {
        FilesOrMap::List(list) => list.iter().map(|f| (f.clone(), None)).collect(),
        FilesOrMap::Map(map) => map.iter().map(|(f, t)| (f.clone(), Some(t.as_str()))).collect(),
    };

    let mut out = Vec::with_capacity(per_file.len());
    for (filename, file_treename) in per_file {
        let treename = file_treename
            .or(entry_treename)
            .or(default_treename)
            .ok_or_else(|| {
                RunnerError::Configuration(format!(
                    "no treename given for {filename:?} in dataset {dataset:?} (not per-file, not per-dataset, not a default)"
                ))
            })?;
        let mut fm = FileMeta::new(dataset, filename, treename);
        if let Some(metadata) = metadata {
            fm.metadata = Some(metadata.clone());
        }
        out.push(fm);
    }
    Ok(out)
}

/// Flatten a `Fileset` into `FileMeta` records, validating treenames and
/// rejecting reserved-key collisions in user metadata (spec §4.7 step 1).
///
/// `FileMeta::metadata` set here carries only user-supplied keys; the
/// reserved `numentries`/`uuid`/`clusters` triad is filled in later by the
/// preprocessor, which treats a metadata-bearing-but-not-yet-ready record
/// the same as a bare one.
pub fn normalize(fileset: &Fileset, default_treename: Option<&str>) -> Result<Vec<FileMeta>, RunnerError> {
    let mut out = Vec::new();
    for (dataset, entry) in fileset {
        let batch = match entry {
            FilesetEntry::List(files) => build_filemetas(
                dataset,
                &FilesOrMap::List(files.clone()),
                None,
                default_treename,
                None,
            )?,
            FilesetEntry::Structured {
                files,
                treename,
                metadata,
            } => build_filemetas(dataset, files, treename.as_deref(), default_treename, metadata.as_ref())?,
        };
        out.extend(batch);
    }
    Ok(out)
}

/// Strip the reserved triad back out, leaving only user metadata. Used
/// when re-checking a `FileMeta` produced by `normalize` is still user-only
/// (i.e. not accidentally pre-populated by a caller).
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_METADATA_KEYS.contains(&key)
}
