//! Test helpers for writing feature streams and scratch workspaces.

use camino::{Utf8Path, Utf8PathBuf};
use citydb_core::Feature;
use citydb_core::test_support::{building, related_to};
use std::fs;
use tempfile::TempDir;

/// Scratch directory holding the input stream, database and reference store.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn input(&self) -> Utf8PathBuf {
        self.root.join("features.jsonl")
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("db").join("city.db")
    }

    pub(super) fn cache_dir(&self) -> Utf8PathBuf {
        self.root.join("cache")
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write test file");
}

/// Write `features` as JSON Lines.
pub(super) fn write_feature_lines(path: &Utf8Path, features: &[Feature]) {
    let mut payload = String::new();
    for feature in features {
        payload.push_str(&serde_json::to_string(feature).expect("encode feature"));
        payload.push('\n');
    }
    write_utf8(path, payload.as_bytes());
}

/// `bldg-2` refers to `bldg-1`, which follows it in the stream.
pub(super) fn related_buildings() -> Vec<Feature> {
    vec![related_to(building("bldg-2"), "#bldg-1"), building("bldg-1")]
}
