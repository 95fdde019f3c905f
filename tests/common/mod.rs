#![allow(dead_code)]

use std::path::PathBuf;

use covtree::metric::Metric;
use covtree::tree::{CoverageTree, NodeId};
use covtree::value::Value;
use tempfile::TempDir;

pub const COBERTURA: &[u8] = include_bytes!("../fixtures/cobertura.xml");
pub const JACOCO: &[u8] = include_bytes!("../fixtures/jacoco.xml");
pub const MUTATIONS: &[u8] = include_bytes!("../fixtures/mutations.xml");

/// Write `content` to `name` inside a fresh temporary directory.
/// The caller must hold onto `TempDir` to keep the temp directory alive.
pub fn write_report(name: &str, content: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

/// `(covered, missed)` of a coverage value, panicking on anything else.
pub fn counts(tree: &CoverageTree, id: NodeId, metric: Metric) -> (u64, u64) {
    match tree.value(id, metric) {
        Some(Value::Coverage(c)) => (c.covered(), c.missed()),
        other => panic!("expected {metric} coverage, got {other:?}"),
    }
}

pub fn names(tree: &CoverageTree, ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(|id| tree.name(*id).to_string()).collect()
}
