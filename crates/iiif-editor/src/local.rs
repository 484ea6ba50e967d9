//! Session-local annotations, keyed by canvas id.
//!
//! Holds annotations created or edited in this session that are not
//! (yet) confirmed by a remote store, plus tombstones for remote entries
//! deleted or replaced locally. Every change replaces the canvas's whole
//! list and bumps `revision`, so observers compare a number instead of
//! diffing contents.

use iiif_core::annotation::dedup_key;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct LocalAnnotations {
    by_canvas: HashMap<String, Vec<Value>>,
    tombstones: HashMap<String, HashSet<String>>,
    revision: u64,
}

impl LocalAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn for_canvas(&self, canvas_id: &str) -> &[Value] {
        self.by_canvas
            .get(canvas_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, canvas_id: &str) -> usize {
        self.for_canvas(canvas_id).len()
    }

    pub fn contains(&self, canvas_id: &str, key: &str) -> bool {
        self.for_canvas(canvas_id)
            .iter()
            .any(|raw| dedup_key(raw) == key)
    }

    /// Insert or replace (by dedup key) an annotation on a canvas.
    pub fn upsert(&mut self, canvas_id: &str, raw: Value) {
        let key = dedup_key(&raw);
        let mut next: Vec<Value> = self
            .for_canvas(canvas_id)
            .iter()
            .filter(|existing| dedup_key(existing) != key)
            .cloned()
            .collect();
        next.push(raw);
        self.replace(canvas_id, next);
    }

    /// Drop a local annotation. Returns `false` when it was not held.
    pub fn remove(&mut self, canvas_id: &str, key: &str) -> bool {
        if !self.contains(canvas_id, key) {
            return false;
        }
        let next: Vec<Value> = self
            .for_canvas(canvas_id)
            .iter()
            .filter(|existing| dedup_key(existing) != key)
            .cloned()
            .collect();
        self.replace(canvas_id, next);
        true
    }

    fn replace(&mut self, canvas_id: &str, next: Vec<Value>) {
        self.by_canvas.insert(canvas_id.to_string(), next);
        self.revision += 1;
    }

    /// Hide a remote entry from the merge for the rest of the session.
    pub fn tombstone(&mut self, canvas_id: &str, key: &str) {
        let mut next = self.tombstones.get(canvas_id).cloned().unwrap_or_default();
        if next.insert(key.to_string()) {
            self.tombstones.insert(canvas_id.to_string(), next);
            self.revision += 1;
        }
    }

    pub fn is_tombstoned(&self, canvas_id: &str, key: &str) -> bool {
        self.tombstones
            .get(canvas_id)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Every local annotation across canvases, for export.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.by_canvas
            .iter()
            .flat_map(|(canvas, items)| items.iter().map(move |raw| (canvas.as_str(), raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_replaces_by_id() {
        let mut local = LocalAnnotations::new();
        local.upsert("c1", json!({"@id": "a", "v": 1}));
        local.upsert("c1", json!({"@id": "b"}));
        local.upsert("c1", json!({"@id": "a", "v": 2}));
        let items = local.for_canvas("c1");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["v"], 2);
        assert_eq!(local.revision(), 3);
        assert_eq!(local.count("c2"), 0);
    }

    #[test]
    fn remove_only_bumps_revision_on_change() {
        let mut local = LocalAnnotations::new();
        local.upsert("c1", json!({"@id": "a"}));
        assert!(!local.remove("c1", "zzz"));
        assert_eq!(local.revision(), 1);
        assert!(local.remove("c1", "a"));
        assert_eq!(local.revision(), 2);
        assert_eq!(local.count("c1"), 0);
    }

    #[test]
    fn tombstones_are_per_canvas() {
        let mut local = LocalAnnotations::new();
        local.tombstone("c1", "r1");
        local.tombstone("c1", "r1");
        assert!(local.is_tombstoned("c1", "r1"));
        assert!(!local.is_tombstoned("c2", "r1"));
        assert_eq!(local.revision(), 1);
    }
}
