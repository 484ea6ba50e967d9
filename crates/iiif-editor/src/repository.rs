//! Annotation repository: remote + local merge for the current canvas.
//!
//! The repository is sans-IO. `begin` decides whether a canvas needs a
//! network round trip and hands back a `FetchTicket`; the driver performs
//! the GET and feeds the result to `complete`. Each `begin` bumps a
//! generation counter, so a response for an older request (rapid canvas
//! switching, refresh while a fetch is in flight) is discarded instead of
//! overwriting newer state. After `close` nothing is applied.

use crate::local::LocalAnnotations;
use iiif_core::annotation::AnnotationView;
use iiif_core::error::Result;
use iiif_core::export::annotation_list_document;
use iiif_core::id::AnnotationId;
use iiif_core::manifest::{AnnotationSource, Canvas};
use iiif_core::model::Motivation;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

// ─── Merge ───────────────────────────────────────────────────────────────

/// Remote first, then local; the first occurrence of each key wins, so a
/// local copy never shadows a remote entry with the same id. Keys for
/// which `hidden` returns `true` are dropped from the remote side.
pub fn merge(remote: &[Value], local: &[Value], hidden: impl Fn(&str) -> bool) -> Vec<AnnotationView> {
    let mut seen = HashSet::new();
    remote
        .iter()
        .map(|raw| AnnotationView::parse(raw, false))
        .filter(|view| !hidden(&view.key))
        .chain(local.iter().map(|raw| AnnotationView::parse(raw, true)))
        .filter(|view| seen.insert(view.key.clone()))
        .collect()
}

/// Annotations out of a fetched list document: v2 `resources`, v3 `items`,
/// or a bare array.
pub fn list_resources(doc: &Value) -> Vec<Value> {
    let items = match doc {
        Value::Array(items) => Some(items),
        other => other
            .get("resources")
            .or_else(|| other.get("items"))
            .and_then(Value::as_array),
    };
    match items {
        Some(items) => items.clone(),
        None => {
            log::warn!("annotation list without resources, treating as empty");
            Vec::new()
        }
    }
}

// ─── Collection ──────────────────────────────────────────────────────────

/// The merged, deduplicated annotations of one canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationCollection {
    pub canvas_index: usize,
    pub canvas_id: String,
    pub annotations: Vec<AnnotationView>,
    /// Synthetic `sc:AnnotationList` wrapping the merged `full` objects.
    pub list: Value,
}

impl AnnotationCollection {
    fn build(canvas_index: usize, canvas_id: &str, list_id: &str, annotations: Vec<AnnotationView>) -> Self {
        let fulls: Vec<Value> = annotations.iter().map(|a| a.full.clone()).collect();
        Self {
            canvas_index,
            canvas_id: canvas_id.to_string(),
            list: annotation_list_document(list_id, canvas_id, &fulls),
            annotations,
        }
    }

    pub fn count(&self) -> usize {
        self.annotations.len()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&AnnotationView> {
        self.annotations.iter().find(|a| a.overlay_id() == id)
    }

    pub fn find_key(&self, key: &str) -> Option<&AnnotationView> {
        self.annotations.iter().find(|a| a.key == key)
    }

    pub fn filtered<'a>(&'a self, filter: &'a AnnotationFilter) -> impl Iterator<Item = &'a AnnotationView> {
        self.annotations.iter().filter(move |a| filter.matches(a))
    }
}

/// Narrow the list view without touching the published count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationFilter {
    pub motivation: Option<Motivation>,
    pub query: String,
}

impl AnnotationFilter {
    pub fn is_empty(&self) -> bool {
        self.motivation.is_none() && self.query.trim().is_empty()
    }

    pub fn matches(&self, view: &AnnotationView) -> bool {
        if let Some(wanted) = &self.motivation
            && !view.motivation.contains(wanted)
            && !(view.motivation.is_empty() && *wanted == Motivation::default())
        {
            return false;
        }
        let query = self.query.trim();
        query.is_empty() || view.chars.to_lowercase().contains(&query.to_lowercase())
    }
}

// ─── Repository ──────────────────────────────────────────────────────────

/// Identifies one outstanding list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub canvas_index: usize,
    pub canvas_id: String,
    pub list_id: String,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// The collection was republished synchronously.
    Ready,
    /// GET `url`, then call `complete` with the ticket.
    Fetch { ticket: FetchTicket, url: String },
}

#[derive(Debug, Clone)]
pub struct AnnotationRepository {
    generation: u64,
    alive: bool,
    collection: Option<AnnotationCollection>,
    /// Last remote set, with the canvas it belongs to.
    remote: Option<(String, Vec<Value>)>,
}

impl Default for AnnotationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationRepository {
    pub fn new() -> Self {
        Self {
            generation: 0,
            alive: true,
            collection: None,
            remote: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn collection(&self) -> Option<&AnnotationCollection> {
        self.collection.as_ref()
    }

    pub fn count(&self) -> usize {
        self.collection.as_ref().map_or(0, AnnotationCollection::count)
    }

    /// Start deriving `canvas`'s collection. Inline and list-less canvases
    /// publish immediately; remote lists publish the local entries now
    /// (plus the cached remote set when refreshing the same canvas) and
    /// return a ticket for the GET.
    pub fn begin(&mut self, canvas: &Canvas<'_>, local: &LocalAnnotations) -> FetchPlan {
        self.generation += 1;
        let canvas_id = canvas.id();
        let list_id = canvas
            .list_url()
            .unwrap_or_else(|| format!("{canvas_id}/list"));
        match canvas.annotation_source() {
            AnnotationSource::Inline(resources) => {
                self.remote = Some((canvas_id.to_string(), resources));
                self.publish(canvas.index, canvas_id, &list_id, local);
                FetchPlan::Ready
            }
            AnnotationSource::None => {
                self.remote = Some((canvas_id.to_string(), Vec::new()));
                self.publish(canvas.index, canvas_id, &list_id, local);
                FetchPlan::Ready
            }
            AnnotationSource::Remote(url) => {
                if self.remote.as_ref().is_none_or(|(id, _)| id != canvas_id) {
                    self.remote = Some((canvas_id.to_string(), Vec::new()));
                }
                self.publish(canvas.index, canvas_id, &list_id, local);
                FetchPlan::Fetch {
                    ticket: FetchTicket {
                        generation: self.generation,
                        canvas_index: canvas.index,
                        canvas_id: canvas_id.to_string(),
                        list_id,
                    },
                    url,
                }
            }
        }
    }

    /// Apply a finished list fetch. Returns `false` (and changes nothing)
    /// when the ticket is stale or the repository is closed. A failed
    /// fetch degrades to an empty remote set.
    pub fn complete(&mut self, ticket: &FetchTicket, result: Result<Value>, local: &LocalAnnotations) -> bool {
        if !self.alive {
            log::debug!("dropping list response after close");
            return false;
        }
        if ticket.generation != self.generation {
            log::debug!(
                "dropping stale list response (generation {} < {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        let resources = match result {
            Ok(doc) => list_resources(&doc),
            Err(e) => {
                log::warn!("annotation list fetch failed for {}: {e}", ticket.canvas_id);
                Vec::new()
            }
        };
        self.remote = Some((ticket.canvas_id.clone(), resources));
        self.publish(ticket.canvas_index, &ticket.canvas_id, &ticket.list_id, local);
        true
    }

    /// Re-merge the current canvas against the cached remote set, after a
    /// local-only change.
    pub fn recompute(&mut self, local: &LocalAnnotations) -> bool {
        if !self.alive {
            return false;
        }
        let Some(current) = &self.collection else {
            return false;
        };
        let (index, canvas_id) = (current.canvas_index, current.canvas_id.clone());
        let list_id = current
            .list
            .get("@id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.publish(index, &canvas_id, &list_id, local);
        true
    }

    fn publish(&mut self, canvas_index: usize, canvas_id: &str, list_id: &str, local: &LocalAnnotations) {
        let remote: &[Value] = match &self.remote {
            Some((id, items)) if id == canvas_id => items,
            _ => &[],
        };
        let merged = merge(remote, local.for_canvas(canvas_id), |key| {
            local.is_tombstoned(canvas_id, key)
        });
        self.collection = Some(AnnotationCollection::build(
            canvas_index,
            canvas_id,
            list_id,
            merged,
        ));
    }

    /// Forget the current canvas (manifest change). In-flight fetches
    /// become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.collection = None;
        self.remote = None;
    }

    /// Abandon everything; later completions are ignored.
    pub fn close(&mut self) {
        self.generation += 1;
        self.alive = false;
    }
}
