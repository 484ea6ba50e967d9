//! The single state container shared by every view.
//!
//! Mode, draft, form, active highlights, session-local annotations, and the
//! merged collection all live here. Views read a `Snapshot` (or borrow the
//! store) instead of reaching into each other; changes go out on the bus.

use crate::bus::{Dispatcher, Message};
use crate::form::AnnotationForm;
use crate::local::LocalAnnotations;
use crate::mode::{ModeKind, ModeMachine, ModePalette};
use crate::repository::{AnnotationCollection, AnnotationFilter, AnnotationRepository};
use iiif_core::annotation::AnnotationView;
use iiif_core::config::ViewerConfig;
use iiif_core::id::AnnotationId;
use iiif_core::model::{ActiveAnnotation, DraftRect};
use serde::Serialize;

#[derive(Debug)]
pub struct Store {
    pub mode: ModeMachine,
    pub form: Option<AnnotationForm>,
    pub active: Vec<ActiveAnnotation>,
    pub local: LocalAnnotations,
    pub repository: AnnotationRepository,
    pub filter: AnnotationFilter,
    pub bus: Dispatcher,
    /// Number of highlights handed out, for palette cycling.
    highlights: usize,
}

impl Store {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            mode: ModeMachine::new(ModePalette::from(config), config.delete_arm_ms),
            form: None,
            active: Vec::new(),
            local: LocalAnnotations::new(),
            repository: AnnotationRepository::new(),
            filter: AnnotationFilter::default(),
            bus: Dispatcher::new(),
            highlights: 0,
        }
    }

    pub fn collection(&self) -> Option<&AnnotationCollection> {
        self.repository.collection()
    }

    pub fn find(&self, id: AnnotationId) -> Option<&AnnotationView> {
        self.collection()?.get(id)
    }

    /// Broadcast a message. `DeactivateAnnotation` also drops every
    /// highlight, whichever path left the mode.
    pub fn emit(&mut self, message: Message) {
        if matches!(message, Message::DeactivateAnnotation) {
            self.clear_active();
        }
        self.bus.emit(message);
    }

    pub fn emit_all(&mut self, messages: Vec<Message>) {
        for message in messages {
            self.emit(message);
        }
    }

    // ─── Active highlights ───────────────────────────────────────────────

    pub fn is_active(&self, id: AnnotationId) -> bool {
        self.active.iter().any(|a| a.id == id)
    }

    /// Highlight an annotation. Returns `false` when it is unknown or
    /// already shown.
    pub fn activate(&mut self, id: AnnotationId, config: &ViewerConfig) -> bool {
        if self.is_active(id) {
            return false;
        }
        let Some(region) = self.find(id).map(|a| a.region) else {
            log::debug!("cannot highlight unknown annotation {id:?}");
            return false;
        };
        let color = config.highlight(self.highlights);
        self.highlights += 1;
        self.active.push(ActiveAnnotation { id, region, color });
        true
    }

    pub fn deactivate(&mut self, id: AnnotationId) -> bool {
        let before = self.active.len();
        self.active.retain(|a| a.id != id);
        self.active.len() != before
    }

    pub fn clear_active(&mut self) {
        self.active.clear();
        self.highlights = 0;
    }

    /// Drop highlights whose annotation left the collection and follow
    /// region changes of the rest.
    pub fn prune_active(&mut self) {
        let Some(collection) = self.repository.collection() else {
            self.active.clear();
            return;
        };
        let next: Vec<ActiveAnnotation> = self
            .active
            .iter()
            .filter_map(|a| {
                collection.get(a.id).map(|view| ActiveAnnotation {
                    region: view.region,
                    ..a.clone()
                })
            })
            .collect();
        self.active = next;
    }

    // ─── Snapshot ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<'_> {
        let collection = self.collection();
        Snapshot {
            mode: self.mode.kind(),
            target: self.mode.target().map(AnnotationView::overlay_id),
            read_only: self.mode.is_read_only(),
            draft: self.mode.draft(),
            form: self.form.as_ref(),
            active: &self.active,
            count: collection.map_or(0, AnnotationCollection::count),
            local_count: collection.map_or(0, |c| c.annotations.iter().filter(|a| a.local).count()),
            annotations: collection
                .map(|c| c.filtered(&self.filter).map(ListEntry::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Read-only view of the store for renderers and the host page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<'a> {
    pub mode: ModeKind,
    pub target: Option<AnnotationId>,
    pub read_only: bool,
    pub draft: Option<DraftRect>,
    pub form: Option<&'a AnnotationForm>,
    pub active: &'a [ActiveAnnotation],
    /// Size of the unfiltered collection.
    pub count: usize,
    pub local_count: usize,
    /// Filtered annotations, in display order.
    pub annotations: Vec<ListEntry<'a>>,
}

/// One list row. `handle` is what the host passes back to address the
/// annotation, and it exists even when the annotation has no id.
#[derive(Debug, Serialize)]
pub struct ListEntry<'a> {
    pub handle: AnnotationId,
    #[serde(flatten)]
    pub view: &'a AnnotationView,
}

impl<'a> From<&'a AnnotationView> for ListEntry<'a> {
    fn from(view: &'a AnnotationView) -> Self {
        Self {
            handle: view.overlay_id(),
            view,
        }
    }
}
