//! The viewer: one manifest, one current canvas, one store.
//!
//! Every operation here is synchronous and side-effect free apart from
//! the store. Operations that need the network return a plan (`FetchPlan`,
//! `Submission`, `FollowUp`); the drivers in `session` execute them and
//! feed the results back. A closed viewer ignores every late result.

use crate::bus::{AlertKind, Message};
use crate::draw::{PointerEvent, RegionTool};
use crate::form::{AnnotationForm, RegionField};
use crate::gateway::{CanvasRef, MutationKind, PersistRequest, PersistenceGateway, Route};
use crate::mode::{GateOutcome, ModeKind};
use crate::repository::{AnnotationFilter, FetchPlan, FetchTicket, list_resources};
use crate::scroll::{AutoScroller, TimerCommand, ZoomDirection, ZoomRepeat};
use crate::store::{Snapshot, Store};
use chrono::{NaiveDate, NaiveDateTime};
use iiif_core::annotation::{AnnotationView, annotation_id, dedup_key, retarget, set_id};
use iiif_core::config::ViewerConfig;
use iiif_core::error::{Result, ViewerError};
use iiif_core::export::{annotations_export_name, manifest_export_name, to_pretty_json};
use iiif_core::hit::hit_test;
use iiif_core::id::AnnotationId;
use iiif_core::manifest::{Canvas, Manifest};
use iiif_core::model::{ActiveAnnotation, DraftRect, Motivation, Point, Region, ScreenRect, Size};
use iiif_core::viewport::{CoordEngine, CoordPicker, PickerReading, Viewport};
use serde::Serialize;
use serde_json::Value;

/// A mutation accepted by the viewer, with its remote request when the
/// route is `Remote`.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub kind: MutationKind,
    pub id: AnnotationId,
    pub route: Route,
    pub annotation: Value,
    pub canvas_id: String,
    pub request: Option<PersistRequest>,
}

/// What to do after a remote mutation succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// GET the manifest again, then `reload_manifest`.
    RefetchManifest(String),
    /// No manifest URL to refetch; re-derive the canvas.
    Refresh(FetchPlan),
}

/// Overlay geometry in screen space, for renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFrame {
    pub active: Vec<(ActiveAnnotation, ScreenRect)>,
    pub draft: Option<(DraftRect, ScreenRect)>,
    pub drawing: Option<ScreenRect>,
    pub picker: Option<ScreenRect>,
}

pub struct Viewer {
    config: ViewerConfig,
    manifest: Option<Manifest>,
    manifest_url: Option<String>,
    canvas_index: usize,
    language: Option<String>,
    coords: CoordEngine,
    tool: RegionTool,
    picker: Option<CoordPicker>,
    scroller: AutoScroller,
    zoom_repeat: ZoomRepeat,
    gateway: PersistenceGateway,
    store: Store,
    alive: bool,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            coords: CoordEngine::new(config.max_dimension, config.zoom),
            scroller: AutoScroller::new(config.auto_scroll),
            zoom_repeat: ZoomRepeat::new(config.zoom_repeat_ms),
            gateway: PersistenceGateway::new(
                config.persistence_base.clone(),
                config.local_hosts.clone(),
            ),
            store: Store::new(&config),
            manifest: None,
            manifest_url: None,
            canvas_index: 0,
            language: None,
            tool: RegionTool::new(),
            picker: None,
            alive: true,
            config,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        self.store.snapshot()
    }

    pub fn coords(&self) -> &CoordEngine {
        &self.coords
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn manifest_url(&self) -> Option<&str> {
        self.manifest_url.as_deref()
    }

    pub fn canvas_index(&self) -> usize {
        self.canvas_index
    }

    pub fn canvas(&self) -> Option<Canvas<'_>> {
        self.manifest.as_ref()?.canvas(self.canvas_index)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Messages emitted since the last drain.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.store.bus.drain()
    }

    /// Preferred label language; `None` picks the first declared one.
    pub fn set_language(&mut self, language: Option<String>) {
        self.language = language;
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn alert(&mut self, kind: AlertKind, text: impl Into<String>) {
        self.store.emit(Message::alert(kind, text));
    }

    // ─── Manifest & canvas ───────────────────────────────────────────────

    /// The host submitted a manifest URL.
    pub fn announce_url(&mut self, url: &str) {
        self.store.emit(Message::UrlSubmit {
            url: url.to_string(),
        });
    }

    /// Report a failed manifest fetch.
    pub fn manifest_fetch_failed(&mut self, error: &ViewerError) {
        log::warn!("manifest fetch failed: {error}");
        self.alert(AlertKind::Error, error.notice());
    }

    /// Parse and install a manifest. Invalid documents are rejected with a
    /// notice and leave the current manifest in place.
    pub fn load_manifest_json(&mut self, text: &str, url: Option<String>) -> Result<FetchPlan> {
        match Manifest::from_json(text) {
            Ok(manifest) => Ok(self.load_manifest(manifest, url)),
            Err(e) => {
                self.alert(AlertKind::Error, e.notice());
                Err(e)
            }
        }
    }

    pub fn load_manifest_value(&mut self, value: Value, url: Option<String>) -> Result<FetchPlan> {
        match Manifest::from_value(value) {
            Ok(manifest) => Ok(self.load_manifest(manifest, url)),
            Err(e) => {
                self.alert(AlertKind::Error, e.notice());
                Err(e)
            }
        }
    }

    /// Install a manifest and start on its first canvas.
    pub fn load_manifest(&mut self, manifest: Manifest, url: Option<String>) -> FetchPlan {
        let msgs = self.store.mode.leave();
        self.store.emit_all(msgs);
        self.store.form = None;
        self.store.clear_active();
        self.store.repository.reset();
        self.stop_timers();
        self.coords.unload();
        self.tool.cancel();

        let manifest_id = manifest.id().to_string();
        log::debug!(
            "loaded {} manifest {manifest_id} with {} canvases",
            manifest.source_version().as_str(),
            manifest.canvas_count()
        );
        self.manifest_url = url.or_else(|| (!manifest_id.is_empty()).then(|| manifest_id.clone()));
        self.manifest = Some(manifest);
        self.canvas_index = 0;
        self.store.emit(Message::ManifestLoad { manifest_id });
        self.store.emit(Message::CanvasChange { canvas_index: 0 });
        self.begin_fetch()
    }

    /// Swap in a refetched copy of the current manifest, keeping the
    /// canvas position and session state.
    pub fn reload_manifest(&mut self, value: Value) -> Result<Option<FetchPlan>> {
        if !self.alive {
            return Ok(None);
        }
        let manifest = Manifest::from_value(value)?;
        self.canvas_index = self
            .canvas_index
            .min(manifest.canvas_count().saturating_sub(1));
        self.manifest = Some(manifest);
        Ok(Some(self.begin_fetch()))
    }

    /// Move to another canvas. Highlights and the current mode do not
    /// survive the move.
    pub fn set_canvas(&mut self, index: usize) -> Option<FetchPlan> {
        let count = self.manifest.as_ref()?.canvas_count();
        if index >= count {
            log::debug!("canvas {index} out of range ({count})");
            return None;
        }
        let msgs = self.store.mode.leave();
        self.store.emit_all(msgs);
        self.store.form = None;
        self.store.clear_active();
        self.stop_timers();
        self.coords.unload();
        self.tool.cancel();
        if let Some(picker) = &mut self.picker {
            picker.clear();
        }
        self.canvas_index = index;
        self.store.emit(Message::CanvasChange {
            canvas_index: index,
        });
        Some(self.begin_fetch())
    }

    /// Re-derive the current canvas's annotations.
    pub fn refresh(&mut self) -> Option<FetchPlan> {
        self.canvas()?;
        Some(self.begin_fetch())
    }

    fn begin_fetch(&mut self) -> FetchPlan {
        let Some(canvas) = self.manifest.as_ref().and_then(|m| m.canvas(self.canvas_index)) else {
            self.store.repository.reset();
            self.publish_count();
            return FetchPlan::Ready;
        };
        let plan = self.store.repository.begin(&canvas, &self.store.local);
        self.after_publish();
        plan
    }

    /// Feed a finished list fetch back in. Stale or post-close results are
    /// dropped.
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, result: Result<Value>) -> bool {
        if !self.alive {
            return false;
        }
        if let Err(e) = &result
            && ticket.generation() == self.store.repository.generation()
        {
            self.alert(AlertKind::Warning, e.notice());
        }
        let applied = self.store.repository.complete(ticket, result, &self.store.local);
        if applied {
            self.after_publish();
        }
        applied
    }

    fn after_publish(&mut self) {
        self.store.prune_active();
        let current = self.store.repository.collection();
        let msgs = self
            .store
            .mode
            .reconcile_target(|target| current?.find_key(&target.key).cloned());
        if msgs.iter().any(|m| matches!(m, Message::ModeToggle { .. })) {
            self.store.form = None;
        }
        self.store.emit_all(msgs);
        self.publish_count();
    }

    fn publish_count(&mut self) {
        let count = self.store.repository.count();
        self.store.emit(Message::AnnotationsChanged { count });
    }

    /// The canvas image finished loading.
    pub fn image_loaded(&mut self, natural: Size) {
        self.coords.load_image(natural);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.coords.set_viewport(viewport);
    }

    /// Natural image size, falling back to the canvas dimensions before
    /// the image has loaded.
    pub fn image_size(&self) -> Size {
        self.coords
            .natural_size()
            .or_else(|| self.canvas().map(|c| c.size()))
            .unwrap_or_default()
    }

    // ─── Mode ────────────────────────────────────────────────────────────

    /// `annotation-add`: enter add mode with a blank form.
    pub fn begin_add(&mut self) {
        if self.canvas().is_none() {
            self.alert(AlertKind::Info, "Load a manifest first");
            return;
        }
        self.store.emit(Message::AnnotationAdd);
        let msgs = self.store.mode.enter_add();
        self.store.form = Some(AnnotationForm::blank(self.config.default_region));
        self.store.emit_all(msgs);
    }

    /// `mode-toggle{mode, annotation}`. Edit and delete need an annotation
    /// of the current collection; otherwise the toggle is dropped.
    pub fn toggle_mode(&mut self, kind: ModeKind, id: Option<AnnotationId>) -> bool {
        match kind {
            ModeKind::View => {
                self.cancel();
                true
            }
            ModeKind::Add => {
                self.begin_add();
                self.store.mode.kind() == ModeKind::Add
            }
            ModeKind::Edit | ModeKind::Delete => {
                let Some(view) = id.and_then(|id| self.store.find(id)).cloned() else {
                    log::debug!("{kind:?} toggle for an annotation not on this canvas");
                    return false;
                };
                let id = view.overlay_id();
                self.store.emit(match kind {
                    ModeKind::Edit => Message::AnnotationEdit { id },
                    _ => Message::AnnotationDelete { id },
                });
                self.store.form = Some(AnnotationForm::from_annotation(&view));
                let msgs = self.store.mode.toggle(kind, Some(view));
                self.store.emit_all(msgs);
                true
            }
        }
    }

    /// `cancel-edit`: back to view.
    pub fn cancel(&mut self) {
        self.tool.cancel();
        self.store.form = None;
        let msgs = self.store.mode.leave();
        self.store.emit_all(msgs);
    }

    /// `annotation-duplicate`: add mode prefilled from an existing one.
    pub fn duplicate(&mut self, id: AnnotationId) -> bool {
        let Some(view) = self.store.find(id).cloned() else {
            return false;
        };
        self.store.emit(Message::AnnotationDuplicate { id });
        let msgs = self.store.mode.enter_add_at(view.region);
        self.store.form = Some(AnnotationForm::duplicate_of(&view));
        self.store.emit_all(msgs);
        true
    }

    // ─── Form ────────────────────────────────────────────────────────────

    fn editable_form(&mut self) -> Option<&mut AnnotationForm> {
        if self.store.mode.is_read_only() {
            return None;
        }
        self.store.form.as_mut()
    }

    pub fn set_form_field(&mut self, field: RegionField, value: f64) {
        let Some(form) = self.editable_form() else {
            return;
        };
        let region = form.set_field(field, value);
        if let Some(msg) = self.store.mode.update_draft(region) {
            self.store.emit(msg);
        }
    }

    pub fn set_form_region(&mut self, region: Region) {
        let Some(form) = self.editable_form() else {
            return;
        };
        form.region = region;
        if let Some(msg) = self.store.mode.update_draft(region) {
            self.store.emit(msg);
        }
    }

    pub fn set_form_text(&mut self, text: &str) {
        if let Some(form) = self.editable_form() {
            form.text = text.to_string();
        }
    }

    pub fn set_form_motivation(&mut self, motivation: Motivation) {
        if let Some(form) = self.editable_form() {
            form.motivation = motivation;
        }
    }

    // ─── Submission ──────────────────────────────────────────────────────

    fn canvas_ref(&self) -> Option<CanvasRef> {
        let canvas = self.canvas()?;
        Some(CanvasRef {
            canvas_id: canvas.id().to_string(),
            canvas_index: canvas.index,
            manifest_id: self.manifest.as_ref()?.id().to_string(),
            list_id: canvas.list_url(),
        })
    }

    fn current_route(&self) -> Route {
        let list = self.canvas().and_then(|c| c.list_url());
        self.gateway.route(self.manifest_url.as_deref(), list.as_deref())
    }

    fn mint_id(&self, now_ms: u64) -> AnnotationId {
        let base = self
            .manifest
            .as_ref()
            .map(|m| m.id())
            .filter(|id| !id.is_empty())
            .unwrap_or("urn:iiif-annotator");
        AnnotationId::mint(base, now_ms)
    }

    /// Submit the form in add or edit mode. In delete mode this is the
    /// delete button: the first press arms, the second confirms.
    pub fn submit(&mut self, now_ms: u64) -> Result<Option<Submission>> {
        match self.store.mode.kind() {
            ModeKind::View => Ok(None),
            ModeKind::Delete => Ok(self.press_delete(now_ms)),
            ModeKind::Add | ModeKind::Edit => {
                let kind = match self.store.mode.kind() {
                    ModeKind::Add => MutationKind::Create,
                    _ => MutationKind::Update,
                };
                let (Some(form), Some(target)) = (self.store.form.clone(), self.canvas_ref()) else {
                    return Ok(None);
                };
                let image_url = self
                    .canvas()
                    .and_then(|c| c.image_url())
                    .unwrap_or(target.canvas_id.as_str())
                    .to_string();
                let annotation = match form.build(self.mint_id(now_ms), self.image_size(), &image_url, &target.manifest_id) {
                    Ok(annotation) => annotation,
                    Err(e) => {
                        self.alert(AlertKind::Warning, e.notice());
                        return Err(e);
                    }
                };
                let replaced = form.source().filter(|s| !s.local).map(|s| s.key.clone());
                let submission = self.apply(kind, annotation, replaced, &target);
                self.cancel();
                Ok(Some(submission))
            }
        }
    }

    /// Delete button in delete mode.
    pub fn press_delete(&mut self, now_ms: u64) -> Option<Submission> {
        if self.store.mode.kind() != ModeKind::Delete {
            return None;
        }
        match self.store.mode.gate.press(now_ms) {
            GateOutcome::Confirmed => self.delete_target(),
            _ => None,
        }
    }

    /// The separate confirm control. Inert unless armed.
    pub fn confirm_delete(&mut self, now_ms: u64) -> Option<Submission> {
        if self.store.mode.kind() != ModeKind::Delete {
            return None;
        }
        match self.store.mode.gate.confirm(now_ms) {
            GateOutcome::Confirmed => self.delete_target(),
            _ => None,
        }
    }

    pub fn delete_armed(&self, now_ms: u64) -> bool {
        self.store.mode.kind() == ModeKind::Delete && self.store.mode.gate.is_armed(now_ms)
    }

    fn delete_target(&mut self) -> Option<Submission> {
        let target = self.store.mode.target()?.clone();
        let canvas = self.canvas_ref()?;
        let id = target.overlay_id();
        let mut route = self.current_route();
        let mut request = None;
        if target.local {
            // Never reached the remote store.
            self.store.local.remove(&canvas.canvas_id, &target.key);
            route = Route::LocalOnly;
        } else if route == Route::LocalOnly {
            self.store.local.tombstone(&canvas.canvas_id, &target.key);
        } else {
            request = Some(self.gateway.request(MutationKind::Delete, &target.full, &canvas));
        }
        self.store.emit(Message::DeleteAnnotationSubmit { id });
        self.store.deactivate(id);
        self.cancel();
        self.local_changed(route);
        Some(Submission {
            kind: MutationKind::Delete,
            id,
            route,
            annotation: target.full,
            canvas_id: canvas.canvas_id,
            request,
        })
    }

    /// Record a create or update. Local-only routes keep it for the
    /// session; remote routes keep an optimistic copy until confirmed.
    fn apply(&mut self, kind: MutationKind, annotation: Value, replaced: Option<String>, target: &CanvasRef) -> Submission {
        let route = self.current_route();
        let id = AnnotationId::intern(&dedup_key(&annotation));
        if route == Route::LocalOnly
            && let Some(key) = &replaced
        {
            self.store.local.tombstone(&target.canvas_id, key);
        }
        self.store.local.upsert(&target.canvas_id, annotation.clone());
        let request = (route == Route::Remote).then(|| self.gateway.request(kind, &annotation, target));
        self.store.emit(match kind {
            MutationKind::Create => Message::AddAnnotationSubmit { id },
            _ => Message::EditAnnotationSubmit { id },
        });
        self.local_changed(route);
        Submission {
            kind,
            id,
            route,
            annotation,
            canvas_id: target.canvas_id.clone(),
            request,
        }
    }

    fn local_changed(&mut self, route: Route) {
        if route == Route::LocalOnly {
            self.store.emit(Message::RefreshAnnotations);
        }
        if self.store.repository.recompute(&self.store.local) {
            self.after_publish();
        }
    }

    /// Outcome of a remote submission. Success drops the optimistic copy
    /// and asks for a refetch; failure keeps it and raises a notice.
    pub fn finish_submission(&mut self, submission: &Submission, ok: bool) -> Option<FollowUp> {
        if !self.alive || submission.route != Route::Remote {
            return None;
        }
        if !ok {
            let notice = match submission.kind {
                MutationKind::Delete => "The annotation could not be deleted on the server",
                _ => "The annotation could not be saved; it is kept for this session only",
            };
            self.alert(AlertKind::Error, notice);
            return None;
        }
        self.store
            .local
            .remove(&submission.canvas_id, submission.id.as_str());
        self.alert(AlertKind::Success, "Annotation saved");
        self.store.emit(Message::RefreshAnnotations);
        match &self.manifest_url {
            Some(url) => Some(FollowUp::RefetchManifest(url.clone())),
            None => self.refresh().map(FollowUp::Refresh),
        }
    }

    /// `annotation-import`: add every annotation of a list, a bare array,
    /// or a single annotation object to the current canvas through the
    /// create path.
    pub fn import_annotations(&mut self, text: &str, now_ms: u64) -> Result<Vec<Submission>> {
        let parsed: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                let e = ViewerError::from(e);
                self.alert(AlertKind::Error, e.notice());
                return Err(e);
            }
        };
        let Some(target) = self.canvas_ref() else {
            return Err(ViewerError::Validation("no canvas to import into".into()));
        };
        let image_url = self
            .canvas()
            .and_then(|c| c.image_url())
            .unwrap_or(target.canvas_id.as_str())
            .to_string();
        let mut taken: Vec<String> = self
            .store
            .collection()
            .map(|c| c.annotations.iter().map(|a| a.key.clone()).collect())
            .unwrap_or_default();
        let is_list = parsed.get("resources").is_some() || parsed.get("items").is_some();
        let entries = if parsed.is_object() && !is_list {
            vec![parsed]
        } else {
            list_resources(&parsed)
        };
        let mut submissions = Vec::new();
        for (n, mut raw) in entries.into_iter().enumerate() {
            if !raw.is_object() {
                log::warn!("skipping non-object import entry {n}");
                continue;
            }
            retarget(&mut raw, &image_url, &target.manifest_id);
            let needs_id = annotation_id(&raw).is_none_or(|id| taken.iter().any(|k| k == id));
            if needs_id {
                set_id(&mut raw, self.mint_id(now_ms));
            }
            taken.push(dedup_key(&raw));
            submissions.push(self.apply(MutationKind::Create, raw, None, &target));
        }
        self.store.emit(Message::AnnotationImport {
            count: submissions.len(),
        });
        if submissions.is_empty() {
            self.alert(AlertKind::Warning, "No annotations found to import");
        } else {
            self.alert(
                AlertKind::Success,
                format!("Imported {} annotations", submissions.len()),
            );
        }
        Ok(submissions)
    }

    // ─── Highlights ──────────────────────────────────────────────────────

    /// `show-annotation`.
    pub fn show_annotation(&mut self, id: AnnotationId) -> bool {
        if !self.store.activate(id, &self.config) {
            return false;
        }
        self.store.emit(Message::ShowAnnotation { id });
        if let Some(active) = self.store.active.last().cloned() {
            let url = self
                .canvas()
                .and_then(|c| c.image_url())
                .unwrap_or_default()
                .to_string();
            self.store.emit(Message::ShowFrame {
                url,
                region: active.region,
                color: active.color,
            });
        }
        true
    }

    /// `hide-annotation`.
    pub fn hide_annotation(&mut self, id: AnnotationId) -> bool {
        if !self.store.deactivate(id) {
            return false;
        }
        self.store.emit(Message::HideAnnotation { id });
        if self.store.active.is_empty() {
            self.store.emit(Message::HideFrame);
        }
        true
    }

    pub fn toggle_annotation(&mut self, id: AnnotationId) -> bool {
        if self.store.is_active(id) {
            self.hide_annotation(id)
        } else {
            self.show_annotation(id)
        }
    }

    /// `hide-all-annotations`: drop every highlight and leave any add,
    /// edit, or delete in progress.
    pub fn hide_all(&mut self) {
        self.store.emit(Message::HideAllAnnotations);
        if self.store.mode.kind() == ModeKind::View {
            self.store.clear_active();
            self.store.emit(Message::HideFrame);
        } else {
            self.cancel();
        }
    }

    pub fn set_filter(&mut self, filter: AnnotationFilter) {
        self.store.filter = filter;
    }

    /// Topmost annotation under an image point.
    pub fn annotation_at(&self, point: Point) -> Option<AnnotationId> {
        let collection = self.store.collection()?;
        let index = hit_test(&collection.annotations, self.image_size(), point)?;
        collection.annotations.get(index).map(AnnotationView::overlay_id)
    }

    // ─── Pointer, zoom, scroll ───────────────────────────────────────────

    /// Route a pointer event: drawing in add/edit mode, measuring with the
    /// picker, or hit-testing in view mode. Returns the auto-scroll timer
    /// command.
    pub fn pointer(&mut self, event: PointerEvent) -> TimerCommand {
        let drawing_mode = matches!(self.store.mode.kind(), ModeKind::Add | ModeKind::Edit);
        if drawing_mode {
            if let Some(region) = self.tool.handle(event, &self.coords) {
                self.set_form_region(region);
            }
        } else if let Some(picker) = &mut self.picker {
            match event {
                PointerEvent::Down { x, y } => {
                    if let Some(at) = self.coords.screen_to_image(x, y) {
                        picker.click(at);
                    }
                }
                PointerEvent::Move { x, y } => {
                    if let Some(at) = self.coords.screen_to_image(x, y) {
                        picker.move_to(at);
                    }
                }
                _ => {}
            }
        } else if let PointerEvent::Up { x, y } = event
            && let Some(at) = self.coords.screen_to_image(x, y)
            && let Some(id) = self.annotation_at(at)
        {
            self.toggle_annotation(id);
        }

        match event {
            PointerEvent::Move { x, y } if self.tool.is_drawing() || self.picker.is_some() => {
                self.scroller.pointer_moved(&self.coords, x, y)
            }
            PointerEvent::Up { .. } | PointerEvent::Leave => self.scroller.stop(),
            _ => TimerCommand::Keep,
        }
    }

    pub fn scroll_tick(&mut self) -> TimerCommand {
        self.scroller.tick(&mut self.coords)
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) -> bool {
        self.coords.scroll_by(dx, dy)
    }

    pub fn apply_zoom(&mut self, zoom: f64) -> f64 {
        self.coords.apply_zoom(zoom)
    }

    pub fn press_zoom(&mut self, direction: ZoomDirection) -> TimerCommand {
        self.zoom_repeat.press(direction, &mut self.coords)
    }

    pub fn zoom_tick(&mut self) -> TimerCommand {
        self.zoom_repeat.tick(&mut self.coords)
    }

    pub fn release_zoom(&mut self) -> TimerCommand {
        self.zoom_repeat.release()
    }

    /// Diagnostic coordinate picker on or off.
    pub fn set_picker(&mut self, enabled: bool) {
        self.picker = enabled.then(CoordPicker::default);
    }

    pub fn picker_reading(&self) -> Option<PickerReading> {
        self.picker.as_ref()?.reading()
    }

    fn stop_timers(&mut self) {
        self.scroller.stop();
        self.zoom_repeat.release();
    }

    /// Everything the overlay renderer draws, in screen space.
    pub fn overlay(&self) -> OverlayFrame {
        if !self.coords.is_loaded() {
            return OverlayFrame::default();
        }
        OverlayFrame {
            active: self
                .store
                .active
                .iter()
                .map(|a| (a.clone(), self.coords.image_to_screen(&a.region)))
                .collect(),
            draft: self
                .store
                .mode
                .draft()
                .map(|d| (d, self.coords.image_to_screen(&d.region))),
            drawing: self.tool.current().map(|r| self.coords.image_to_screen(&r)),
            picker: self
                .picker_reading()
                .map(|reading| self.coords.image_to_screen(&reading.rect)),
        }
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// File name and pretty JSON of the loaded manifest.
    pub fn export_manifest(&self, date: NaiveDate) -> Result<(String, String)> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| ViewerError::Validation("no manifest loaded".into()))?;
        let name = manifest_export_name(&manifest.label(self.language()), date);
        Ok((name, to_pretty_json(manifest.as_value())?))
    }

    /// File name and pretty JSON of the current canvas's merged list.
    pub fn export_annotations(&self, at: NaiveDateTime) -> Result<(String, String)> {
        let (Some(manifest), Some(canvas), Some(collection)) =
            (self.manifest.as_ref(), self.canvas(), self.store.collection())
        else {
            return Err(ViewerError::Validation("no annotations to export".into()));
        };
        let name = annotations_export_name(manifest.id(), &canvas.label(self.language()), at);
        Ok((name, to_pretty_json(&collection.list)?))
    }

    // ─── Teardown ────────────────────────────────────────────────────────

    /// Stop timers and ignore every result that arrives from now on.
    pub fn close(&mut self) {
        self.stop_timers();
        self.tool.cancel();
        self.store.repository.close();
        self.alive = false;
        log::debug!("viewer closed");
    }
}
