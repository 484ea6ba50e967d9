//! WASM bridge for the IIIF annotator.
//!
//! Exposes `IiifViewer` to JavaScript via `wasm-bindgen`. The host page
//! owns the DOM: it forwards pointer events and timer ticks, renders the
//! list from `get_snapshot()`, and relays `drain_messages()` as DOM events.
//! Network-bound calls return a `Promise` resolving to a JSON string.

mod overlay;
mod transport;

use chrono::{NaiveDate, NaiveDateTime};
use iiif_core::{AnnotationId, PickerReading, Size, ViewerConfig, Viewport};
use iiif_core::model::Motivation;
use iiif_editor::draw::PointerEvent;
use iiif_editor::scroll::{TimerCommand, ZoomDirection};
use iiif_editor::{AnnotationFilter, ModeKind, RegionField, Viewer, session};
use js_sys::Promise;
use overlay::{OverlayTheme, render_overlay};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use transport::GlooTransport;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The main WASM-exposed viewer handle.
#[wasm_bindgen]
pub struct IiifViewer {
    viewer: Rc<RefCell<Viewer>>,
    transport: GlooTransport,
    theme: OverlayTheme,
    width: f64,
    height: f64,
}

#[wasm_bindgen]
impl IiifViewer {
    /// Create a viewer. `config_json` may be empty or a partial
    /// `ViewerConfig` object; unknown or malformed input keeps the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        console_error_panic_hook_setup();
        console_logger_setup();
        let config = if config_json.trim().is_empty() {
            ViewerConfig::default()
        } else {
            serde_json::from_str(config_json).unwrap_or_else(|e| {
                log::warn!("ignoring viewer config: {e}");
                ViewerConfig::default()
            })
        };
        Self {
            viewer: Rc::new(RefCell::new(Viewer::new(config))),
            transport: GlooTransport,
            theme: OverlayTheme::light(),
            width: 0.0,
            height: 0.0,
        }
    }

    // ─── Manifest & canvas ───────────────────────────────────────────────

    /// Fetch and load a manifest. Resolves to `{"ok":bool,"error"?}`.
    pub fn open_manifest(&self, url: String) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let result = session::open_manifest(&viewer, &transport, &url).await;
            Ok(JsValue::from_str(&result_json(result.map(|()| json!({})))))
        })
    }

    /// Load manifest JSON already in hand (file upload, paste).
    pub fn load_manifest_text(&self, text: String) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let plan = viewer.borrow_mut().load_manifest_json(&text, None);
            let result = match plan {
                Ok(plan) => {
                    session::run_plan(&viewer, &transport, plan).await;
                    Ok(json!({}))
                }
                Err(e) => Err(e),
            };
            Ok(JsValue::from_str(&result_json(result)))
        })
    }

    /// Resolves to `{"ok":true,"applied":bool}`; `applied` is false for an
    /// out-of-range index or a response overtaken by a later change.
    pub fn set_canvas(&self, index: usize) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let applied = session::change_canvas(&viewer, &transport, index).await;
            Ok(JsValue::from_str(&json!({ "ok": true, "applied": applied }).to_string()))
        })
    }

    pub fn refresh(&self) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let applied = session::refresh(&viewer, &transport).await;
            Ok(JsValue::from_str(&json!({ "ok": true, "applied": applied }).to_string()))
        })
    }

    /// Empty string selects the first declared language.
    pub fn set_language(&mut self, language: &str) {
        let language = (!language.is_empty()).then(|| language.to_string());
        self.viewer.borrow_mut().set_language(language);
    }

    pub fn get_canvas_index(&self) -> usize {
        self.viewer.borrow().canvas_index()
    }

    /// `{"count":n,"labels":[...]}` for the canvas picker.
    pub fn get_canvas_labels(&self) -> String {
        let viewer = self.viewer.borrow();
        let Some(manifest) = viewer.manifest() else {
            return json!({ "count": 0, "labels": [] }).to_string();
        };
        let labels: Vec<String> = (0..manifest.canvas_count())
            .filter_map(|i| manifest.canvas(i))
            .map(|c| c.label(viewer.language()))
            .collect();
        json!({ "count": labels.len(), "labels": labels }).to_string()
    }

    /// Label languages declared anywhere in the manifest, as a JSON array.
    pub fn get_languages(&self) -> String {
        let languages = self
            .viewer
            .borrow()
            .manifest()
            .map(|m| m.languages())
            .unwrap_or_default();
        json!(languages).to_string()
    }

    /// Image URL for the current canvas, or empty.
    pub fn get_image_url(&self) -> String {
        let viewer = self.viewer.borrow();
        viewer
            .canvas()
            .and_then(|c| c.image_url().map(str::to_string))
            .unwrap_or_default()
    }

    // ─── Image geometry ──────────────────────────────────────────────────

    /// The `<img>` fired `load`; pass its natural size.
    pub fn image_loaded(&mut self, width: f64, height: f64) {
        self.viewer.borrow_mut().image_loaded(Size::new(width, height));
    }

    /// Bounding rect of the image container, in client coordinates.
    pub fn set_viewport(&mut self, left: f64, top: f64, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.viewer.borrow_mut().set_viewport(Viewport {
            left,
            top,
            width,
            height,
        });
    }

    /// Zoom, scroll, and display size as JSON, for the zoom controls and
    /// the image element's CSS.
    pub fn get_view_state(&self) -> String {
        let viewer = self.viewer.borrow();
        let coords = viewer.coords();
        let display = coords.display_size();
        let scroll = coords.scroll();
        json!({
            "zoom": coords.zoom(),
            "canZoomIn": coords.can_zoom_in(),
            "canZoomOut": coords.can_zoom_out(),
            "displayWidth": display.width,
            "displayHeight": display.height,
            "scrollX": scroll.x,
            "scrollY": scroll.y,
        })
        .to_string()
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Paint the overlay canvas.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let frame = self.viewer.borrow().overlay();
        render_overlay(ctx, &frame, self.width, self.height, &self.theme);
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.theme = if is_dark {
            OverlayTheme::dark()
        } else {
            OverlayTheme::light()
        };
    }

    // ─── Messages & state ────────────────────────────────────────────────

    /// Messages since the last call, as a JSON array. Each carries `type`
    /// and `event` (the DOM event name to dispatch).
    pub fn drain_messages(&self) -> String {
        let messages = self.viewer.borrow_mut().drain_messages();
        let out: Vec<Value> = messages
            .iter()
            .map(|m| {
                let mut v = serde_json::to_value(m).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut v {
                    map.insert("event".into(), Value::String(m.event_name().to_string()));
                }
                v
            })
            .collect();
        Value::Array(out).to_string()
    }

    /// Mode, form, highlights, and the filtered annotation list as JSON.
    pub fn get_snapshot(&self) -> String {
        let viewer = self.viewer.borrow();
        serde_json::to_string(&viewer.snapshot()).unwrap_or_else(|e| error_json(&e.to_string()))
    }

    // ─── Mode & form ─────────────────────────────────────────────────────

    pub fn begin_add(&mut self) {
        self.viewer.borrow_mut().begin_add();
    }

    /// `mode` is `"add"`, `"edit"`, `"delete"`, or `""` for view. Edit and
    /// delete require `annotation_id`.
    pub fn toggle_mode(&mut self, mode: &str, annotation_id: &str) -> bool {
        let Some(kind) = ModeKind::parse(mode) else {
            log::warn!("unknown mode `{mode}`");
            return false;
        };
        let id = (!annotation_id.is_empty()).then(|| AnnotationId::intern(annotation_id));
        self.viewer.borrow_mut().toggle_mode(kind, id)
    }

    pub fn cancel(&mut self) {
        self.viewer.borrow_mut().cancel();
    }

    pub fn duplicate(&mut self, annotation_id: &str) -> bool {
        self.viewer
            .borrow_mut()
            .duplicate(AnnotationId::intern(annotation_id))
    }

    /// `field` is one of `x`, `y`, `w`, `h`.
    pub fn set_form_field(&mut self, field: &str, value: f64) -> bool {
        let Some(field) = RegionField::parse(field) else {
            return false;
        };
        self.viewer.borrow_mut().set_form_field(field, value);
        true
    }

    pub fn set_form_text(&mut self, text: &str) {
        self.viewer.borrow_mut().set_form_text(text);
    }

    pub fn set_form_motivation(&mut self, motivation: &str) {
        self.viewer
            .borrow_mut()
            .set_form_motivation(Motivation::parse(motivation));
    }

    /// Submit the form. In delete mode the first call arms the button.
    /// Resolves to `{"ok":true,"recorded":bool}` or an error.
    pub fn submit(&self) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let result = session::submit(&viewer, &transport, now_ms()).await;
            Ok(JsValue::from_str(&result_json(
                result.map(|recorded| json!({ "recorded": recorded })),
            )))
        })
    }

    pub fn confirm_delete(&self) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let recorded = session::confirm_delete(&viewer, &transport, now_ms()).await;
            Ok(JsValue::from_str(&json!({ "ok": true, "recorded": recorded }).to_string()))
        })
    }

    /// Whether the delete control is armed right now.
    pub fn is_delete_armed(&self) -> bool {
        self.viewer.borrow().delete_armed(now_ms())
    }

    /// Import annotation JSON (a single annotation, an array, or a list).
    /// Resolves to `{"ok":true,"recorded":n}` or an error.
    pub fn import_annotations(&self, text: String) -> Promise {
        let viewer = Rc::clone(&self.viewer);
        let transport = self.transport;
        wasm_bindgen_futures::future_to_promise(async move {
            let result = session::import(&viewer, &transport, &text, now_ms()).await;
            Ok(JsValue::from_str(&result_json(
                result.map(|recorded| json!({ "recorded": recorded })),
            )))
        })
    }

    // ─── Highlights & filter ─────────────────────────────────────────────

    pub fn show_annotation(&mut self, annotation_id: &str) -> bool {
        self.viewer
            .borrow_mut()
            .show_annotation(AnnotationId::intern(annotation_id))
    }

    pub fn hide_annotation(&mut self, annotation_id: &str) -> bool {
        self.viewer
            .borrow_mut()
            .hide_annotation(AnnotationId::intern(annotation_id))
    }

    pub fn toggle_annotation(&mut self, annotation_id: &str) -> bool {
        self.viewer
            .borrow_mut()
            .toggle_annotation(AnnotationId::intern(annotation_id))
    }

    pub fn hide_all(&mut self) {
        self.viewer.borrow_mut().hide_all();
    }

    /// Empty `motivation` matches any.
    pub fn set_filter(&mut self, motivation: &str, query: &str) {
        let filter = AnnotationFilter {
            motivation: (!motivation.is_empty()).then(|| Motivation::parse(motivation)),
            query: query.to_string(),
        };
        self.viewer.borrow_mut().set_filter(filter);
    }

    // ─── Pointer, zoom, scroll ───────────────────────────────────────────
    //
    // Timer-driving calls return `{"timer":"start","intervalMs":n}`,
    // `{"timer":"stop"}`, or `{"timer":"keep"}`.

    pub fn handle_pointer_down(&mut self, x: f64, y: f64) -> String {
        self.pointer(PointerEvent::Down { x, y })
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> String {
        self.pointer(PointerEvent::Move { x, y })
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64) -> String {
        self.pointer(PointerEvent::Up { x, y })
    }

    pub fn handle_pointer_leave(&mut self) -> String {
        self.pointer(PointerEvent::Leave)
    }

    pub fn scroll_tick(&mut self) -> String {
        timer_json(self.viewer.borrow_mut().scroll_tick())
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) -> bool {
        self.viewer.borrow_mut().scroll_by(dx, dy)
    }

    /// Returns the zoom actually applied after clamping.
    pub fn apply_zoom(&mut self, zoom: f64) -> f64 {
        self.viewer.borrow_mut().apply_zoom(zoom)
    }

    /// `direction` is `"in"` or `"out"`.
    pub fn press_zoom(&mut self, direction: &str) -> String {
        let direction = match direction {
            "in" => ZoomDirection::In,
            "out" => ZoomDirection::Out,
            other => {
                log::warn!("unknown zoom direction `{other}`");
                return timer_json(TimerCommand::Keep);
            }
        };
        timer_json(self.viewer.borrow_mut().press_zoom(direction))
    }

    pub fn zoom_tick(&mut self) -> String {
        timer_json(self.viewer.borrow_mut().zoom_tick())
    }

    pub fn release_zoom(&mut self) -> String {
        timer_json(self.viewer.borrow_mut().release_zoom())
    }

    pub fn set_picker(&mut self, enabled: bool) {
        self.viewer.borrow_mut().set_picker(enabled);
    }

    /// `{"x","y","width","height","dx","dy"}` in image pixels, or `null`.
    pub fn get_picker_reading(&self) -> String {
        picker_json(self.viewer.borrow().picker_reading())
    }

    // ─── Export & teardown ───────────────────────────────────────────────

    /// `{"ok":true,"name":..,"json":..}` for a download link.
    pub fn export_manifest(&self) -> String {
        let Some(now) = local_now() else {
            return error_json("clock unavailable");
        };
        let result = self.viewer.borrow().export_manifest(now.date());
        result_json(result.map(|(name, text)| json!({ "name": name, "json": text })))
    }

    pub fn export_annotations(&self) -> String {
        let Some(now) = local_now() else {
            return error_json("clock unavailable");
        };
        let result = self.viewer.borrow().export_annotations(now);
        result_json(result.map(|(name, text)| json!({ "name": name, "json": text })))
    }

    /// Stop timers and ignore any request still in flight.
    pub fn close(&mut self) {
        self.viewer.borrow_mut().close();
    }
}

impl IiifViewer {
    fn pointer(&mut self, event: PointerEvent) -> String {
        timer_json(self.viewer.borrow_mut().pointer(event))
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

/// `{"ok":true, ...fields}` or `{"ok":false,"error":notice}`.
fn result_json(result: iiif_core::Result<Value>) -> String {
    match result {
        Ok(Value::Object(mut fields)) => {
            fields.insert("ok".into(), Value::Bool(true));
            Value::Object(fields).to_string()
        }
        Ok(_) => json!({ "ok": true }).to_string(),
        Err(e) => error_json(&e.notice()),
    }
}

fn error_json(message: &str) -> String {
    json!({ "ok": false, "error": message }).to_string()
}

fn picker_json(reading: Option<PickerReading>) -> String {
    match reading {
        Some(r) => json!({
            "x": r.rect.x,
            "y": r.rect.y,
            "width": r.rect.w,
            "height": r.rect.h,
            "dx": r.dx,
            "dy": r.dy,
        })
        .to_string(),
        None => "null".to_string(),
    }
}

fn timer_json(command: TimerCommand) -> String {
    match command {
        TimerCommand::Start { interval_ms } => {
            json!({ "timer": "start", "intervalMs": interval_ms }).to_string()
        }
        TimerCommand::Stop => r#"{"timer":"stop"}"#.to_string(),
        TimerCommand::Keep => r#"{"timer":"keep"}"#.to_string(),
    }
}

// ─── Clock ───────────────────────────────────────────────────────────────

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Wall-clock time in the browser's zone, for export file names.
fn local_now() -> Option<NaiveDateTime> {
    let d = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(d.get_full_year() as i32, d.get_month() + 1, d.get_date())?.and_hms_opt(
        d.get_hours(),
        d.get_minutes(),
        d.get_seconds(),
    )
}

// ─── Logging & panics ────────────────────────────────────────────────────

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn console_logger_setup() {
    // Fails only when a logger is already installed.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("IIIF viewer panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
