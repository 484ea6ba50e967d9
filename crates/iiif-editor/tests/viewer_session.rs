//! Integration tests: viewer + async drivers against an in-memory server.
//!
//! `FakeServer` serves fixture manifests and keeps one persisted annotation
//! list that `/create`, `/edit` and `/delete` mutate, so a write followed
//! by a refetch round-trips the way it does against the real backend.

use iiif_core::{AnnotationId, Region, Size, ViewerConfig, ViewerError, Viewport};
use iiif_editor::session::{self, run_plan};
use iiif_editor::{
    AlertKind, FetchPlan, HttpResponse, Message, ModeKind, RegionField, Transport, Viewer,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

const FOREIGN_URL: &str = "https://iiif.example.org/psalter/manifest.json";
const LEDGER_URL: &str = "http://localhost:8080/iiif/ledger/manifest";
const LEDGER_LIST: &str = "http://localhost:8080/iiif/ledger/list/1";
const LEDGER_R1: &str = "http://localhost:8080/iiif/ledger/annotation/r1";

// ─── Fake server ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeServer {
    documents: HashMap<String, String>,
    list_url: Option<String>,
    persisted: RefCell<Vec<Value>>,
    gets: RefCell<Vec<String>>,
    posts: RefCell<Vec<(String, Value)>>,
    reject_with: Cell<Option<u16>>,
    offline: Cell<bool>,
}

impl FakeServer {
    fn foreign() -> Self {
        let mut documents = HashMap::new();
        documents.insert(
            FOREIGN_URL.to_string(),
            include_str!("fixtures/foreign_inline.json").to_string(),
        );
        documents.insert(
            "https://iiif.example.org/psalter/list/2".to_string(),
            json!({"resources": [{"@id": "late", "on": "x#xywh=1,1,1,1"}]}).to_string(),
        );
        Self {
            documents,
            ..Default::default()
        }
    }

    fn ledger() -> Self {
        let mut documents = HashMap::new();
        documents.insert(
            LEDGER_URL.to_string(),
            include_str!("fixtures/local_remote_list.json").to_string(),
        );
        let list: Value = serde_json::from_str(include_str!("fixtures/ledger_list.json")).unwrap();
        Self {
            documents,
            list_url: Some(LEDGER_LIST.to_string()),
            persisted: RefCell::new(list["resources"].as_array().unwrap().clone()),
            ..Default::default()
        }
    }

    fn gets_of(&self, url: &str) -> usize {
        self.gets.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Transport for FakeServer {
    async fn get(&self, url: &str) -> iiif_core::Result<HttpResponse> {
        self.gets.borrow_mut().push(url.to_string());
        if self.offline.get() {
            return Err(ViewerError::Network("connection refused".into()));
        }
        if self.list_url.as_deref() == Some(url) {
            let body = json!({"@type": "sc:AnnotationList", "resources": *self.persisted.borrow()});
            return Ok(HttpResponse::ok(body.to_string()));
        }
        Ok(match self.documents.get(url) {
            Some(body) => HttpResponse::ok(body.clone()),
            None => HttpResponse {
                status: 404,
                body: "not found".into(),
            },
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> iiif_core::Result<HttpResponse> {
        self.posts.borrow_mut().push((url.to_string(), body.clone()));
        if self.offline.get() {
            return Err(ViewerError::Network("connection refused".into()));
        }
        if let Some(status) = self.reject_with.get() {
            return Ok(HttpResponse {
                status,
                body: "<error>rejected</error>".into(),
            });
        }
        let annotation = body["annotation"].clone();
        let id = annotation["@id"].clone();
        let mut persisted = self.persisted.borrow_mut();
        match url.rsplit('/').next() {
            Some("create") => persisted.push(annotation),
            Some("edit") => {
                for existing in persisted.iter_mut() {
                    if existing["@id"] == id {
                        *existing = annotation.clone();
                    }
                }
            }
            Some("delete") => persisted.retain(|a| a["@id"] != id),
            _ => {}
        }
        Ok(HttpResponse::ok("<status>ok</status>"))
    }
}

fn viewer() -> RefCell<Viewer> {
    RefCell::new(Viewer::new(ViewerConfig::default()))
}

fn count(viewer: &RefCell<Viewer>) -> usize {
    viewer.borrow().store().repository.count()
}

fn local_count(viewer: &RefCell<Viewer>) -> usize {
    viewer.borrow().snapshot().local_count
}

fn alerts(viewer: &RefCell<Viewer>) -> Vec<(AlertKind, String)> {
    viewer
        .borrow_mut()
        .drain_messages()
        .into_iter()
        .filter_map(|m| match m {
            Message::ShowAlert { kind, text } => Some((kind, text)),
            _ => None,
        })
        .collect()
}

fn fill_add(viewer: &RefCell<Viewer>, region: Region, text: &str) {
    let mut v = viewer.borrow_mut();
    v.begin_add();
    v.set_form_field(RegionField::X, region.x);
    v.set_form_field(RegionField::Y, region.y);
    v.set_form_field(RegionField::W, region.w);
    v.set_form_field(RegionField::H, region.h);
    v.set_form_text(text);
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn inline_annotation_list_is_shown() {
    let server = FakeServer::foreign();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, FOREIGN_URL).await.unwrap();

    let v = viewer.borrow();
    let collection = v.store().collection().unwrap();
    assert_eq!(collection.count(), 1);
    assert_eq!(collection.annotations[0].id, Some(AnnotationId::intern("a1")));
    assert_eq!(collection.annotations[0].region, Region::new(10.0, 20.0, 30.0, 40.0));
    assert_eq!(server.gets_of(FOREIGN_URL), 1);
}

#[tokio::test]
async fn v3_manifest_with_remote_list_is_fetched() {
    let server = FakeServer::ledger();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();
    assert_eq!(count(&viewer), 1);
    assert_eq!(server.gets_of(LEDGER_LIST), 1);
    let v = viewer.borrow();
    assert_eq!(v.canvas().unwrap().label(None), "p. 1");
    assert_eq!(v.image_size(), Size::new(2000.0, 1000.0));
}

#[tokio::test]
async fn unrecognized_manifest_is_rejected_with_notice() {
    let viewer = viewer();
    let err = viewer
        .borrow_mut()
        .load_manifest_json(r#"{"@id": "x", "sequences": []}"#, None)
        .unwrap_err();
    assert!(matches!(err, ViewerError::InvalidManifest(_)));
    let notices = alerts(&viewer);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, AlertKind::Error);
    assert!(viewer.borrow().manifest().is_none());
}

#[tokio::test]
async fn unreachable_list_degrades_to_empty() {
    let server = FakeServer::foreign();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, FOREIGN_URL).await.unwrap();
    server.offline.set(true);
    assert!(session::change_canvas(&viewer, &server, 1).await);
    assert_eq!(count(&viewer), 0);
    assert!(alerts(&viewer).iter().any(|(kind, _)| *kind == AlertKind::Warning));
}

// ─── Persistence routing ─────────────────────────────────────────────────

#[tokio::test]
async fn add_on_foreign_manifest_stays_local() {
    let server = FakeServer::foreign();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, FOREIGN_URL).await.unwrap();
    let (before, local_before) = (count(&viewer), local_count(&viewer));
    viewer.borrow_mut().drain_messages();

    fill_add(&viewer, Region::new(0.0, 0.0, 100.0, 50.0), "hello");
    assert!(session::submit(&viewer, &server, 1_700_000_000_000).await.unwrap());

    assert_eq!(count(&viewer), before + 1);
    assert_eq!(local_count(&viewer), local_before + 1);
    assert!(server.posts.borrow().is_empty());
    let names: Vec<_> = viewer
        .borrow_mut()
        .drain_messages()
        .iter()
        .map(Message::event_name)
        .collect();
    assert!(names.contains(&"add-annotation-submit"));
    assert!(names.contains(&"refresh-annotations"));

    let v = viewer.borrow();
    let added = v.store().collection().unwrap().annotations.last().unwrap().clone();
    assert_eq!(added.chars, "hello");
    assert_eq!(added.region, Region::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(v.store().mode.kind(), ModeKind::View);
}

#[tokio::test]
async fn add_on_local_manifest_posts_then_refetches() {
    let server = FakeServer::ledger();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();

    fill_add(&viewer, Region::new(10.0, 10.0, 200.0, 100.0), "Sum");
    assert!(session::submit(&viewer, &server, 5).await.unwrap());

    let posts = server.posts.borrow();
    assert_eq!(posts.len(), 1);
    let (url, body) = &posts[0];
    assert_eq!(url, "http://localhost:8080/api/v1/annotations/create");
    assert_eq!(body["canvasId"], "http://localhost:8080/iiif/ledger/canvas/1");
    assert_eq!(body["canvasIndex"], 0);
    assert_eq!(body["manifestId"], LEDGER_URL);
    assert_eq!(body["listId"], LEDGER_LIST);
    assert_eq!(body["annotation"]["resource"][0]["chars"], "Sum");

    assert_eq!(server.gets_of(LEDGER_URL), 2, "manifest refetched after save");
    assert_eq!(count(&viewer), 2);
    assert_eq!(local_count(&viewer), 0, "optimistic copy replaced by remote");
}

#[tokio::test]
async fn rejected_write_keeps_optimistic_copy() {
    let server = FakeServer::ledger();
    server.reject_with.set(Some(500));
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();
    viewer.borrow_mut().drain_messages();

    fill_add(&viewer, Region::new(0.0, 0.0, 10.0, 10.0), "draft");
    assert!(!session::submit(&viewer, &server, 9).await.unwrap());

    assert_eq!(count(&viewer), 2);
    assert_eq!(local_count(&viewer), 1);
    assert_eq!(server.gets_of(LEDGER_URL), 1, "no refetch on failure");
    assert!(alerts(&viewer).iter().any(|(kind, _)| *kind == AlertKind::Error));
}

#[tokio::test]
async fn remote_entry_wins_over_local_copy() {
    let server = FakeServer::ledger();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();
    server.reject_with.set(Some(503));

    let r1 = AnnotationId::intern(LEDGER_R1);
    assert!(viewer.borrow_mut().toggle_mode(ModeKind::Edit, Some(r1)));
    viewer.borrow_mut().set_form_text("changed locally");
    assert!(!session::submit(&viewer, &server, 11).await.unwrap());

    let v = viewer.borrow();
    let collection = v.store().collection().unwrap();
    assert_eq!(collection.count(), 1);
    assert_eq!(collection.annotations[0].chars, "Column totals");
    assert!(!collection.annotations[0].local);
    assert_eq!(v.store().local.count(&collection.canvas_id), 1);
}

#[tokio::test]
async fn delete_needs_two_presses_inside_window() {
    let server = FakeServer::ledger();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();
    let r1 = AnnotationId::intern(LEDGER_R1);
    viewer.borrow_mut().toggle_mode(ModeKind::Delete, Some(r1));

    assert!(!session::submit(&viewer, &server, 0).await.unwrap());
    assert!(server.posts.borrow().is_empty());
    // Window elapsed: this press only re-arms.
    assert!(!session::submit(&viewer, &server, 2500).await.unwrap());
    assert!(server.posts.borrow().is_empty());
    assert!(session::submit(&viewer, &server, 3000).await.unwrap());

    assert_eq!(server.posts.borrow()[0].0, "http://localhost:8080/api/v1/annotations/delete");
    assert_eq!(count(&viewer), 0);
}

#[tokio::test]
async fn confirm_control_is_inert_until_armed() {
    let server = FakeServer::ledger();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();
    let r1 = AnnotationId::intern(LEDGER_R1);
    viewer.borrow_mut().toggle_mode(ModeKind::Delete, Some(r1));

    assert!(!session::confirm_delete(&viewer, &server, 0).await);
    viewer.borrow_mut().press_delete(100);
    assert!(session::confirm_delete(&viewer, &server, 200).await);
    assert_eq!(server.posts.borrow().len(), 1);
}

#[tokio::test]
async fn import_goes_through_create_path() {
    let server = FakeServer::ledger();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, LEDGER_URL).await.unwrap();
    let list = json!([
        {"@id": LEDGER_R1, "motivation": "oa:tagging", "resource": "dup", "on": "http://elsewhere/c#xywh=1,2,3,4"},
        {"motivation": "oa:commenting", "resource": {"chars": "new"}, "on": "http://elsewhere/c#xywh=5,6,7,8"}
    ]);
    let recorded = session::import(&viewer, &server, &list.to_string(), 77)
        .await
        .unwrap();
    assert_eq!(recorded, 2);
    let posts = server.posts.borrow();
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|(url, _)| url.ends_with("/create")));
    assert_ne!(posts[0].1["annotation"]["@id"], LEDGER_R1);
    assert_eq!(count(&viewer), 3);
}

// ─── Ordering and teardown ───────────────────────────────────────────────

#[tokio::test]
async fn stale_canvas_response_is_dropped() {
    let server = FakeServer::foreign();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, FOREIGN_URL).await.unwrap();

    let stale = viewer.borrow_mut().set_canvas(1).unwrap();
    assert!(matches!(stale, FetchPlan::Fetch { .. }));
    let fresh = viewer.borrow_mut().set_canvas(0).unwrap();
    assert!(run_plan(&viewer, &server, fresh).await);
    assert!(!run_plan(&viewer, &server, stale).await);

    let v = viewer.borrow();
    let collection = v.store().collection().unwrap();
    assert_eq!(collection.canvas_id, "https://iiif.example.org/psalter/canvas/1");
    assert_eq!(collection.count(), 1);
}

#[tokio::test]
async fn results_after_close_are_ignored() {
    let server = FakeServer::foreign();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, FOREIGN_URL).await.unwrap();
    let plan = viewer.borrow_mut().set_canvas(1).unwrap();
    viewer.borrow_mut().close();
    assert!(!run_plan(&viewer, &server, plan).await);
    assert_eq!(count(&viewer), 0);
}

// ─── Mode and geometry ───────────────────────────────────────────────────

#[tokio::test]
async fn edit_reentry_is_idempotent() {
    let server = FakeServer::foreign();
    let viewer = viewer();
    session::open_manifest(&viewer, &server, FOREIGN_URL).await.unwrap();
    let a1 = AnnotationId::intern("a1");

    viewer.borrow_mut().toggle_mode(ModeKind::Edit, Some(a1));
    let once = {
        let v = viewer.borrow();
        (v.store().mode.draft(), v.store().mode.target().cloned())
    };
    viewer.borrow_mut().drain_messages();
    viewer.borrow_mut().toggle_mode(ModeKind::Edit, Some(a1));
    let twice = {
        let v = viewer.borrow();
        (v.store().mode.draft(), v.store().mode.target().cloned())
    };
    assert_eq!(once, twice);
    let rebroadcast = viewer.borrow_mut().drain_messages();
    assert!(rebroadcast.iter().any(|m| matches!(m, Message::ModeToggle { mode: ModeKind::Edit, .. })));
}

#[test]
fn zoom_round_trip_restores_scroll() {
    let mut v = Viewer::new(ViewerConfig::default());
    v.set_viewport(Viewport {
        left: 0.0,
        top: 0.0,
        width: 200.0,
        height: 200.0,
    });
    v.image_loaded(Size::new(800.0, 600.0));
    v.scroll_by(50.0, 40.0);
    let before = v.coords().scroll();

    assert_eq!(v.apply_zoom(2.0), 2.0);
    assert_eq!(v.apply_zoom(1.0), 1.0);
    let after = v.coords().scroll();
    assert!((after.x - before.x).abs() <= 1.0);
    assert!((after.y - before.y).abs() <= 1.0);
}

#[test]
fn screen_transform_round_trips_across_zoom_levels() {
    let mut v = Viewer::new(ViewerConfig::default());
    v.set_viewport(Viewport {
        left: 30.0,
        top: 20.0,
        width: 300.0,
        height: 300.0,
    });
    v.image_loaded(Size::new(1600.0, 1200.0));
    let region = Region::new(400.0, 300.0, 200.0, 100.0);
    for zoom in [0.5, 1.0, 1.75, 3.0, 5.0] {
        v.apply_zoom(zoom);
        let rect = v.coords().image_to_screen(&region);
        let viewport = v.coords().viewport();
        let top_left = v
            .coords()
            .screen_to_image(viewport.left + rect.left, viewport.top + rect.top);
        if let Some(p) = top_left {
            assert!((p.x - region.x).abs() <= 1.0, "zoom {zoom}: x {}", p.x);
            assert!((p.y - region.y).abs() <= 1.0, "zoom {zoom}: y {}", p.y);
        }
        let scale = v.coords().scale();
        assert!((rect.width / scale.0 - region.w).abs() <= 1.0);
        assert!((rect.height / scale.1 - region.h).abs() <= 1.0);
    }
}
