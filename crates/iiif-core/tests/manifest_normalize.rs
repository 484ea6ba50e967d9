//! Integration tests: manifest load → normalization → canvas accessors.
//!
//! Exercises the full `iiif-core` read path: JSON text → `Manifest` (v2
//! shape) → canvases → parsed annotations.

use iiif_core::annotation::AnnotationView;
use iiif_core::manifest::{AnnotationSource, Manifest, PresentationVersion, convert_v3_to_v2};
use iiif_core::{Region, Size, ViewerError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn v2() -> Manifest {
    Manifest::from_json(include_str!("fixtures/v2_inline.json")).unwrap()
}

fn v3() -> Manifest {
    Manifest::from_json(include_str!("fixtures/v3_basic.json")).unwrap()
}

// ─── v2 ──────────────────────────────────────────────────────────────────

#[test]
fn v2_manifest_loads_unchanged() {
    let manifest = v2();
    assert_eq!(manifest.source_version(), PresentationVersion::V2);
    assert_eq!(manifest.id(), "https://iiif.example.org/book1/manifest.json");
    assert_eq!(manifest.label(Some("fr")), "Livre d'heures");
    assert_eq!(manifest.label(None), "Book of Hours");
    assert_eq!(manifest.canvas_count(), 2);
    assert_eq!(manifest.languages(), vec!["en", "fr"]);
}

#[test]
fn v2_inline_annotation_parses_region() {
    let manifest = v2();
    let canvas = manifest.canvas(0).unwrap();
    assert_eq!(canvas.size(), Size::new(2000.0, 3000.0));
    assert_eq!(
        canvas.image_url(),
        Some("https://iiif.example.org/images/f1r/full/full/0/default.jpg")
    );
    let AnnotationSource::Inline(resources) = canvas.annotation_source() else {
        panic!("expected inline annotations");
    };
    assert_eq!(resources.len(), 1);
    let view = AnnotationView::parse(&resources[0], false);
    assert_eq!(view.region, Region::new(10.0, 20.0, 30.0, 40.0));
}

#[test]
fn v2_remote_list_is_referenced_by_url() {
    let manifest = v2();
    assert_eq!(
        manifest.canvas(1).unwrap().annotation_source(),
        AnnotationSource::Remote("https://iiif.example.org/book1/list/2".into())
    );
}

// ─── v3 ──────────────────────────────────────────────────────────────────

#[test]
fn v3_manifest_converts_to_v2_shape() {
    let manifest = v3();
    assert_eq!(manifest.source_version(), PresentationVersion::V3);
    let doc = manifest.as_value();
    assert_eq!(doc["@type"], "sc:Manifest");
    assert_eq!(doc["@id"], "http://localhost:8080/iiif/book2/manifest");
    assert_eq!(
        doc["label"],
        json!([
            {"@language": "en", "@value": "Herbal"},
            {"@language": "de", "@value": "Kräuterbuch"}
        ])
    );
    assert_eq!(doc["description"], "A sixteenth-century herbal");
    assert_eq!(doc["metadata"][0], json!({"label": "Date", "value": "1543"}));
    assert_eq!(doc["attribution"], "Example Library");
    assert_eq!(doc["license"], "http://creativecommons.org/licenses/by/4.0/");
    assert_eq!(doc["sequences"][0]["canvases"].as_array().map(Vec::len), Some(2));
}

#[test]
fn v3_canvas_images_and_annotations_are_mapped() {
    let manifest = v3();
    let canvas = manifest.canvas(0).unwrap();
    assert_eq!(canvas.id(), "http://localhost:8080/iiif/book2/canvas/p1");
    assert_eq!(canvas.label(None), "p. 1");
    assert_eq!(
        canvas.image_url(),
        Some("http://localhost:8080/images/p1/full/max/0/default.jpg")
    );
    assert_eq!(
        canvas.raw()["images"][0]["resource"]["service"]["@id"],
        "http://localhost:8080/images/p1"
    );

    let AnnotationSource::Inline(resources) = canvas.annotation_source() else {
        panic!("expected converted inline annotation page");
    };
    let view = AnnotationView::parse(&resources[0], false);
    assert_eq!(view.chars, "A rose");
    assert_eq!(view.region, Region::new(100.0, 200.0, 300.0, 400.0));
    assert_eq!(
        view.target.as_deref(),
        Some("http://localhost:8080/iiif/book2/canvas/p1")
    );

    assert_eq!(
        manifest.canvas(1).unwrap().annotation_source(),
        AnnotationSource::Remote("http://localhost:8080/iiif/book2/list/p2".into())
    );
}

#[test]
fn v3_languages_keep_first_seen_order() {
    let raw: Value = serde_json::from_str(include_str!("fixtures/v3_basic.json")).unwrap();
    assert_eq!(iiif_core::manifest::get_languages(&raw), vec!["en", "de"]);
}

#[test]
fn conversion_is_total_for_well_formed_manifests() {
    for n in 0..5 {
        let items: Vec<Value> = (0..n)
            .map(|i| json!({"id": format!("c{i}"), "type": "Canvas"}))
            .collect();
        let v3 = json!({"type": "Manifest", "id": "m", "items": items});
        let v2 = convert_v3_to_v2(&v3).unwrap();
        assert_eq!(v2["sequences"][0]["canvases"].as_array().map(Vec::len), Some(n));
    }
    // No items at all still yields an empty canvas list.
    let bare = convert_v3_to_v2(&json!({"type": "Manifest"})).unwrap();
    assert_eq!(bare["sequences"][0]["canvases"], json!([]));
}

// ─── Rejections ──────────────────────────────────────────────────────────

#[test]
fn unknown_version_is_rejected() {
    let err = Manifest::from_json(r#"{"@id": "x", "sequences": []}"#).unwrap_err();
    assert!(matches!(err, ViewerError::InvalidManifest(_)));
}

#[test]
fn malformed_json_is_rejected() {
    let err = Manifest::from_json("{not json").unwrap_err();
    assert!(matches!(err, ViewerError::Json(_)));
}

#[test]
fn v3_context_with_wrong_type_is_rejected() {
    let err = Manifest::from_json(
        r#"{"@context": "http://iiif.io/api/presentation/3/context.json", "type": "Collection"}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ViewerError::InvalidManifest(_)));
}
