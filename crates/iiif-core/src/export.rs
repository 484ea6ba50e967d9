//! Export helpers: file names and exported documents.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

/// Keep ASCII alphanumerics, `-` and `_`; collapse everything else into a
/// single `_`; trim underscores from both ends.
pub fn sanitize_filename(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// `<sanitized-label>_<YYYYMMDD>.json`
pub fn manifest_export_name(label: &str, date: NaiveDate) -> String {
    let stem = sanitize_filename(label);
    let stem = if stem.is_empty() { "manifest".to_string() } else { stem };
    format!("{stem}_{}.json", date.format("%Y%m%d"))
}

/// Short, file-safe name for a manifest id: the last meaningful path
/// segment (`…/book1/manifest.json` → `book1`).
pub fn manifest_slug(manifest_id: &str) -> String {
    let trimmed = manifest_id
        .trim_end_matches('/')
        .trim_end_matches(".json")
        .trim_end_matches("/manifest");
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let slug = sanitize_filename(segment);
    if slug.is_empty() { "manifest".to_string() } else { slug }
}

/// `<manifestId>_<canvasLabel>_annotations_<YYYYMMDDhhmm>.json`
pub fn annotations_export_name(manifest_id: &str, canvas_label: &str, at: NaiveDateTime) -> String {
    let canvas = sanitize_filename(canvas_label);
    let canvas = if canvas.is_empty() { "canvas".to_string() } else { canvas };
    format!(
        "{}_{canvas}_annotations_{}.json",
        manifest_slug(manifest_id),
        at.format("%Y%m%d%H%M")
    )
}

/// Wrap annotations in a v2 `sc:AnnotationList`.
pub fn annotation_list_document(list_id: &str, canvas_id: &str, annotations: &[Value]) -> Value {
    json!({
        "@context": "http://iiif.io/api/presentation/2/context.json",
        "@id": list_id,
        "@type": "sc:AnnotationList",
        "within": canvas_id,
        "resources": annotations,
    })
}

pub fn to_pretty_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
