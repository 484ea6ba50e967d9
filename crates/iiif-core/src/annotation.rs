//! Web-Annotation-like JSON ↔ normalized annotation views.
//!
//! Raw annotations stay as `serde_json::Value` (the `full` object) because
//! they round-trip to remote stores that may carry fields we do not model.
//! `AnnotationView` is the parsed projection the editor works with.

use crate::id::AnnotationId;
use crate::model::{Motivation, Region};
use crate::selector::{parse_region, split_target};
use serde::Serialize;
use serde_json::{Value, json};
use smallvec::SmallVec;

/// Normalized view of one annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationView {
    pub id: Option<AnnotationId>,
    /// Identity used for deduplication: the id, or the serialized object.
    #[serde(skip)]
    pub key: String,
    pub motivation: SmallVec<[Motivation; 2]>,
    pub chars: String,
    pub region: Region,
    /// Target resource URI (canvas or image), without fragment.
    pub target: Option<String>,
    pub full: Value,
    /// `true` when created or edited in this session and not confirmed remote.
    pub local: bool,
}

impl AnnotationView {
    pub fn parse(raw: &Value, local: bool) -> Self {
        let (target, region) = extract_target(raw);
        Self {
            id: annotation_id(raw).map(AnnotationId::intern),
            key: dedup_key(raw),
            motivation: extract_motivations(raw.get("motivation").unwrap_or(&Value::Null)),
            chars: raw
                .get("resource")
                .or_else(|| raw.get("body"))
                .map(extract_chars)
                .unwrap_or_default(),
            region,
            target,
            full: raw.clone(),
            local,
        }
    }

    /// First motivation, `commenting` when none is declared.
    pub fn primary_motivation(&self) -> Motivation {
        self.motivation.first().cloned().unwrap_or_default()
    }

    /// Id for overlay bookkeeping; id-less annotations fall back to their key.
    pub fn overlay_id(&self) -> AnnotationId {
        self.id.unwrap_or_else(|| AnnotationId::intern(&self.key))
    }

    /// The `format` of the first textual body, if any.
    pub fn format(&self) -> Option<&str> {
        let body = self.full.get("resource").or_else(|| self.full.get("body"))?;
        let first = match body {
            Value::Array(items) => items.first()?,
            other => other,
        };
        first.get("format").and_then(Value::as_str)
    }
}

/// `@id` (v2) or `id` (v3).
pub fn annotation_id(raw: &Value) -> Option<&str> {
    raw.get("@id")
        .or_else(|| raw.get("id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Deduplication identity: the id when present, else the full serialization.
pub fn dedup_key(raw: &Value) -> String {
    match annotation_id(raw) {
        Some(id) => id.to_string(),
        None => raw.to_string(),
    }
}

/// Text of an annotation body.
///
/// Accepts a string, an object with `chars` / `@value` / `value`, or an
/// array of those (joined with spaces).
pub fn extract_chars(resource: &Value) -> String {
    match resource {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["chars", "@value", "value"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        Value::Array(items) => items
            .iter()
            .map(extract_chars)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

pub fn extract_motivations(value: &Value) -> SmallVec<[Motivation; 2]> {
    match value {
        Value::String(s) => smallvec::smallvec![Motivation::parse(s)],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(Motivation::parse)
            .collect(),
        _ => SmallVec::new(),
    }
}

/// Target URI and region from `on` (v2) or `target` (v3).
pub fn extract_target(raw: &Value) -> (Option<String>, Region) {
    let Some(target) = raw.get("on").or_else(|| raw.get("target")) else {
        log::warn!("annotation without target, using empty region");
        return (None, Region::default());
    };
    target_of(target)
}

fn target_of(target: &Value) -> (Option<String>, Region) {
    match target {
        Value::String(on) => {
            let (uri, region) = split_target(on);
            (Some(uri.to_string()), region)
        }
        Value::Array(items) => match items.first() {
            Some(first) => target_of(first),
            None => (None, Region::default()),
        },
        Value::Object(map) => {
            let uri = ["full", "source", "@id", "id"]
                .iter()
                .find_map(|k| map.get(*k))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    other => annotation_id(other).map(str::to_string),
                });
            let region = map
                .get("selector")
                .and_then(selector_value)
                .map(parse_region)
                .unwrap_or_else(|| {
                    log::warn!("annotation target without selector, using empty region");
                    Region::default()
                });
            (uri, region)
        }
        _ => (None, Region::default()),
    }
}

/// `selector.value`, also looking through `oa:Choice` defaults.
fn selector_value(selector: &Value) -> Option<&str> {
    match selector {
        Value::String(s) => Some(s),
        Value::Array(items) => items.iter().find_map(selector_value),
        Value::Object(map) => map
            .get("value")
            .and_then(Value::as_str)
            .or_else(|| map.get("default").and_then(selector_value)),
        _ => None,
    }
}

// ─── Building ────────────────────────────────────────────────────────────

/// Everything needed to write an annotation document.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDraft {
    pub id: AnnotationId,
    pub motivation: Motivation,
    pub chars: String,
    pub format: String,
    pub region: Region,
    pub image_url: String,
    pub manifest_id: String,
}

impl AnnotationDraft {
    /// Emit the v2 Open Annotation document stored in annotation lists.
    pub fn to_json(&self) -> Value {
        json!({
            "@context": "http://iiif.io/api/presentation/2/context.json",
            "@id": self.id.as_str(),
            "@type": "oa:Annotation",
            "motivation": [self.motivation.to_oa()],
            "resource": [{
                "@type": "dctypes:Text",
                "format": self.format,
                "chars": self.chars,
            }],
            "on": target_json(&self.image_url, &self.region, &self.manifest_id),
        })
    }
}

fn target_json(full: &str, region: &Region, manifest_id: &str) -> Value {
    json!({
        "@type": "oa:SpecificResource",
        "full": full,
        "selector": {
            "@type": "oa:FragmentSelector",
            "value": region.to_fragment(),
        },
        "within": {
            "@id": manifest_id,
            "@type": "sc:Manifest",
        },
    })
}

/// Replace the annotation's id in place (both `@id` and `id` spellings).
pub fn set_id(raw: &mut Value, id: AnnotationId) {
    if let Value::Object(map) = raw {
        if map.contains_key("id") && !map.contains_key("@id") {
            map.insert("id".into(), Value::String(id.as_str().to_string()));
        } else {
            map.insert("@id".into(), Value::String(id.as_str().to_string()));
        }
    }
}

/// Point an imported annotation at a new image and manifest, keeping its
/// region. v3 `target`s are rewritten as v2 `on` objects.
pub fn retarget(raw: &mut Value, image_url: &str, manifest_id: &str) {
    let (_, region) = extract_target(raw);
    if let Value::Object(map) = raw {
        map.remove("target");
        map.insert("on".into(), target_json(image_url, &region, manifest_id));
    }
}
