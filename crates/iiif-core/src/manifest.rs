//! IIIF Presentation manifest normalizer.
//!
//! Everything downstream works on the v2 shape
//! (`sequences[].canvases[].images[]`, `otherContent`, label values or
//! `@language` pairs). v3 documents are converted on load:
//!
//! | v3 | v2 |
//! |----|----|
//! | `items[]` (Canvas) | `sequences[0].canvases[]` |
//! | `items[].items[].items[]` (painting annotation) | `images[]` |
//! | `annotations[]` (AnnotationPage) | `otherContent[]` (AnnotationList) |
//! | language map | bare value or `{"@language","@value"}` array |
//! | `summary` | `description` |
//! | `requiredStatement` | `attribution` |
//! | `rights` | `license` |

use crate::error::{Result, ViewerError};
use crate::model::Size;
use serde_json::{Map, Value, json};

/// Language tags that carry no linguistic content.
const NO_LANGUAGE: [&str; 3] = ["none", "und", "zxx"];

const V2_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationVersion {
    V2,
    V3,
    Unknown,
}

impl PresentationVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2 => "2",
            Self::V3 => "3",
            Self::Unknown => "unknown",
        }
    }
}

// ─── Version detection ───────────────────────────────────────────────────

/// Inspect `@context` for presentation-API version markers.
///
/// Returns `Unknown` when both or neither marker is present.
pub fn detect_version(manifest: &Value) -> PresentationVersion {
    let mut contexts = Vec::new();
    collect_context_strings(manifest.get("@context").unwrap_or(&Value::Null), &mut contexts);
    let v2 = contexts.iter().any(|c| c.contains("iiif.io/api/presentation/2"));
    let v3 = contexts.iter().any(|c| c.contains("iiif.io/api/presentation/3"));
    match (v2, v3) {
        (true, false) => PresentationVersion::V2,
        (false, true) => PresentationVersion::V3,
        _ => PresentationVersion::Unknown,
    }
}

fn collect_context_strings<'a>(context: &'a Value, out: &mut Vec<&'a str>) {
    match context {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_context_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_context_strings(v, out)),
        _ => {}
    }
}

// ─── Language maps ───────────────────────────────────────────────────────

fn is_no_language(tag: &str) -> bool {
    NO_LANGUAGE.contains(&tag)
}

/// Flatten a v3 language map into a v2 label value.
///
/// - all tags in {none, und, zxx}, or a single tag → bare string (one value)
///   or array of strings (several values)
/// - several real languages → `[{"@language": tag, "@value": v}, ...]`
///
/// Non-map inputs pass through unchanged.
pub fn convert_label_smart(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let entries: Vec<(&str, Vec<&Value>)> = map
        .iter()
        .map(|(tag, v)| {
            let values = match v {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            (tag.as_str(), values)
        })
        .collect();
    if entries.is_empty() {
        return Value::String(String::new());
    }

    let collapse = entries.len() == 1 || entries.iter().all(|(tag, _)| is_no_language(tag));
    if collapse {
        let mut values: Vec<Value> = entries
            .into_iter()
            .flat_map(|(_, vs)| vs.into_iter().cloned())
            .collect();
        return match values.len() {
            1 => values.remove(0),
            _ => Value::Array(values),
        };
    }

    let pairs = entries
        .into_iter()
        .flat_map(|(tag, vs)| {
            vs.into_iter().map(move |v| {
                if is_no_language(tag) {
                    json!({ "@value": v })
                } else {
                    json!({ "@language": tag, "@value": v })
                }
            })
        })
        .collect();
    Value::Array(pairs)
}

/// Pick a display string from any label shape (v2 or v3), preferring
/// `lang` when the label is multilingual.
pub fn label_text(label: &Value, lang: Option<&str>) -> String {
    match label {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let preferred = lang.and_then(|l| {
                items.iter().find(|item| {
                    item.get("@language").and_then(Value::as_str) == Some(l)
                })
            });
            match preferred.or(items.first()) {
                Some(item) => label_text(item, None),
                None => String::new(),
            }
        }
        Value::Object(map) => {
            if let Some(v) = map.get("@value") {
                return label_text(v, None);
            }
            let pick = lang
                .and_then(|l| map.get(l))
                .or_else(|| NO_LANGUAGE.iter().find_map(|t| map.get(*t)))
                .or_else(|| map.values().next());
            pick.map(|v| label_text(v, None)).unwrap_or_default()
        }
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Languages present in the manifest, in first-seen order.
///
/// Collects `@language` tags (v2) and language-map keys (v3) under
/// `label`, `summary`, `value` and `description`; tags without
/// linguistic content are skipped.
pub fn get_languages(manifest: &Value) -> Vec<String> {
    let mut langs = Vec::new();
    walk_languages(manifest, &mut langs);
    langs
}

fn walk_languages(node: &Value, langs: &mut Vec<String>) {
    let mut push = |tag: &str| {
        if !is_no_language(tag) && !langs.iter().any(|l| l == tag) {
            langs.push(tag.to_string());
        }
    };
    match node {
        Value::Object(map) => {
            if let Some(tag) = map.get("@language").and_then(Value::as_str) {
                push(tag);
            }
            for key in ["label", "summary", "value", "description"] {
                if let Some(Value::Object(lang_map)) = map.get(key)
                    && is_language_map(lang_map)
                {
                    lang_map.keys().for_each(|k| push(k));
                }
            }
            map.values().for_each(|v| walk_languages(v, langs));
        }
        Value::Array(items) => items.iter().for_each(|v| walk_languages(v, langs)),
        _ => {}
    }
}

fn is_language_map(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.iter().all(|(k, v)| {
            !k.starts_with('@')
                && matches!(v, Value::Array(items) if items.iter().all(Value::is_string))
        })
}

// ─── v3 → v2 conversion ──────────────────────────────────────────────────

/// Convert a v3 Manifest into the v2 shape.
///
/// Fails only when the top-level `type` is not `Manifest`.
pub fn convert_v3_to_v2(v3: &Value) -> Result<Value> {
    let kind = v3.get("type").and_then(Value::as_str).unwrap_or_default();
    if kind != "Manifest" {
        return Err(ViewerError::InvalidManifest(format!(
            "expected type `Manifest`, found `{kind}`"
        )));
    }
    let id = str_field(v3, "id");

    let mut out = Map::new();
    out.insert("@context".into(), json!(V2_CONTEXT));
    out.insert("@id".into(), json!(id));
    out.insert("@type".into(), json!("sc:Manifest"));
    out.insert("label".into(), convert_label_smart(v3.get("label").unwrap_or(&Value::Null)));
    if let Some(metadata) = v3.get("metadata").and_then(Value::as_array) {
        let converted: Vec<Value> = metadata
            .iter()
            .map(|entry| {
                json!({
                    "label": convert_label_smart(entry.get("label").unwrap_or(&Value::Null)),
                    "value": convert_label_smart(entry.get("value").unwrap_or(&Value::Null)),
                })
            })
            .collect();
        out.insert("metadata".into(), Value::Array(converted));
    }
    if let Some(summary) = v3.get("summary") {
        out.insert("description".into(), convert_label_smart(summary));
    }
    if let Some(statement) = v3.get("requiredStatement").and_then(|s| s.get("value")) {
        out.insert("attribution".into(), convert_label_smart(statement));
    }
    if let Some(rights) = v3.get("rights") {
        out.insert("license".into(), rights.clone());
    }
    if let Some(nav_date) = v3.get("navDate") {
        out.insert("navDate".into(), nav_date.clone());
    }

    let canvases: Vec<Value> = v3
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(convert_canvas).collect())
        .unwrap_or_default();
    out.insert(
        "sequences".into(),
        json!([{
            "@id": format!("{}/sequence/normal", id.trim_end_matches('/')),
            "@type": "sc:Sequence",
            "canvases": canvases,
        }]),
    );
    Ok(Value::Object(out))
}

fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn convert_canvas(canvas: &Value) -> Value {
    let id = str_field(canvas, "id");
    let images: Vec<Value> = canvas
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .flat_map(|page| page.get("items").and_then(Value::as_array).into_iter().flatten())
        .map(|anno| convert_painting(anno, id))
        .collect();

    let mut out = Map::new();
    out.insert("@id".into(), json!(id));
    out.insert("@type".into(), json!("sc:Canvas"));
    out.insert("label".into(), convert_label_smart(canvas.get("label").unwrap_or(&Value::Null)));
    for key in ["width", "height"] {
        if let Some(v) = canvas.get(key) {
            out.insert(key.into(), v.clone());
        }
    }
    out.insert("images".into(), Value::Array(images));
    if let Some(pages) = canvas.get("annotations").and_then(Value::as_array) {
        let lists: Vec<Value> = pages.iter().map(convert_annotation_page).collect();
        out.insert("otherContent".into(), Value::Array(lists));
    }
    Value::Object(out)
}

fn convert_painting(anno: &Value, canvas_id: &str) -> Value {
    let body = match anno.get("body") {
        Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
        Some(other) => other.clone(),
        None => Value::Null,
    };
    let mut resource = Map::new();
    resource.insert("@id".into(), json!(str_field(&body, "id")));
    resource.insert("@type".into(), json!("dctypes:Image"));
    for key in ["format", "width", "height"] {
        if let Some(v) = body.get(key) {
            resource.insert(key.into(), v.clone());
        }
    }
    if let Some(service) = body.get("service") {
        resource.insert("service".into(), convert_service(service));
    }
    json!({
        "@id": str_field(anno, "id"),
        "@type": "oa:Annotation",
        "motivation": "sc:painting",
        "resource": resource,
        "on": canvas_id,
    })
}

fn convert_service(service: &Value) -> Value {
    let first = match service {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    let id = first
        .get("id")
        .or_else(|| first.get("@id"))
        .cloned()
        .unwrap_or(Value::Null);
    let profile = first.get("profile").cloned().unwrap_or(Value::Null);
    json!({
        "@context": "http://iiif.io/api/image/2/context.json",
        "@id": id,
        "profile": profile,
    })
}

fn convert_annotation_page(page: &Value) -> Value {
    let mut list = Map::new();
    list.insert("@id".into(), json!(str_field(page, "id")));
    list.insert("@type".into(), json!("sc:AnnotationList"));
    if let Some(items) = page.get("items").and_then(Value::as_array) {
        let resources: Vec<Value> = items.iter().map(convert_annotation).collect();
        list.insert("resources".into(), Value::Array(resources));
    }
    Value::Object(list)
}

/// v3 annotation → v2 Open Annotation (body → resource, target → on).
fn convert_annotation(anno: &Value) -> Value {
    let resource = match anno.get("body") {
        Some(Value::Array(items)) => Value::Array(items.iter().map(convert_body).collect()),
        Some(body) => convert_body(body),
        None => Value::Null,
    };
    let on = match anno.get("target") {
        Some(Value::Object(target)) => json!({
            "@type": "oa:SpecificResource",
            "full": target.get("source").cloned().unwrap_or(Value::Null),
            "selector": target.get("selector").cloned().unwrap_or(Value::Null),
        }),
        Some(other) => other.clone(),
        None => Value::Null,
    };
    let motivation = anno.get("motivation").cloned().unwrap_or(json!("oa:commenting"));
    json!({
        "@id": str_field(anno, "id"),
        "@type": "oa:Annotation",
        "motivation": motivation,
        "resource": resource,
        "on": on,
    })
}

fn convert_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => {
            let mut out = Map::new();
            out.insert("@type".into(), json!("dctypes:Text"));
            if let Some(format) = map.get("format") {
                out.insert("format".into(), format.clone());
            }
            let chars = map.get("value").or_else(|| map.get("chars")).cloned();
            out.insert("chars".into(), chars.unwrap_or(Value::String(String::new())));
            if let Some(lang) = map.get("language") {
                out.insert("language".into(), lang.clone());
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

// ─── Normalized manifest ─────────────────────────────────────────────────

/// Where a canvas's annotations come from.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationSource {
    Inline(Vec<Value>),
    Remote(String),
    None,
}

/// A manifest in the v2 shape, whatever version it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    doc: Value,
    source_version: PresentationVersion,
}

impl Manifest {
    /// Parse, detect the version, and normalize to v2.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match detect_version(&value) {
            PresentationVersion::V2 => Ok(Self {
                doc: value,
                source_version: PresentationVersion::V2,
            }),
            PresentationVersion::V3 => Ok(Self {
                doc: convert_v3_to_v2(&value)?,
                source_version: PresentationVersion::V3,
            }),
            PresentationVersion::Unknown => Err(ViewerError::InvalidManifest(
                "missing or ambiguous IIIF Presentation @context".to_string(),
            )),
        }
    }

    pub fn source_version(&self) -> PresentationVersion {
        self.source_version
    }

    pub fn as_value(&self) -> &Value {
        &self.doc
    }

    pub fn id(&self) -> &str {
        self.doc
            .get("@id")
            .or_else(|| self.doc.get("id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn label(&self, lang: Option<&str>) -> String {
        label_text(self.doc.get("label").unwrap_or(&Value::Null), lang)
    }

    pub fn languages(&self) -> Vec<String> {
        get_languages(&self.doc)
    }

    fn canvas_values(&self) -> &[Value] {
        self.doc
            .get("sequences")
            .and_then(|s| s.get(0))
            .and_then(|s| s.get("canvases"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn canvas_count(&self) -> usize {
        self.canvas_values().len()
    }

    pub fn canvases(&self) -> impl Iterator<Item = Canvas<'_>> {
        self.canvas_values()
            .iter()
            .enumerate()
            .map(|(index, raw)| Canvas { index, raw })
    }

    pub fn canvas(&self, index: usize) -> Option<Canvas<'_>> {
        self.canvas_values().get(index).map(|raw| Canvas { index, raw })
    }
}

/// Borrowed view of one canvas in a normalized manifest.
#[derive(Debug, Clone, Copy)]
pub struct Canvas<'a> {
    pub index: usize,
    raw: &'a Value,
}

impl<'a> Canvas<'a> {
    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    pub fn id(&self) -> &'a str {
        self.raw
            .get("@id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn label(&self, lang: Option<&str>) -> String {
        match self.raw.get("label") {
            Some(label) => label_text(label, lang),
            None => format!("canvas {}", self.index + 1),
        }
    }

    fn first_image_resource(&self) -> Option<&'a Value> {
        self.raw
            .get("images")
            .and_then(|images| images.get(0))
            .and_then(|image| image.get("resource"))
    }

    /// Canvas dimensions, falling back to the first image's.
    pub fn size(&self) -> Size {
        let dim = |v: &Value, key: &str| v.get(key).and_then(Value::as_f64);
        let resource = self.first_image_resource();
        let width = dim(self.raw, "width").or_else(|| resource.and_then(|r| dim(r, "width")));
        let height = dim(self.raw, "height").or_else(|| resource.and_then(|r| dim(r, "height")));
        Size::new(width.unwrap_or(0.0), height.unwrap_or(0.0))
    }

    pub fn image_url(&self) -> Option<&'a str> {
        let resource = self.first_image_resource()?;
        resource
            .get("@id")
            .or_else(|| resource.get("id"))
            .and_then(Value::as_str)
    }

    /// Inline annotations win over a remote list reference.
    pub fn annotation_source(&self) -> AnnotationSource {
        let lists: Vec<&Value> = match self.raw.get("otherContent") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => return AnnotationSource::None,
        };
        if let Some(resources) = lists
            .iter()
            .find_map(|l| l.get("resources").and_then(Value::as_array))
        {
            return AnnotationSource::Inline(resources.clone());
        }
        lists
            .iter()
            .find_map(|l| match l {
                Value::String(url) => Some(url.clone()),
                other => other.get("@id").and_then(Value::as_str).map(str::to_string),
            })
            .filter(|url| !url.is_empty())
            .map(AnnotationSource::Remote)
            .unwrap_or(AnnotationSource::None)
    }

    /// The remote list URL, if the canvas references one.
    pub fn list_url(&self) -> Option<String> {
        let lists = self.raw.get("otherContent")?;
        let first = match lists {
            Value::Array(items) => items.first()?,
            other => other,
        };
        match first {
            Value::String(url) => Some(url.clone()),
            other => other.get("@id").and_then(Value::as_str).map(str::to_string),
        }
        .filter(|url| !url.is_empty())
    }
}
