//! Annotation form: region + motivation + text ↔ annotation JSON.

use iiif_core::annotation::{AnnotationDraft, AnnotationView};
use iiif_core::error::{Result, ViewerError};
use iiif_core::id::AnnotationId;
use iiif_core::model::{Motivation, Region, RegionUnit, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_FORMAT: &str = "text/plain";

/// One numeric input of the region editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionField {
    X,
    Y,
    W,
    H,
}

impl RegionField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "w" | "width" => Some(Self::W),
            "h" | "height" => Some(Self::H),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationForm {
    pub region: Region,
    pub motivation: Motivation,
    pub text: String,
    pub format: String,
    /// Annotation being edited or deleted; `None` for a new one.
    #[serde(skip)]
    source: Option<AnnotationView>,
}

impl AnnotationForm {
    pub fn blank(region: Region) -> Self {
        Self {
            region,
            motivation: Motivation::default(),
            text: String::new(),
            format: DEFAULT_FORMAT.to_string(),
            source: None,
        }
    }

    /// Fields of an existing annotation, for edit or delete.
    pub fn from_annotation(view: &AnnotationView) -> Self {
        Self {
            source: Some(view.clone()),
            ..Self::duplicate_of(view)
        }
    }

    /// Same fields, but submitting creates a new annotation.
    pub fn duplicate_of(view: &AnnotationView) -> Self {
        Self {
            region: view.region,
            motivation: view.primary_motivation(),
            text: view.chars.clone(),
            format: view.format().unwrap_or(DEFAULT_FORMAT).to_string(),
            source: None,
        }
    }

    pub fn source(&self) -> Option<&AnnotationView> {
        self.source.as_ref()
    }

    /// Set one coordinate; returns the new region for the draft overlay.
    pub fn set_field(&mut self, field: RegionField, value: f64) -> Region {
        let value = if value.is_finite() { value.round() } else { 0.0 };
        match field {
            RegionField::X => self.region.x = value,
            RegionField::Y => self.region.y = value,
            RegionField::W => self.region.w = value,
            RegionField::H => self.region.h = value,
        }
        self.region
    }

    /// Check the region against the image. An unknown (zero) image size
    /// only checks signs.
    pub fn validate(&self, image: Size) -> Result<()> {
        let Region { x, y, w, h, unit } = self.region;
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            return Err(ViewerError::Validation("coordinates must be numbers".into()));
        }
        if x < 0.0 || y < 0.0 {
            return Err(ViewerError::Validation(format!(
                "region origin ({x}, {y}) is outside the image"
            )));
        }
        if w <= 0.0 || h <= 0.0 {
            return Err(ViewerError::Validation(
                "region width and height must be positive".into(),
            ));
        }
        let bounds = match unit {
            RegionUnit::Pixel => image,
            RegionUnit::Percent => Size::new(100.0, 100.0),
        };
        if !bounds.is_empty() && (x + w > bounds.width || y + h > bounds.height) {
            return Err(ViewerError::Validation(format!(
                "region {},{},{},{} exceeds the image ({}×{})",
                x, y, w, h, bounds.width, bounds.height
            )));
        }
        Ok(())
    }

    /// Validate and emit the annotation document. Edits keep the source id;
    /// new annotations use `fresh_id`.
    pub fn build(&self, fresh_id: AnnotationId, image: Size, image_url: &str, manifest_id: &str) -> Result<Value> {
        self.validate(image)?;
        let id = self
            .source
            .as_ref()
            .and_then(|s| s.id)
            .unwrap_or(fresh_id);
        let draft = AnnotationDraft {
            id,
            motivation: self.motivation.clone(),
            chars: self.text.clone(),
            format: self.format.clone(),
            region: self.region,
            image_url: image_url.to_string(),
            manifest_id: manifest_id.to_string(),
        };
        Ok(draft.to_json())
    }
}
