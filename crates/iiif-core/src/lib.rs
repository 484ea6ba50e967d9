pub mod annotation;
pub mod config;
pub mod error;
pub mod export;
pub mod hit;
pub mod id;
pub mod manifest;
pub mod model;
pub mod origin;
pub mod selector;
pub mod viewport;

pub use annotation::{AnnotationDraft, AnnotationView};
pub use config::{AutoScrollConfig, ViewerConfig, ZoomConfig};
pub use error::{Result, ViewerError};
pub use id::AnnotationId;
pub use manifest::{AnnotationSource, Canvas, Manifest, PresentationVersion};
pub use model::*;
pub use viewport::{CoordEngine, CoordPicker, PickerReading, Viewport};
