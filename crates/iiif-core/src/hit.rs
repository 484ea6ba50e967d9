//! Hit testing: image point → annotation lookup.
//!
//! Later entries are drawn on top, so lookups walk in reverse.

use crate::annotation::AnnotationView;
use crate::id::AnnotationId;
use crate::model::{ActiveAnnotation, Point, Size};

/// Index of the topmost annotation whose region contains `p`.
pub fn hit_test(annotations: &[AnnotationView], image: Size, p: Point) -> Option<usize> {
    annotations
        .iter()
        .enumerate()
        .rev()
        .find(|(_, a)| {
            let region = a.region.to_pixels(image);
            !region.is_empty() && region.contains(p.x, p.y)
        })
        .map(|(i, _)| i)
}

/// Topmost highlighted annotation containing `p`.
pub fn hit_test_active(active: &[ActiveAnnotation], image: Size, p: Point) -> Option<AnnotationId> {
    active
        .iter()
        .rev()
        .find(|a| a.region.to_pixels(image).contains(p.x, p.y))
        .map(|a| a.id)
}
