//! Pointer input over the image: drawing a region by drag.

use iiif_core::model::{Point, Region, Size};
use iiif_core::viewport::CoordEngine;
use serde::Deserialize;

/// Pointer event in client (page) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Leave,
}

/// Drag-to-draw rectangle tool. Reports the region in image pixels.
#[derive(Debug, Clone, Default)]
pub struct RegionTool {
    anchor: Option<Point>,
    current: Option<Region>,
}

impl RegionTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.anchor.is_some()
    }

    /// The rectangle being dragged, if any.
    pub fn current(&self) -> Option<Region> {
        self.current
    }

    /// Feed one pointer event. Returns the updated region while dragging
    /// and the final region on release.
    pub fn handle(&mut self, event: PointerEvent, engine: &CoordEngine) -> Option<Region> {
        match event {
            PointerEvent::Down { x, y } => {
                let at = engine.screen_to_image(x, y)?;
                self.anchor = Some(at);
                self.current = None;
                None
            }
            PointerEvent::Move { x, y } => {
                let anchor = self.anchor?;
                let at = clamped_image_point(engine, x, y)?;
                let region = Region::from_corners(anchor, at);
                self.current = Some(region);
                Some(region)
            }
            PointerEvent::Up { x, y } => {
                let anchor = self.anchor.take()?;
                self.current = None;
                let at = clamped_image_point(engine, x, y)?;
                let region = Region::from_corners(anchor, at);
                (!region.is_empty()).then_some(region)
            }
            PointerEvent::Leave => {
                self.cancel();
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        self.anchor = None;
        self.current = None;
    }
}

/// Like `screen_to_image`, but pinned to the image edge instead of
/// rejecting points outside it.
fn clamped_image_point(engine: &CoordEngine, client_x: f64, client_y: f64) -> Option<Point> {
    let natural: Size = engine.natural_size()?;
    let (sx, sy) = engine.scale();
    let viewport = engine.viewport();
    let scroll = engine.scroll();
    let x = ((client_x - viewport.left + scroll.x) / sx).round();
    let y = ((client_y - viewport.top + scroll.y) / sy).round();
    Some(Point {
        x: x.clamp(0.0, natural.width),
        y: y.clamp(0.0, natural.height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iiif_core::config::ZoomConfig;
    use iiif_core::viewport::Viewport;

    fn engine() -> CoordEngine {
        let mut e = CoordEngine::new(400.0, ZoomConfig::default());
        e.set_viewport(Viewport {
            left: 100.0,
            top: 50.0,
            width: 400.0,
            height: 300.0,
        });
        // Scale 0.5: one screen px is two image px.
        e.load_image(Size::new(800.0, 600.0));
        e
    }

    #[test]
    fn drag_reports_image_region() {
        let e = engine();
        let mut tool = RegionTool::new();
        assert_eq!(tool.handle(PointerEvent::Down { x: 110.0, y: 60.0 }, &e), None);
        assert!(tool.is_drawing());
        assert_eq!(
            tool.handle(PointerEvent::Move { x: 160.0, y: 85.0 }, &e),
            Some(Region::new(20.0, 20.0, 100.0, 50.0))
        );
        assert_eq!(
            tool.handle(PointerEvent::Up { x: 160.0, y: 85.0 }, &e),
            Some(Region::new(20.0, 20.0, 100.0, 50.0))
        );
        assert!(!tool.is_drawing());
    }

    #[test]
    fn drag_past_the_edge_is_clamped() {
        let e = engine();
        let mut tool = RegionTool::new();
        tool.handle(PointerEvent::Down { x: 400.0, y: 300.0 }, &e);
        let region = tool.handle(PointerEvent::Up { x: 900.0, y: 900.0 }, &e).unwrap();
        assert_eq!(region, Region::new(600.0, 500.0, 200.0, 100.0));
    }

    #[test]
    fn click_without_drag_draws_nothing() {
        let e = engine();
        let mut tool = RegionTool::new();
        tool.handle(PointerEvent::Down { x: 110.0, y: 60.0 }, &e);
        assert_eq!(tool.handle(PointerEvent::Up { x: 110.0, y: 60.0 }, &e), None);
    }
}
