//! Coordinate engine: image space ↔ screen space.
//!
//! The image is first fitted into a square of `max_dimension` (the *base*
//! size, aspect ratio preserved), then multiplied by the zoom factor and
//! shown through a clipped, scrollable viewport. Screen rectangles are
//! relative to the viewport's top-left corner, so they already account for
//! scrolling.

use crate::config::ZoomConfig;
use crate::model::{Point, Region, ScreenRect, Size};

/// The viewport container's rectangle on screen (client coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct CoordEngine {
    zoom_config: ZoomConfig,
    max_dimension: f64,
    natural: Option<Size>,
    base: Size,
    zoom: f64,
    scroll: Point,
    viewport: Viewport,
}

impl CoordEngine {
    pub fn new(max_dimension: f64, zoom_config: ZoomConfig) -> Self {
        Self {
            zoom_config,
            max_dimension,
            natural: None,
            base: Size::default(),
            zoom: 1.0,
            scroll: Point::default(),
            viewport: Viewport::default(),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.clamp_scroll();
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Record the natural size of a freshly loaded image. Resets zoom and
    /// scroll.
    pub fn load_image(&mut self, natural: Size) {
        self.base = fit_within(natural, self.max_dimension);
        self.natural = Some(natural);
        self.zoom = 1.0;
        self.scroll = Point::default();
    }

    /// Forget the current image (canvas change before the next load).
    pub fn unload(&mut self) {
        self.natural = None;
        self.base = Size::default();
        self.zoom = 1.0;
        self.scroll = Point::default();
    }

    pub fn is_loaded(&self) -> bool {
        self.natural.is_some()
    }

    pub fn natural_size(&self) -> Option<Size> {
        self.natural
    }

    pub fn base_size(&self) -> Size {
        self.base
    }

    /// On-screen size of the whole image at the current zoom.
    pub fn display_size(&self) -> Size {
        Size::new(self.base.width * self.zoom, self.base.height * self.zoom)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn scroll(&self) -> Point {
        self.scroll
    }

    /// Screen pixels per image pixel, per axis. Identity for zero-sized
    /// images.
    pub fn scale(&self) -> (f64, f64) {
        let Some(natural) = self.natural else {
            return (1.0, 1.0);
        };
        let display = self.display_size();
        let sx = if natural.width > 0.0 {
            display.width / natural.width
        } else {
            1.0
        };
        let sy = if natural.height > 0.0 {
            display.height / natural.height
        } else {
            1.0
        };
        (sx, sy)
    }

    /// Pointer position → integer image pixel. `None` outside the image or
    /// before an image is loaded.
    pub fn screen_to_image(&self, client_x: f64, client_y: f64) -> Option<Point> {
        let natural = self.natural?;
        let (sx, sy) = self.scale();
        let x = ((client_x - self.viewport.left + self.scroll.x) / sx).round();
        let y = ((client_y - self.viewport.top + self.scroll.y) / sy).round();
        let inside = (0.0..=natural.width).contains(&x) && (0.0..=natural.height).contains(&y);
        inside.then_some(Point { x, y })
    }

    /// Image region → overlay rectangle. Empty before an image is loaded.
    pub fn image_to_screen(&self, region: &Region) -> ScreenRect {
        let Some(natural) = self.natural else {
            return ScreenRect::default();
        };
        let region = region.to_pixels(natural);
        let (sx, sy) = self.scale();
        ScreenRect {
            left: region.x * sx - self.scroll.x,
            top: region.y * sy - self.scroll.y,
            width: region.w * sx,
            height: region.h * sy,
        }
    }

    // ─── Zoom ────────────────────────────────────────────────────────────

    /// Clamp, round to two decimals, and rescale scroll offsets so the
    /// viewport center stays on the same image point. Returns the applied
    /// zoom.
    pub fn apply_zoom(&mut self, requested: f64) -> f64 {
        let clamped = requested.clamp(self.zoom_config.min, self.zoom_config.max);
        let next = (clamped * 100.0).round() / 100.0;
        if next == self.zoom {
            return next;
        }
        let ratio = next / self.zoom;
        let half_w = self.viewport.width / 2.0;
        let half_h = self.viewport.height / 2.0;
        self.scroll = Point {
            x: (self.scroll.x + half_w) * ratio - half_w,
            y: (self.scroll.y + half_h) * ratio - half_h,
        };
        self.zoom = next;
        self.clamp_scroll();
        log::debug!("zoom → {next}");
        next
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.apply_zoom(self.zoom + self.zoom_config.step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.apply_zoom(self.zoom - self.zoom_config.step)
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < self.zoom_config.max
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > self.zoom_config.min
    }

    // ─── Scrolling ───────────────────────────────────────────────────────

    pub fn max_scroll(&self) -> Point {
        let display = self.display_size();
        Point {
            x: (display.width - self.viewport.width).max(0.0),
            y: (display.height - self.viewport.height).max(0.0),
        }
    }

    pub fn set_scroll(&mut self, x: f64, y: f64) {
        self.scroll = Point { x, y };
        self.clamp_scroll();
    }

    /// Scroll by a delta, clamped to content bounds. Returns `true` if the
    /// offsets changed.
    pub fn scroll_by(&mut self, dx: f64, dy: f64) -> bool {
        let before = self.scroll;
        self.set_scroll(before.x + dx, before.y + dy);
        self.scroll != before
    }

    fn clamp_scroll(&mut self) {
        let max = self.max_scroll();
        self.scroll.x = self.scroll.x.clamp(0.0, max.x);
        self.scroll.y = self.scroll.y.clamp(0.0, max.y);
    }

    /// Which edges the pointer is near: `-1` toward left/top, `1` toward
    /// right/bottom, `0` otherwise.
    pub fn edge_direction(&self, client_x: f64, client_y: f64, margin: f64) -> (i8, i8) {
        let local_x = client_x - self.viewport.left;
        let local_y = client_y - self.viewport.top;
        let axis = |pos: f64, extent: f64| -> i8 {
            if pos < margin {
                -1
            } else if pos > extent - margin {
                1
            } else {
                0
            }
        };
        (axis(local_x, self.viewport.width), axis(local_y, self.viewport.height))
    }
}

/// Scale `natural` to fit a `max_dim` square, preserving aspect ratio.
fn fit_within(natural: Size, max_dim: f64) -> Size {
    if natural.is_empty() {
        return natural;
    }
    if natural.width >= natural.height {
        Size::new(max_dim, max_dim * natural.height / natural.width)
    } else {
        Size::new(max_dim * natural.width / natural.height, max_dim)
    }
}

// ─── Coordinate picker ───────────────────────────────────────────────────

/// Live measurement between the fixed point and the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickerReading {
    pub anchor: Point,
    pub cursor: Point,
    pub rect: Region,
    /// Signed cursor − anchor.
    pub dx: f64,
    pub dy: f64,
}

/// Diagnostic free-form coordinate picker. A click fixes the reference
/// point (replacing any previous one); movement measures against it.
#[derive(Debug, Clone, Default)]
pub struct CoordPicker {
    anchor: Option<Point>,
    cursor: Option<Point>,
}

impl CoordPicker {
    pub fn click(&mut self, at: Point) {
        self.anchor = Some(at);
        self.cursor = None;
    }

    pub fn move_to(&mut self, at: Point) -> Option<PickerReading> {
        self.cursor = Some(at);
        self.reading()
    }

    pub fn reading(&self) -> Option<PickerReading> {
        let (anchor, cursor) = (self.anchor?, self.cursor?);
        Some(PickerReading {
            anchor,
            cursor,
            rect: Region::from_corners(anchor, cursor),
            dx: cursor.x - anchor.x,
            dy: cursor.y - anchor.y,
        })
    }

    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CoordEngine {
        let mut e = CoordEngine::new(400.0, ZoomConfig::default());
        e.set_viewport(Viewport {
            left: 100.0,
            top: 50.0,
            width: 200.0,
            height: 200.0,
        });
        e.load_image(Size::new(800.0, 600.0));
        e
    }

    #[test]
    fn base_size_fits_longest_side() {
        let e = engine();
        assert_eq!(e.base_size(), Size::new(400.0, 300.0));
        assert_eq!(e.scale(), (0.5, 0.5));
    }

    #[test]
    fn unloaded_engine_is_inert() {
        let e = CoordEngine::new(400.0, ZoomConfig::default());
        assert_eq!(e.screen_to_image(10.0, 10.0), None);
        assert!(e.image_to_screen(&Region::new(0.0, 0.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn zero_sized_image_uses_identity_scale() {
        let mut e = CoordEngine::new(400.0, ZoomConfig::default());
        e.load_image(Size::new(0.0, 0.0));
        assert_eq!(e.scale(), (1.0, 1.0));
        assert_eq!(e.screen_to_image(0.0, 0.0), Some(Point { x: 0.0, y: 0.0 }));
    }

    #[test]
    fn screen_to_image_rejects_points_outside() {
        let e = engine();
        assert_eq!(e.screen_to_image(90.0, 60.0), None);
        assert_eq!(
            e.screen_to_image(110.0, 60.0),
            Some(Point { x: 20.0, y: 20.0 })
        );
    }

    #[test]
    fn transforms_roundtrip_across_zoom_levels() {
        let mut e = engine();
        let region = Region::new(123.0, 77.0, 200.0, 150.0);
        for zoom in [0.5, 0.75, 1.0, 1.5, 2.25, 3.0, 5.0] {
            e.apply_zoom(zoom);
            e.set_scroll(37.0, 12.0);
            let rect = e.image_to_screen(&region);
            let vp = e.viewport();
            if let Some(p) = e.screen_to_image(vp.left + rect.left, vp.top + rect.top) {
                assert!((p.x - region.x).abs() <= 1.0, "zoom {zoom}: x {}", p.x);
                assert!((p.y - region.y).abs() <= 1.0, "zoom {zoom}: y {}", p.y);
            }
            let (sx, sy) = e.scale();
            assert!((rect.width / sx - region.w).abs() <= 1.0);
            assert!((rect.height / sy - region.h).abs() <= 1.0);
        }
    }

    #[test]
    fn zoom_is_clamped_and_rounded() {
        let mut e = engine();
        assert_eq!(e.apply_zoom(9.0), 5.0);
        assert_eq!(e.apply_zoom(0.1), 0.5);
        assert_eq!(e.apply_zoom(1.234), 1.23);
    }

    #[test]
    fn zoom_preserves_center_symmetrically() {
        let mut e = engine();
        e.set_scroll(50.0, 20.0);
        e.apply_zoom(2.0);
        assert_eq!(e.scroll(), Point { x: 200.0, y: 140.0 });
        e.apply_zoom(1.0);
        let s = e.scroll();
        assert!((s.x - 50.0).abs() <= 1.0 && (s.y - 20.0).abs() <= 1.0);
    }

    #[test]
    fn scroll_by_stops_at_bounds() {
        let mut e = engine();
        assert!(e.scroll_by(500.0, 0.0));
        assert_eq!(e.scroll().x, 200.0);
        assert!(!e.scroll_by(10.0, 0.0));
    }

    #[test]
    fn edge_direction_detects_margins() {
        let e = engine();
        assert_eq!(e.edge_direction(105.0, 150.0, 30.0), (-1, 0));
        assert_eq!(e.edge_direction(295.0, 245.0, 30.0), (1, 1));
        assert_eq!(e.edge_direction(200.0, 150.0, 30.0), (0, 0));
    }

    #[test]
    fn picker_replaces_anchor_on_second_click() {
        let mut picker = CoordPicker::default();
        picker.click(Point { x: 10.0, y: 10.0 });
        let r = picker.move_to(Point { x: 4.0, y: 30.0 }).unwrap();
        assert_eq!(r.rect, Region::new(4.0, 10.0, 6.0, 20.0));
        assert_eq!((r.dx, r.dy), (-6.0, 20.0));

        picker.click(Point { x: 100.0, y: 100.0 });
        assert_eq!(picker.reading(), None);
        assert_eq!(picker.anchor(), Some(Point { x: 100.0, y: 100.0 }));
    }
}
