//! Canvas2D overlay renderer.
//!
//! Draws the viewer's `OverlayFrame` onto a transparent `<canvas>` stacked
//! above the page image. Everything arrives in screen space already; this
//! module only paints.

use iiif_core::model::{Color, ScreenRect};
use iiif_editor::OverlayFrame;
use web_sys::CanvasRenderingContext2d;

/// Theme-dependent colors for the overlay.
pub struct OverlayTheme {
    pub drawing: &'static str,
    pub picker: &'static str,
    pub label_bg: &'static str,
    pub label_text: &'static str,
}

impl OverlayTheme {
    pub fn light() -> Self {
        Self {
            drawing: "#0D6EFD",
            picker: "#6F42C1",
            label_bg: "rgba(255, 255, 255, 0.85)",
            label_text: "#1D1D1F",
        }
    }

    pub fn dark() -> Self {
        Self {
            drawing: "#4FC3F7",
            picker: "#B39DDB",
            label_bg: "rgba(28, 28, 30, 0.85)",
            label_text: "#F5F5F7",
        }
    }
}

/// Paint one frame. Clears the whole canvas first.
pub fn render_overlay(
    ctx: &CanvasRenderingContext2d,
    frame: &OverlayFrame,
    canvas_width: f64,
    canvas_height: f64,
    theme: &OverlayTheme,
) {
    ctx.clear_rect(0.0, 0.0, canvas_width, canvas_height);

    for (active, rect) in &frame.active {
        draw_highlight(ctx, rect, active.color);
    }

    if let Some((draft, rect)) = &frame.draft {
        draw_highlight(ctx, rect, draft.color);
        draw_handles(ctx, rect, draft.color);
    }

    if let Some(rect) = &frame.drawing {
        draw_dashed(ctx, rect, theme.drawing);
    }

    if let Some(rect) = &frame.picker {
        draw_dashed(ctx, rect, theme.picker);
        draw_size_label(ctx, rect, theme);
    }
}

/// Translucent fill with a solid border in the annotation's color.
fn draw_highlight(ctx: &CanvasRenderingContext2d, rect: &ScreenRect, color: Color) {
    if rect.is_empty() {
        return;
    }
    ctx.save();
    ctx.set_fill_style_str(&color.to_css_rgba(0.15));
    ctx.fill_rect(rect.left, rect.top, rect.width, rect.height);
    ctx.set_stroke_style_str(&color.to_hex());
    ctx.set_line_width(2.0);
    ctx.stroke_rect(rect.left, rect.top, rect.width, rect.height);
    ctx.restore();
}

/// Corner squares on the draft so it reads as editable.
fn draw_handles(ctx: &CanvasRenderingContext2d, rect: &ScreenRect, color: Color) {
    const HANDLE: f64 = 6.0;
    let half = HANDLE / 2.0;
    let corners = [
        (rect.left, rect.top),
        (rect.left + rect.width, rect.top),
        (rect.left, rect.top + rect.height),
        (rect.left + rect.width, rect.top + rect.height),
    ];
    ctx.save();
    ctx.set_fill_style_str(&color.to_hex());
    for (cx, cy) in corners {
        ctx.fill_rect(cx - half, cy - half, HANDLE, HANDLE);
    }
    ctx.restore();
}

/// Rubber-band rectangle: faint fill, dashed border.
fn draw_dashed(ctx: &CanvasRenderingContext2d, rect: &ScreenRect, color: &str) {
    if rect.width < 1.0 && rect.height < 1.0 {
        return;
    }
    ctx.save();
    ctx.set_global_alpha(0.08);
    ctx.set_fill_style_str(color);
    ctx.fill_rect(rect.left, rect.top, rect.width, rect.height);
    ctx.set_global_alpha(1.0);

    ctx.set_stroke_style_str(color);
    ctx.set_line_width(1.0);
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &wasm_bindgen::JsValue::from_f64(4.0),
        &wasm_bindgen::JsValue::from_f64(4.0),
    ));
    ctx.stroke_rect(rect.left, rect.top, rect.width, rect.height);
    ctx.restore();
}

/// "W × H" pill under the picker rectangle, in screen pixels.
fn draw_size_label(ctx: &CanvasRenderingContext2d, rect: &ScreenRect, theme: &OverlayTheme) {
    let label = format!("{:.0} × {:.0}", rect.width, rect.height);
    ctx.save();
    ctx.set_font("11px Inter, system-ui, sans-serif");
    let text_width = ctx
        .measure_text(&label)
        .map(|m| m.width())
        .unwrap_or(label.len() as f64 * 6.0);
    let (pad, height) = (4.0, 16.0);
    let x = rect.left;
    let y = rect.top + rect.height + 4.0;

    ctx.set_fill_style_str(theme.label_bg);
    ctx.fill_rect(x, y, text_width + pad * 2.0, height);
    ctx.set_fill_style_str(theme.label_text);
    ctx.set_text_baseline("middle");
    let _ = ctx.fill_text(&label, x + pad, y + height / 2.0);
    ctx.restore();
}
