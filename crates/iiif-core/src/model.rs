//! Core data model for the annotator.
//!
//! Geometry lives in two spaces: *image space* (natural pixels of the canvas
//! image, what `xywh=` selectors encode) and *screen space* (CSS pixels
//! relative to the viewport's top-left corner, what overlays are drawn in).
//! `Region` is always image space, `ScreenRect` always screen space.

use crate::id::AnnotationId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize, len: usize| -> Option<u8> {
            let v = u8::from_str_radix(hex.get(i..i + len)?, 16).ok()?;
            Some(if len == 1 { v * 17 } else { v })
        };
        match hex.len() {
            3 => Some(Self::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            6 => Some(Self::rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
            8 => Some(Self {
                r: channel(0, 2)?,
                g: channel(2, 2)?,
                b: channel(4, 2)?,
                a: channel(6, 2)?,
            }),
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// CSS `rgba()` with an overridden alpha, for translucent fills.
    pub fn to_css_rgba(&self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("bad color `{s}`")))
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Unit of an `xywh=` media fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionUnit {
    #[default]
    Pixel,
    Percent,
}

/// A rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default, skip_serializing_if = "is_pixel")]
    pub unit: RegionUnit,
}

fn is_pixel(unit: &RegionUnit) -> bool {
    *unit == RegionUnit::Pixel
}

impl Region {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            unit: RegionUnit::Pixel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    /// Resolve percent regions against the image size.
    pub fn to_pixels(&self, image: Size) -> Region {
        match self.unit {
            RegionUnit::Pixel => *self,
            RegionUnit::Percent => Region::new(
                self.x * image.width / 100.0,
                self.y * image.height / 100.0,
                self.w * image.width / 100.0,
                self.h * image.height / 100.0,
            ),
        }
    }

    /// Normalized rectangle spanning two corner points.
    pub fn from_corners(a: Point, b: Point) -> Region {
        Region::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (b.x - a.x).abs(),
            (b.y - a.y).abs(),
        )
    }

    /// `xywh=` fragment value for this region.
    pub fn to_fragment(&self) -> String {
        let prefix = match self.unit {
            RegionUnit::Pixel => "",
            RegionUnit::Percent => "percent:",
        };
        format!(
            "xywh={prefix}{},{},{},{}",
            fmt_num(self.x),
            fmt_num(self.y),
            fmt_num(self.w),
            fmt_num(self.h)
        )
    }
}

/// Integral values print without a fractional part.
fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A rectangle in screen space, relative to the viewport's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

// ─── Motivation ──────────────────────────────────────────────────────────

/// W3C Web Annotation motivations, plus anything else found in the wild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Motivation {
    Assessing,
    Bookmarking,
    Classifying,
    #[default]
    Commenting,
    Describing,
    Editing,
    Highlighting,
    Identifying,
    Linking,
    Moderating,
    Painting,
    Questioning,
    Replying,
    Tagging,
    Other(String),
}

impl Motivation {
    /// Parse a motivation tag, tolerating `oa:` / `sc:` prefixes.
    pub fn parse(tag: &str) -> Self {
        let bare = tag
            .trim()
            .trim_start_matches("oa:")
            .trim_start_matches("sc:");
        match bare.to_ascii_lowercase().as_str() {
            "assessing" => Self::Assessing,
            "bookmarking" => Self::Bookmarking,
            "classifying" => Self::Classifying,
            "commenting" => Self::Commenting,
            "describing" => Self::Describing,
            "editing" => Self::Editing,
            "highlighting" => Self::Highlighting,
            "identifying" => Self::Identifying,
            "linking" => Self::Linking,
            "moderating" => Self::Moderating,
            "painting" => Self::Painting,
            "questioning" => Self::Questioning,
            "replying" => Self::Replying,
            "tagging" => Self::Tagging,
            _ => Self::Other(bare.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Assessing => "assessing",
            Self::Bookmarking => "bookmarking",
            Self::Classifying => "classifying",
            Self::Commenting => "commenting",
            Self::Describing => "describing",
            Self::Editing => "editing",
            Self::Highlighting => "highlighting",
            Self::Identifying => "identifying",
            Self::Linking => "linking",
            Self::Moderating => "moderating",
            Self::Painting => "painting",
            Self::Questioning => "questioning",
            Self::Replying => "replying",
            Self::Tagging => "tagging",
            Self::Other(s) => s,
        }
    }

    /// Tag as written into v2 (Open Annotation) documents.
    pub fn to_oa(&self) -> String {
        match self {
            Self::Painting => "sc:painting".to_string(),
            Self::Other(s) => s.clone(),
            other => format!("oa:{}", other.as_str()),
        }
    }
}

impl fmt::Display for Motivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Motivation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Motivation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Motivation::parse(&s))
    }
}

// ─── Overlay state ───────────────────────────────────────────────────────

/// An annotation currently highlighted in the image overlay. UI-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAnnotation {
    pub id: AnnotationId,
    pub region: Region,
    pub color: Color,
}

/// The provisional rectangle shown while composing an add or edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DraftRect {
    pub region: Region,
    pub color: Color,
}
