//! Viewer configuration.
//!
//! The host page may pass a partial JSON object; missing keys keep their
//! defaults.

use crate::model::{Color, Region};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 5.0,
            step: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoScrollConfig {
    /// Distance from the viewport edge (CSS px) that triggers scrolling.
    pub margin: f64,
    /// Scroll distance per tick (CSS px).
    pub speed: f64,
    pub interval_ms: u32,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        Self {
            margin: 30.0,
            speed: 10.0,
            interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Longest side of the image at zoom 1.0 (CSS px).
    pub max_dimension: f64,
    pub zoom: ZoomConfig,
    pub auto_scroll: AutoScrollConfig,
    pub zoom_repeat_ms: u32,
    /// How long the delete button stays armed.
    pub delete_arm_ms: u64,
    /// Draft seed when entering add mode.
    pub default_region: Region,
    /// Hosts treated as same-machine; only these get remote persistence.
    pub local_hosts: Vec<String>,
    /// Base URL of the `/create`, `/edit`, `/delete` endpoints.
    pub persistence_base: String,
    pub add_color: Color,
    pub edit_color: Color,
    pub delete_color: Color,
    pub highlight_palette: Vec<Color>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_dimension: 400.0,
            zoom: ZoomConfig::default(),
            auto_scroll: AutoScrollConfig::default(),
            zoom_repeat_ms: 100,
            delete_arm_ms: 2000,
            default_region: Region::new(0.0, 0.0, 100.0, 100.0),
            local_hosts: vec![
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                "[::1]".to_string(),
            ],
            persistence_base: "http://localhost:8080/api/v1/annotations".to_string(),
            add_color: Color::rgb(0x28, 0xA7, 0x45),
            edit_color: Color::rgb(0xFD, 0x7E, 0x14),
            delete_color: Color::rgb(0xDC, 0x35, 0x45),
            highlight_palette: vec![
                Color::rgb(0x00, 0x7B, 0xFF),
                Color::rgb(0x6F, 0x42, 0xC1),
                Color::rgb(0xE8, 0x3E, 0x8C),
                Color::rgb(0x17, 0xA2, 0xB8),
                Color::rgb(0xFF, 0xC1, 0x07),
            ],
        }
    }
}

impl ViewerConfig {
    /// Parse a partial JSON config.
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Palette color for the n-th active annotation.
    pub fn highlight(&self, n: usize) -> Color {
        match self.highlight_palette.len() {
            0 => self.add_color,
            len => self.highlight_palette[n % len],
        }
    }
}
