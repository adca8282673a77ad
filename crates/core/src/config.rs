use doc_model::{FontFamily, Size};
use serde::{Deserialize, Serialize};

/// Editor-wide settings. Missing keys take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo steps kept.
    pub history_limit: usize,
    pub default_page_size: Size,
    /// UI-space distance pasted copies are shifted right and down by.
    pub paste_offset: f32,
    /// Device pixels per point for raster export.
    pub raster_scale: f32,
    pub default_font: FontFamily,
    pub default_font_size: f32,
    /// Stamped on annotations and signatures that name no author.
    pub author: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            default_page_size: Size::default(),
            paste_offset: 10.0,
            raster_scale: 2.0,
            default_font: FontFamily::Helvetica,
            default_font_size: 12.0,
            author: None,
        }
    }
}
