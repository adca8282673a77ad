use serde::{Deserialize, Serialize};

use crate::ModelError;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
    pub const GRAY: Color = Color { r: 128, g: 128, b: 128, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(value: &str) -> Result<Self, ModelError> {
        let hex = value.trim().trim_start_matches('#');
        let channel = |index: usize| {
            hex.get(index..index + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ModelError::InvalidColor(value.to_owned()))
        };

        match hex.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(ModelError::InvalidColor(value.to_owned())),
        }
    }

    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Font families every document carries without embedding font programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesItalic,
    Courier,
}

impl FontFamily {
    pub const ALL: [FontFamily; 5] = [
        FontFamily::Helvetica,
        FontFamily::HelveticaBold,
        FontFamily::TimesRoman,
        FontFamily::TimesItalic,
        FontFamily::Courier,
    ];

    /// PostScript base font name.
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesItalic => "Times-Italic",
            Self::Courier => "Courier",
        }
    }

    pub fn from_base_font(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.base_font().eq_ignore_ascii_case(name))
    }

    /// Rough advance width of one glyph relative to the font size.
    pub fn average_advance(self) -> f32 {
        match self {
            Self::Courier => 0.6,
            Self::HelveticaBold => 0.56,
            Self::Helvetica => 0.52,
            Self::TimesRoman | Self::TimesItalic => 0.46,
        }
    }

    /// Approximate rendered width of `text` at `font_size`.
    pub fn measure(self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.average_advance()
    }
}
