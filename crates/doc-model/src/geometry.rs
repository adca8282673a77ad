//! Coordinate spaces and stacking order.
//!
//! UI space has its origin at the page's top-left corner with y growing
//! downward. Document space has its origin at the bottom-left corner with y
//! growing upward. Both use the same unit (1/72 inch) and share the x axis.

use serde::{Deserialize, Serialize};

use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn swapped(self) -> Self {
        Self { width: self.height, height: self.width }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self { width: 612.0, height: 792.0 }
    }
}

/// Axis-aligned rectangle anchored at its bottom-left corner in document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds a document-space rectangle from a UI-space rectangle whose
    /// origin is its top-left corner.
    pub fn from_ui(origin: Point, size: Size, page_height: f32) -> Self {
        let anchor = to_document_space(origin, page_height, size.height);
        Self { x: anchor.x, y: anchor.y, width: size.width, height: size.height }
    }

    /// Top-left corner of this rectangle in UI space.
    pub fn ui_origin(&self, page_height: f32) -> Point {
        to_ui_space(Point::new(self.x, self.y), page_height, self.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.top()
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self }
    }

    /// Normalizes a rectangle given by two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self { x, y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
    }
}

/// Converts a UI-space point to document space.
///
/// `element_height` is subtracted for elements anchored at their bottom edge
/// in document space (images, boxes); pass `0.0` for baseline-anchored text.
pub fn to_document_space(ui: Point, page_height: f32, element_height: f32) -> Point {
    Point { x: ui.x, y: page_height - ui.y - element_height }
}

/// Inverse of [`to_document_space`].
pub fn to_ui_space(document: Point, page_height: f32, element_height: f32) -> Point {
    Point { x: document.x, y: page_height - document.y - element_height }
}

/// Next free stacking index on a page.
///
/// `high_water` is the largest index ever handed out on the page, so indices
/// of deleted elements are never reused.
pub fn next_z_index(existing: impl IntoIterator<Item = u32>, high_water: u32) -> u32 {
    existing.into_iter().fold(high_water, u32::max) + 1
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PageRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl PageRotation {
    /// Accepts any multiple of 90, negative values included.
    pub fn from_degrees(degrees: i32) -> Result<Self, ModelError> {
        if degrees % 90 != 0 {
            return Err(ModelError::InvalidRotation(degrees));
        }

        Ok(match degrees.rem_euclid(360) {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            _ => Self::Deg270,
        })
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn rotate_by(self, delta: PageRotation) -> Self {
        // Both operands are valid quarter turns, so the sum is too.
        Self::from_degrees(self.degrees() + delta.degrees()).unwrap_or_default()
    }

    /// Whether turning by this amount exchanges a page's width and height.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}
