use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::elements::{EntityId, ObjectRef, PageId};
use crate::geometry::{Point, Size};
use crate::style::{Color, FontFamily};
use crate::ModelError;

/// Distance kept from the page edge by corner and edge positions.
pub const WATERMARK_MARGIN: f32 = 36.0;

/// Which pages a watermark lands on. List entries are 1-based page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelector {
    #[default]
    All,
    Odd,
    Even,
    List(Vec<u32>),
}

impl PageSelector {
    /// Zero-based page indices selected in a document of `page_count` pages.
    /// Out-of-range list entries are ignored; duplicates collapse.
    pub fn resolve(&self, page_count: usize) -> Vec<usize> {
        match self {
            Self::All => (0..page_count).collect(),
            Self::Odd => (0..page_count).step_by(2).collect(),
            Self::Even => (1..page_count).step_by(2).collect(),
            Self::List(numbers) => {
                let mut indices: Vec<usize> = numbers
                    .iter()
                    .filter(|number| **number >= 1 && (**number as usize) <= page_count)
                    .map(|number| *number as usize - 1)
                    .collect();
                indices.sort_unstable();
                indices.dedup();
                indices
            }
        }
    }
}

impl FromStr for PageSelector {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "odd" => Ok(Self::Odd),
            "even" => Ok(Self::Even),
            list => {
                let numbers = list
                    .split(',')
                    .map(|part| part.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| ModelError::InvalidPageSelector(value.to_owned()))?;
                if numbers.is_empty() || numbers.contains(&0) {
                    return Err(ModelError::InvalidPageSelector(value.to_owned()));
                }
                Ok(Self::List(numbers))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WatermarkPosition {
    #[default]
    Center,
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl WatermarkPosition {
    /// Document-space bottom-left corner of a `content` box placed on a
    /// page of size `page`.
    pub fn anchor(self, page: Size, content: Size) -> Point {
        let left = WATERMARK_MARGIN;
        let center_x = (page.width - content.width) / 2.0;
        let right = page.width - WATERMARK_MARGIN - content.width;
        let bottom = WATERMARK_MARGIN;
        let center_y = (page.height - content.height) / 2.0;
        let top = page.height - WATERMARK_MARGIN - content.height;

        let (x, y) = match self {
            Self::Center => (center_x, center_y),
            Self::TopLeft => (left, top),
            Self::TopCenter => (center_x, top),
            Self::TopRight => (right, top),
            Self::CenterLeft => (left, center_y),
            Self::CenterRight => (right, center_y),
            Self::BottomLeft => (left, bottom),
            Self::BottomCenter => (center_x, bottom),
            Self::BottomRight => (right, bottom),
        };
        Point::new(x, y)
    }
}

impl FromStr for WatermarkPosition {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            value.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_ascii_lowercase();
        match normalized.as_str() {
            "center" | "middle" => Ok(Self::Center),
            "topleft" => Ok(Self::TopLeft),
            "top" | "topcenter" => Ok(Self::TopCenter),
            "topright" => Ok(Self::TopRight),
            "left" | "centerleft" => Ok(Self::CenterLeft),
            "right" | "centerright" => Ok(Self::CenterRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottom" | "bottomcenter" => Ok(Self::BottomCenter),
            "bottomright" => Ok(Self::BottomRight),
            _ => Err(ModelError::InvalidPosition(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WatermarkContent {
    Text { text: String, font: FontFamily, font_size: f32, color: Color },
    Image { data: Arc<[u8]>, width: f32, height: f32 },
}

impl WatermarkContent {
    /// Approximate box the content occupies before rotation.
    pub fn approximate_size(&self) -> Size {
        match self {
            Self::Text { text, font_size, .. } => {
                Size::new(text.chars().count() as f32 * font_size * 0.5, *font_size)
            }
            Self::Image { width, height, .. } => Size::new(*width, *height),
        }
    }
}

/// A page a watermark was painted on and the content stream holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedWatermark {
    pub page_id: PageId,
    pub graph_ref: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub id: EntityId,
    pub content: WatermarkContent,
    pub pages: PageSelector,
    pub position: WatermarkPosition,
    /// Degrees, counter-clockwise.
    pub rotation: f32,
    pub opacity: f32,
    /// Added to the anchor in document space.
    pub offset_x: f32,
    pub offset_y: f32,
    pub applied: Vec<AppliedWatermark>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_resolve_to_zero_based_indices() {
        assert_eq!(PageSelector::All.resolve(3), vec![0, 1, 2]);
        assert_eq!(PageSelector::Odd.resolve(5), vec![0, 2, 4]);
        assert_eq!(PageSelector::Even.resolve(5), vec![1, 3]);
        assert_eq!(PageSelector::List(vec![3, 1, 9, 3]).resolve(4), vec![0, 2]);
        assert!(PageSelector::Even.resolve(1).is_empty());
    }

    #[test]
    fn selector_parsing() {
        assert_eq!("ALL".parse::<PageSelector>().expect("all"), PageSelector::All);
        assert_eq!("2, 4".parse::<PageSelector>().expect("list"), PageSelector::List(vec![2, 4]));
        assert!("0".parse::<PageSelector>().is_err());
        assert!("first".parse::<PageSelector>().is_err());
    }

    #[test]
    fn position_keywords_accept_separators() {
        assert_eq!("top-right".parse::<WatermarkPosition>().expect("pos"), WatermarkPosition::TopRight);
        assert_eq!("bottom_left".parse::<WatermarkPosition>().expect("pos"), WatermarkPosition::BottomLeft);
        assert!("nowhere".parse::<WatermarkPosition>().is_err());
    }

    #[test]
    fn center_anchor_uses_text_metrics() {
        let content = WatermarkContent::Text {
            text: "DRAFT".to_owned(),
            font: FontFamily::Helvetica,
            font_size: 48.0,
            color: Color::GRAY,
        };
        let size = content.approximate_size();
        assert_eq!(size, Size::new(120.0, 48.0));

        let anchor = WatermarkPosition::Center.anchor(Size::new(612.0, 792.0), size);
        assert_eq!(anchor, Point::new(246.0, 372.0));

        let corner = WatermarkPosition::TopRight.anchor(Size::new(612.0, 792.0), size);
        assert_eq!(corner, Point::new(456.0, 708.0));
    }
}
