use serde::{Deserialize, Serialize};

use crate::elements::{EntityId, ObjectRef, PageId};
use crate::geometry::Rect;
use crate::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Highlight,
    Underline,
    StrikeOut,
    Note,
    FreeText,
    Square,
    Circle,
    Ink,
}

impl AnnotationKind {
    /// Value of the `/Subtype` key.
    pub fn subtype(self) -> &'static str {
        match self {
            Self::Highlight => "Highlight",
            Self::Underline => "Underline",
            Self::StrikeOut => "StrikeOut",
            Self::Note => "Text",
            Self::FreeText => "FreeText",
            Self::Square => "Square",
            Self::Circle => "Circle",
            Self::Ink => "Ink",
        }
    }

    pub fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype {
            "Highlight" => Some(Self::Highlight),
            "Underline" => Some(Self::Underline),
            "StrikeOut" => Some(Self::StrikeOut),
            "Text" => Some(Self::Note),
            "FreeText" => Some(Self::FreeText),
            "Square" => Some(Self::Square),
            "Circle" => Some(Self::Circle),
            "Ink" => Some(Self::Ink),
            _ => None,
        }
    }

    /// Text markup kinds cover their rect with quad points.
    pub fn is_markup(self) -> bool {
        matches!(self, Self::Highlight | Self::Underline | Self::StrikeOut)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: EntityId,
    pub page_id: PageId,
    pub kind: AnnotationKind,
    pub rect: Rect,
    pub color: Color,
    pub contents: Option<String>,
    pub author: Option<String>,
    pub created_at: u64,
    pub modified_at: u64,
    pub z_index: u32,
    pub graph_ref: Option<ObjectRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_names_round_trip() {
        for kind in [
            AnnotationKind::Highlight,
            AnnotationKind::Underline,
            AnnotationKind::StrikeOut,
            AnnotationKind::Note,
            AnnotationKind::FreeText,
            AnnotationKind::Square,
            AnnotationKind::Circle,
            AnnotationKind::Ink,
        ] {
            assert_eq!(AnnotationKind::from_subtype(kind.subtype()), Some(kind));
        }
        assert_eq!(AnnotationKind::from_subtype("Link"), None);
    }
}
