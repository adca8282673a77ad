use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect};
use crate::style::{Color, FontFamily};

pub type EntityId = Uuid;
pub type PageId = Uuid;

/// Indirect object backing an entity in the serialized graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub number: u32,
    pub generation: u16,
}

impl ObjectRef {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl From<(u32, u16)> for ObjectRef {
    fn from((number, generation): (u32, u16)) -> Self {
        Self { number, generation }
    }
}

impl From<ObjectRef> for (u32, u16) {
    fn from(reference: ObjectRef) -> Self {
        (reference.number, reference.generation)
    }
}

/// Text-showing operation inside a content stream the element did not
/// create, such as text read from an opened file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentOrigin {
    pub stream: ObjectRef,
    /// Index of the `Tj`/`TJ`/`'`/`"` operation among the stream's operations.
    pub operation: usize,
}

/// Placement shared by every painted element. `x`/`y` are document space;
/// for text they name the baseline origin, for everything else the
/// bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub opacity: f32,
    pub z_index: u32,
    pub visible: bool,
    pub locked: bool,
}

impl Frame {
    pub fn new(rect: Rect, z_index: u32) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotation: 0.0,
            opacity: 1.0,
            z_index,
            visible: true,
            locked: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: FontFamily,
    pub font_size: f32,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { font: FontFamily::Helvetica, font_size: 12.0, color: Color::BLACK }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub id: EntityId,
    pub page_id: PageId,
    pub content: String,
    pub frame: Frame,
    pub style: TextStyle,
    /// Stream this element owns. Text read from a file has none until it is
    /// first edited.
    pub graph_ref: Option<ObjectRef>,
    #[serde(default)]
    pub origin: Option<ContentOrigin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub id: EntityId,
    pub page_id: PageId,
    pub frame: Frame,
    pub kind: ImageKind,
    pub data: Arc<[u8]>,
    pub graph_ref: Option<ObjectRef>,
}

/// Vector shapes in document space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawingShape {
    Line { from: Point, to: Point },
    Rectangle,
    Ellipse,
    Path { points: Vec<Point>, closed: bool },
}

impl DrawingShape {
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Self::Line { from, to } => {
                *from = from.offset(dx, dy);
                *to = to.offset(dx, dy);
            }
            Self::Path { points, .. } => {
                for point in points.iter_mut() {
                    *point = point.offset(dx, dy);
                }
            }
            Self::Rectangle | Self::Ellipse => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingElement {
    pub id: EntityId,
    pub page_id: PageId,
    pub frame: Frame,
    pub shape: DrawingShape,
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub stroke_width: f32,
    pub graph_ref: Option<ObjectRef>,
}
