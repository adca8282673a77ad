//! Parameters of manager operations.
//!
//! Positions and sizes supplied here are UI space: origin at the page's
//! top-left corner, y growing downward. The manager converts them to
//! document space before anything touches the graph.

use std::str::FromStr;

use doc_model::{
    AnnotationKind, Color, FontFamily, FormFieldKind, PageSelector, Point, SignatureMethod, Size,
    WatermarkContent, WatermarkPosition,
};

use crate::error::EditError;

/// Options for [`crate::DocumentManager::save`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOptions {
    /// 1-based page numbers to keep, in output order. `None` keeps all.
    pub pages: Option<Vec<u32>>,
    /// Bake form field values into page content and drop the form.
    pub flatten: bool,
    /// Not implemented; requesting it fails with [`EditError::Unsupported`].
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportFormat {
    Pdf(SaveOptions),
    /// 1-based page number.
    Png { page: u32 },
    Jpeg { page: u32 },
}

impl FromStr for ExportFormat {
    type Err = EditError;

    /// Raster formats parse to page 1.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf(SaveOptions::default())),
            "png" => Ok(Self::Png { page: 1 }),
            "jpeg" | "jpg" => Ok(Self::Jpeg { page: 1 }),
            other => Err(EditError::UnsupportedFormat(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AddPageOptions {
    /// Defaults to the configured page size.
    pub size: Option<Size>,
    /// 0-based insertion index; `None` appends.
    pub position: Option<usize>,
}

/// Inclusive range of 1-based page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn single(page: u32) -> Self {
        Self { start: page, end: page }
    }

    /// Parses a comma separated list such as `1-3,5`.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, EditError> {
        value.split(',').filter(|part| !part.trim().is_empty()).map(str::parse::<PageRange>).collect()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl FromStr for PageRange {
    type Err = EditError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || EditError::InvalidArgument(format!("invalid page range: {value}"));
        let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());

        let range = match value.split_once('-') {
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => Self::single(parse(value)?),
        };
        if range.start == 0 || range.end < range.start {
            return Err(invalid());
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub content: String,
    /// Baseline origin.
    pub position: Point,
    pub font: Option<FontFamily>,
    pub font_size: Option<f32>,
    pub color: Color,
    pub rotation: f32,
    pub opacity: f32,
}

impl TextOptions {
    pub fn new(content: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            content: content.into(),
            position: Point::new(x, y),
            font: None,
            font_size: None,
            color: Color::BLACK,
            rotation: 0.0,
            opacity: 1.0,
        }
    }
}

/// Raw image bytes or a base64 `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    DataUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub source: ImageSource,
    /// Top-left corner.
    pub position: Point,
    /// Defaults to the pixel dimensions, one point per pixel.
    pub size: Option<Size>,
    pub rotation: f32,
    pub opacity: f32,
}

impl ImageOptions {
    pub fn new(source: ImageSource, x: f32, y: f32) -> Self {
        Self { source, position: Point::new(x, y), size: None, rotation: 0.0, opacity: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeInput {
    Line { from: Point, to: Point },
    Rectangle { origin: Point, size: Size },
    Ellipse { origin: Point, size: Size },
    /// Freehand or polygon path.
    Path { points: Vec<Point>, closed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingOptions {
    pub shape: ShapeInput,
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub stroke_width: f32,
    pub opacity: f32,
}

impl DrawingOptions {
    pub fn stroked(shape: ShapeInput, color: Color) -> Self {
        Self { shape, stroke: Some(color), fill: None, stroke_width: 1.0, opacity: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationOptions {
    pub kind: AnnotationKind,
    /// Top-left corner.
    pub position: Point,
    pub size: Size,
    pub color: Color,
    pub contents: Option<String>,
    pub author: Option<String>,
}

impl AnnotationOptions {
    pub fn new(kind: AnnotationKind, position: Point, size: Size) -> Self {
        Self { kind, position, size, color: Color::YELLOW, contents: None, author: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldOptions {
    pub kind: FormFieldKind,
    /// Must be unique within the document.
    pub name: String,
    pub position: Point,
    pub size: Size,
    pub default_value: Option<String>,
    pub options: Vec<String>,
    pub required: bool,
}

impl FormFieldOptions {
    pub fn new(kind: FormFieldKind, name: impl Into<String>, position: Point, size: Size) -> Self {
        Self { kind, name: name.into(), position, size, default_value: None, options: Vec::new(), required: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureOptions {
    pub image: ImageSource,
    pub position: Point,
    pub size: Size,
    pub method: SignatureMethod,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub content: WatermarkContent,
    pub pages: PageSelector,
    pub position: WatermarkPosition,
    pub rotation: f32,
    pub opacity: f32,
    /// Document-space shift applied after positioning.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl WatermarkOptions {
    pub fn text(text: impl Into<String>, font_size: f32) -> Self {
        Self {
            content: WatermarkContent::Text {
                text: text.into(),
                font: FontFamily::HelveticaBold,
                font_size,
                color: Color::GRAY,
            },
            pages: PageSelector::All,
            position: WatermarkPosition::Center,
            rotation: 0.0,
            opacity: 0.3,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Changes to a placed element. Unset fields stay as they are; fields that
/// do not apply to the element's kind are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementUpdate {
    /// New top-left corner (baseline origin for text).
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub rotation: Option<f32>,
    pub opacity: Option<f32>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    /// Text content, annotation contents or form field value.
    pub content: Option<String>,
    pub color: Option<Color>,
    pub font_size: Option<f32>,
    pub fill: Option<Color>,
    pub stroke_width: Option<f32>,
}

impl ElementUpdate {
    /// Whether anything besides the lock flag changes.
    pub fn changes_more_than_lock(&self) -> bool {
        self.position.is_some()
            || self.size.is_some()
            || self.rotation.is_some()
            || self.opacity.is_some()
            || self.visible.is_some()
            || self.content.is_some()
            || self.color.is_some()
            || self.font_size.is_some()
            || self.fill.is_some()
            || self.stroke_width.is_some()
    }
}
