mod annotation;
mod document;
mod elements;
mod form;
mod geometry;
mod signature;
mod style;
mod view;
mod watermark;

use std::time::{SystemTime, UNIX_EPOCH};

pub use annotation::{Annotation, AnnotationKind};
pub use document::{Document, Entity, EntityKind, Metadata, MetadataUpdate, Page, Permissions};
pub use elements::{
    ContentOrigin, DrawingElement, DrawingShape, EntityId, Frame, ImageElement, ImageKind, ObjectRef, PageId,
    TextElement, TextStyle,
};
pub use form::{FormField, FormFieldKind};
pub use geometry::{
    next_z_index, to_document_space, to_ui_space, PageRotation, Point, Rect, Size,
};
pub use signature::{Signature, SignatureMethod};
pub use style::{Color, FontFamily};
pub use view::{apply_view_action, Tool, ViewAction, ViewState, ZoomMode};
pub use watermark::{AppliedWatermark, PageSelector, Watermark, WatermarkContent, WatermarkPosition};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i32),
    #[error("invalid page selector: {0}")]
    InvalidPageSelector(String),
    #[error("invalid color: {0}")]
    InvalidColor(String),
    #[error("unknown watermark position: {0}")]
    InvalidPosition(String),
    #[error("page not found: {0}")]
    UnknownPage(PageId),
}

/// Seconds since the Unix epoch.
pub fn now_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or(0)
}
