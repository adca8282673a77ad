//! PDF Editor Core Library
//!
//! Editing core for the PDF editor: the document manager that keeps the
//! object graph and the document model in step, edit history, selection and
//! clipboard, and the store that ties them together for a UI.

mod config;
mod document_manager;
mod elements;
mod error;
mod history;
mod options;
mod page_walk;
mod pages;
mod selection;
mod store;
mod watermark;

pub use config::EditorConfig;
pub use document_manager::{DocumentManager, ManagerSnapshot, PRODUCER};
pub use error::{EditError, EditResult};
pub use history::{ActionKind, History, HistoryEntry};
pub use options::{
    AddPageOptions, AnnotationOptions, DrawingOptions, ElementUpdate, ExportFormat, FormFieldOptions, ImageOptions,
    ImageSource, PageRange, SaveOptions, ShapeInput, SignatureOptions, TextOptions, WatermarkOptions,
};
pub use selection::{Clipboard, Selection};
pub use store::{DispatchOutcome, EditorAction, EditorSnapshot, Store};

pub use pdf_engine::{DocumentSource, PdfGraph};
