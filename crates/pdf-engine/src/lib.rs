mod fonts;
mod graph;
mod images;
mod paint;
mod raster;
mod source;
mod text;

pub use fonts::{decode_win_ansi, encode_win_ansi, FontSet, StandardFont};
pub use graph::{decode_text_string, encode_text_string, rect_object, InfoFields, PdfGraph};
pub use images::{decode_data_url, embed_image, sniff_image_format, EmbeddedImage, ImageFormat};
pub use lopdf::content::Operation;
pub use lopdf::{Dictionary, Object, ObjectId};
pub use paint::{image_ops, shape_ops, text_ops, Rgb, Shape, ShapePaint, TextPaint};
pub use raster::{encode_raster, PageRasterizer, PlaceholderRasterizer, RasterFormat, RgbaImage};
pub use source::{read_source, DocumentSource};
pub use text::{ContentTextExtractor, RunOrigin, TextExtractor, TextRun};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("malformed document structure: {0}")]
    Malformed(String),
    #[error("image could not be embedded: {0}")]
    ImageEmbed(String),
    #[error("raster encoding failed: {0}")]
    Raster(#[from] image::ImageError),
}
