//! Document Manager
//!
//! Owns the working PDF graph and the editable [`Document`] model that
//! mirrors it. Every mutation goes through this type so the two never
//! drift apart: operations validate first, then run against copies of
//! both representations that replace the live ones only when the whole
//! operation succeeded.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use doc_model::{now_timestamp, Document, FontFamily, FormFieldKind, Metadata, MetadataUpdate, Page, Size};
use pdf_engine::{
    encode_raster, encode_win_ansi, read_source, text_ops, ContentTextExtractor, DocumentSource,
    InfoFields, PageRasterizer, PageSize, PdfGraph, PlaceholderRasterizer, RasterFormat, Rgb,
    TextExtractor, TextPaint,
};

use crate::config::EditorConfig;
use crate::elements::standard_font;
use crate::error::{EditError, EditResult};
use crate::options::{ExportFormat, SaveOptions};
use crate::page_walk;

/// Written to `/Producer` of documents created here.
pub const PRODUCER: &str = concat!("pdf-editor ", env!("CARGO_PKG_VERSION"));

const UNTITLED: &str = "Untitled.pdf";

/// The open document: working graph, the graph as first opened, and the
/// model kept in sync with the working graph.
struct Session {
    graph: PdfGraph,
    original: Arc<PdfGraph>,
    document: Document,
}

/// Immutable copy of the manager state, restorable with
/// [`DocumentManager::restore`].
#[derive(Debug, Clone)]
pub struct ManagerSnapshot {
    graph: PdfGraph,
    document: Document,
}

impl ManagerSnapshot {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn graph(&self) -> &PdfGraph {
        &self.graph
    }
}

pub struct DocumentManager {
    config: EditorConfig,
    extractor: Box<dyn TextExtractor>,
    rasterizer: Box<dyn PageRasterizer>,
    session: Option<Session>,
}

impl DocumentManager {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_collaborators(config, Box::new(ContentTextExtractor), Box::new(PlaceholderRasterizer))
    }

    /// Uses the given text extraction and rendering services instead of the
    /// built-in ones.
    pub fn with_collaborators(
        config: EditorConfig,
        extractor: Box<dyn TextExtractor>,
        rasterizer: Box<dyn PageRasterizer>,
    ) -> Self {
        Self { config, extractor, rasterizer, session: None }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        self.session.as_ref().map(|session| &session.document)
    }

    pub fn graph(&self) -> Option<&PdfGraph> {
        self.session.as_ref().map(|session| &session.graph)
    }

    pub fn require_document(&self) -> EditResult<&Document> {
        self.document().ok_or(EditError::NotLoaded)
    }

    pub(crate) fn require_graph(&self) -> EditResult<&PdfGraph> {
        self.graph().ok_or(EditError::NotLoaded)
    }

    pub(crate) fn extractor(&self) -> &dyn TextExtractor {
        self.extractor.as_ref()
    }

    /// Opens a document from a file, URL or byte buffer, replacing any
    /// document that was open.
    pub fn load(&mut self, source: impl Into<DocumentSource>) -> EditResult<&Document> {
        let source = source.into();
        let name = source.display_name();
        let load_error = |source| EditError::Load { name: name.clone(), source };

        let bytes = read_source(source).map_err(load_error)?;
        let mut graph = PdfGraph::decode(&bytes).map_err(load_error)?;
        let original = PdfGraph::decode(&bytes).map_err(load_error)?;
        graph.embed_standard_fonts();

        let pages = page_walk::walk_pages(&graph, self.extractor.as_ref())?;
        let metadata = metadata_from_info(&graph.info(), pages.len());
        let document = Document::new(name, pages, metadata);
        log::info!(
            "loaded {} ({} pages, {} bytes)",
            document.name,
            document.page_count(),
            bytes.len()
        );

        Ok(&self.session.insert(Session { graph, original: Arc::new(original), document }).document)
    }

    /// Starts an empty document of `page_count` blank pages of the
    /// configured default size.
    pub fn create_new(&mut self, page_count: usize) -> EditResult<&Document> {
        if page_count == 0 {
            return Err(EditError::InvalidArgument("a document needs at least one page".to_owned()));
        }

        let size = self.config.default_page_size;
        let mut graph = PdfGraph::blank(page_count, page_size(size))?;
        graph.embed_standard_fonts();

        let now = now_timestamp();
        graph.set_info("Producer", PRODUCER)?;
        graph.set_info("CreationDate", &pdf_date(now))?;
        graph.set_info("ModDate", &pdf_date(now))?;
        if let Some(author) = &self.config.author {
            graph.set_info("Author", author)?;
        }

        let metadata = Metadata {
            author: self.config.author.clone(),
            producer: Some(PRODUCER.to_owned()),
            created_at: Some(now),
            modified_at: Some(now),
            page_count,
            ..Metadata::default()
        };
        let pages = (0..page_count).map(|_| Page::new(0, size)).collect();
        let document = Document::new(UNTITLED, pages, metadata);
        log::info!("created new document with {page_count} page(s)");

        let original = Arc::new(graph.clone());
        Ok(&self.session.insert(Session { graph, original, document }).document)
    }

    /// Serializes the working graph, honoring page subsets and form
    /// flattening. Clears the dirty flag.
    pub fn save(&mut self, options: &SaveOptions) -> EditResult<Vec<u8>> {
        if options.password.is_some() {
            return Err(EditError::Unsupported("password protection"));
        }
        let session = self.session.as_mut().ok_or(EditError::NotLoaded)?;

        let indices = match &options.pages {
            Some(numbers) => Some(page_indices(numbers, session.document.page_count())?),
            None => None,
        };

        let mut graph = session.graph.clone();
        if options.flatten {
            flatten_form(&mut graph, &session.document)?;
        }
        graph.set_info("ModDate", &pdf_date(now_timestamp()))?;
        if let Some(indices) = indices {
            graph = graph.subset(&indices)?;
        }

        let bytes = graph.encode()?;
        session.document.dirty = false;
        log::info!("saved {} ({} bytes)", session.document.name, bytes.len());
        Ok(bytes)
    }

    pub fn export_document(&mut self, format: &ExportFormat) -> EditResult<Vec<u8>> {
        let (page, raster) = match format {
            ExportFormat::Pdf(options) => return self.save(options),
            ExportFormat::Png { page } => (*page, RasterFormat::Png),
            ExportFormat::Jpeg { page } => (*page, RasterFormat::Jpeg),
        };

        let graph = self.require_graph()?;
        let index = page_indices(&[page], graph.page_count())?[0];
        let image = self.rasterizer.render(graph, index, self.config.raster_scale)?;
        log::debug!("rendered page {page} at {}x{}", image.width(), image.height());
        Ok(encode_raster(&image, raster)?)
    }

    /// Writes the provided fields into the document information dictionary
    /// and the model. Fields left `None` keep their values.
    pub fn set_metadata(&mut self, update: &MetadataUpdate) -> EditResult<Metadata> {
        self.transact(|graph, document, _| {
            let now = now_timestamp();
            let fields = [
                ("Title", &update.title),
                ("Author", &update.author),
                ("Subject", &update.subject),
                ("Keywords", &update.keywords),
                ("Creator", &update.creator),
                ("Producer", &update.producer),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    graph.set_info(key, value)?;
                }
            }
            graph.set_info("ModDate", &pdf_date(now))?;

            document.metadata.apply(update);
            document.metadata.modified_at = Some(now);
            document.mark_dirty();
            Ok(document.metadata.clone())
        })
    }

    /// Discards every edit by going back to the graph as it was first
    /// opened or created.
    pub fn restore_original(&mut self) -> EditResult<&Document> {
        let session = self.session.as_ref().ok_or(EditError::NotLoaded)?;
        let graph = (*session.original).clone();
        let pages = page_walk::walk_pages(&graph, self.extractor.as_ref())?;

        let mut document = session.document.clone();
        document.pages = pages;
        document.signatures.clear();
        document.watermarks.clear();
        document.metadata = Metadata {
            permissions: document.metadata.permissions,
            ..metadata_from_info(&graph.info(), document.pages.len())
        };
        document.renumber();
        document.mark_dirty();
        log::info!("restored {} to its original state", document.name);

        let session = self.session.as_mut().ok_or(EditError::NotLoaded)?;
        session.graph = graph;
        session.document = document;
        Ok(&session.document)
    }

    pub fn snapshot(&self) -> EditResult<ManagerSnapshot> {
        let session = self.session.as_ref().ok_or(EditError::NotLoaded)?;
        Ok(ManagerSnapshot { graph: session.graph.clone(), document: session.document.clone() })
    }

    /// Puts the graph and model back to a snapshot. The document counts as
    /// changed afterwards.
    pub fn restore(&mut self, snapshot: &ManagerSnapshot) -> EditResult<&Document> {
        let session = self.session.as_mut().ok_or(EditError::NotLoaded)?;
        session.graph = snapshot.graph.clone();
        session.document = snapshot.document.clone();
        session.document.mark_dirty();
        Ok(&session.document)
    }

    /// Runs `op` against copies of the graph and model; the copies replace
    /// the live state only if `op` succeeds.
    pub(crate) fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut PdfGraph, &mut Document, &EditorConfig) -> EditResult<T>,
    ) -> EditResult<T> {
        let session = self.session.as_mut().ok_or(EditError::NotLoaded)?;
        let mut graph = session.graph.clone();
        let mut document = session.document.clone();

        let value = op(&mut graph, &mut document, &self.config)?;
        session.graph = graph;
        session.document = document;
        Ok(value)
    }

    /// Swaps in state built outside [`Self::transact`].
    pub(crate) fn commit(&mut self, graph: PdfGraph, document: Document) -> EditResult<()> {
        let session = self.session.as_mut().ok_or(EditError::NotLoaded)?;
        session.graph = graph;
        session.document = document;
        Ok(())
    }
}

pub(crate) fn page_size(size: Size) -> PageSize {
    PageSize { width_pt: size.width, height_pt: size.height }
}

/// Validates 1-based page numbers and converts them to graph indices.
pub(crate) fn page_indices(numbers: &[u32], page_count: usize) -> EditResult<Vec<usize>> {
    if numbers.is_empty() {
        return Err(EditError::InvalidArgument("no pages selected".to_owned()));
    }
    numbers
        .iter()
        .map(|number| match *number as usize {
            n if n >= 1 && n <= page_count => Ok(n - 1),
            _ => Err(EditError::InvalidArgument(format!(
                "page {number} is out of range (document has {page_count} pages)"
            ))),
        })
        .collect()
}

pub(crate) fn metadata_from_info(info: &InfoFields, page_count: usize) -> Metadata {
    Metadata {
        title: info.title.clone(),
        author: info.author.clone(),
        subject: info.subject.clone(),
        keywords: info.keywords.clone(),
        creator: info.creator.clone(),
        producer: info.producer.clone(),
        created_at: info.creation_date.as_deref().and_then(parse_pdf_date),
        modified_at: info.mod_date.as_deref().and_then(parse_pdf_date),
        page_count,
        ..Metadata::default()
    }
}

/// Formats seconds since the epoch as a PDF date string in UTC.
pub(crate) fn pdf_date(seconds: u64) -> String {
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .unwrap_or_default()
        .format("D:%Y%m%d%H%M%SZ")
        .to_string()
}

/// Parses the date part of a PDF date string. Missing trailing components
/// default to the start of their period; the UTC offset is ignored.
pub(crate) fn parse_pdf_date(value: &str) -> Option<u64> {
    const TEMPLATE: &str = "00000101000000";
    let digits: String = value
        .trim()
        .trim_start_matches("D:")
        .chars()
        .take_while(char::is_ascii_digit)
        .take(TEMPLATE.len())
        .collect();
    if digits.len() < 4 {
        return None;
    }

    let padded = format!("{digits}{}", &TEMPLATE[digits.len()..]);
    let parsed = NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S").ok()?;
    u64::try_from(parsed.and_utc().timestamp()).ok()
}

/// Paints every form field's value as static text, then drops the form.
fn flatten_form(graph: &mut PdfGraph, document: &Document) -> EditResult<()> {
    for field in document.form_fields() {
        let Some(value) = field.default_value.as_deref().filter(|value| !value.is_empty()) else {
            continue;
        };
        let Some(index) = document.page_index(field.page_id) else {
            continue;
        };

        let text = match field.kind {
            FormFieldKind::Checkbox | FormFieldKind::Radio if is_checked(value) => "X",
            FormFieldKind::Checkbox | FormFieldKind::Radio => continue,
            FormFieldKind::Text | FormFieldKind::Dropdown => value,
        };
        let font_size = (field.rect.height * 0.7).clamp(4.0, 12.0);
        let font_resource = graph.font_resource(index, standard_font(FontFamily::Helvetica))?;
        let ops = text_ops(&TextPaint {
            font_resource,
            font_size,
            color: Rgb::BLACK,
            x: field.rect.x + 2.0,
            y: field.rect.y + (field.rect.height - font_size) / 2.0 + font_size * 0.2,
            rotation: 0.0,
            text: encode_win_ansi(text),
            ext_gstate: None,
        });
        graph.append_content(index, ops)?;
    }

    graph.strip_form()?;
    Ok(())
}

/// Button values that mean "on".
pub(crate) fn is_checked(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "yes" | "on" | "true" | "1" | "x" | "checked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{PageRotation, Point};
    use pdf_engine::{ContentTextExtractor, TextExtractor};

    use crate::options::{FormFieldOptions, TextOptions};

    fn manager_with(pages: usize) -> DocumentManager {
        let mut manager = DocumentManager::new(EditorConfig::default());
        manager.create_new(pages).expect("document created");
        manager
    }

    #[test]
    fn operations_need_a_document() {
        let mut manager = DocumentManager::new(EditorConfig::default());
        assert!(matches!(manager.save(&SaveOptions::default()), Err(EditError::NotLoaded)));
        assert!(matches!(manager.snapshot(), Err(EditError::NotLoaded)));
        assert!(manager.document().is_none());
    }

    #[test]
    fn create_new_numbers_pages_and_stamps_metadata() {
        let manager = manager_with(3);
        let document = manager.document().expect("document");
        assert_eq!(document.page_count(), 3);
        assert_eq!(document.pages.iter().map(|page| page.number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(document.metadata.page_count, 3);
        assert_eq!(document.metadata.producer.as_deref(), Some(PRODUCER));
        assert!(document.metadata.created_at.is_some());
        assert!(!document.dirty);
    }

    #[test]
    fn zero_pages_is_rejected() {
        let mut manager = DocumentManager::new(EditorConfig::default());
        assert!(matches!(manager.create_new(0), Err(EditError::InvalidArgument(_))));
    }

    #[test]
    fn garbage_fails_with_load_error() {
        let mut manager = DocumentManager::new(EditorConfig::default());
        let err = manager.load(b"not a pdf".to_vec()).expect_err("garbage rejected");
        assert!(matches!(err, EditError::Load { ref name, .. } if name == "Untitled.pdf"));
        assert!(!manager.is_loaded());
    }

    #[test]
    fn save_and_reload_preserves_pages() {
        let mut manager = manager_with(2);
        let bytes = manager.save(&SaveOptions::default()).expect("save");

        let mut reloaded = DocumentManager::new(EditorConfig::default());
        let document = reloaded.load(bytes).expect("reload");
        assert_eq!(document.page_count(), 2);
        assert_eq!(document.pages[0].size(), Size::new(612.0, 792.0));
        assert_eq!(document.metadata.producer.as_deref(), Some(PRODUCER));
    }

    #[test]
    fn save_subset_keeps_requested_pages() {
        let mut manager = manager_with(3);
        let options = SaveOptions { pages: Some(vec![3, 1]), ..SaveOptions::default() };
        let bytes = manager.save(&options).expect("save subset");
        let graph = PdfGraph::decode(&bytes).expect("decode");
        assert_eq!(graph.page_count(), 2);

        let options = SaveOptions { pages: Some(vec![4]), ..SaveOptions::default() };
        assert!(matches!(manager.save(&options), Err(EditError::InvalidArgument(_))));
    }

    #[test]
    fn password_protection_is_unsupported() {
        let mut manager = manager_with(1);
        let options = SaveOptions { password: Some("secret".to_owned()), ..SaveOptions::default() };
        assert!(matches!(manager.save(&options), Err(EditError::Unsupported(_))));
    }

    #[test]
    fn save_clears_dirty_flag() {
        let mut manager = manager_with(1);
        let page_id = manager.document().expect("document").pages[0].id;
        manager.add_text(page_id, TextOptions::new("Hi", 10.0, 10.0)).expect("text");
        assert!(manager.document().expect("document").dirty);

        manager.save(&SaveOptions::default()).expect("save");
        assert!(!manager.document().expect("document").dirty);
    }

    #[test]
    fn flatten_bakes_field_values_and_drops_the_form() {
        let mut manager = manager_with(1);
        let page_id = manager.document().expect("document").pages[0].id;
        let mut field =
            FormFieldOptions::new(FormFieldKind::Text, "name", Point::new(72.0, 72.0), Size::new(200.0, 20.0));
        field.default_value = Some("Grace".to_owned());
        manager.add_form_field(page_id, field).expect("field");

        let options = SaveOptions { flatten: true, ..SaveOptions::default() };
        let graph = PdfGraph::decode(&manager.save(&options).expect("save")).expect("decode");
        assert!(graph.field_ids().is_empty());
        let runs = ContentTextExtractor.text_runs(&graph, 0).expect("runs");
        assert!(runs.iter().any(|run| run.text == "Grace"));
    }

    #[test]
    fn metadata_updates_only_touch_given_fields() {
        let mut manager = manager_with(1);
        let update = MetadataUpdate { title: Some("Report".to_owned()), ..MetadataUpdate::default() };
        let metadata = manager.set_metadata(&update).expect("metadata");
        assert_eq!(metadata.title.as_deref(), Some("Report"));
        assert_eq!(metadata.producer.as_deref(), Some(PRODUCER));

        let info = manager.graph().expect("graph").info();
        assert_eq!(info.title.as_deref(), Some("Report"));
        assert!(manager.document().expect("document").dirty);
    }

    #[test]
    fn restore_original_discards_edits() {
        let mut manager = manager_with(1);
        let page_id = manager.document().expect("document").pages[0].id;
        manager.add_text(page_id, TextOptions::new("Scratch", 10.0, 10.0)).expect("text");
        manager.rotate_page(page_id, 90).expect("rotate");

        let document = manager.restore_original().expect("restore");
        assert_eq!(document.pages[0].element_count(), 0);
        assert_eq!(document.pages[0].rotation, PageRotation::Deg0);
        assert_eq!(manager.graph().expect("graph").rotation(0).expect("rotation"), 0);
    }

    #[test]
    fn snapshots_restore_graph_and_model() {
        let mut manager = manager_with(1);
        let snapshot = manager.snapshot().expect("snapshot");
        manager.add_page(Default::default()).expect("page");
        assert_eq!(manager.graph().expect("graph").page_count(), 2);

        manager.restore(&snapshot).expect("restore");
        assert_eq!(manager.graph().expect("graph").page_count(), 1);
        assert_eq!(manager.document().expect("document").page_count(), 1);
    }

    #[test]
    fn raster_export_uses_configured_scale() {
        let mut manager = manager_with(1);
        let png = manager.export_document(&ExportFormat::Png { page: 1 }).expect("png");
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(matches!(
            manager.export_document(&ExportFormat::Jpeg { page: 2 }),
            Err(EditError::InvalidArgument(_))
        ));
    }

    #[test]
    fn pdf_dates_round_trip() {
        let seconds = 1_700_000_000;
        assert_eq!(pdf_date(seconds), "D:20231114221320Z");
        assert_eq!(parse_pdf_date(&pdf_date(seconds)), Some(seconds));
        assert_eq!(parse_pdf_date("D:2024"), parse_pdf_date("D:20240101000000+01'00'"));
        assert_eq!(parse_pdf_date("yesterday"), None);
    }
}
