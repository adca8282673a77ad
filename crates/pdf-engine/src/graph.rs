use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::fonts::{FontSet, StandardFont};
use crate::images::{embed_image, EmbeddedImage};
use crate::{CodecError, PageSize};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&str; 4] = ["MediaBox", "Resources", "CropBox", "Rotate"];

/// Text fields of the document information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
}

/// A mutable PDF object graph with a flat page tree: every page is a direct
/// kid of the root `Pages` node and carries its inheritable attributes itself.
#[derive(Debug, Clone)]
pub struct PdfGraph {
    doc: Document,
    pages_root: ObjectId,
    fonts: FontSet,
}

impl PdfGraph {
    pub fn blank(page_count: usize, size: PageSize) -> Result<Self, CodecError> {
        let mut doc = Document::with_version("1.7");
        let pages_root = doc.new_object_id();
        doc.objects.insert(
            pages_root,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_root,
        });
        doc.trailer.set("Root", catalog);

        let mut graph = Self { doc, pages_root, fonts: FontSet::default() };
        for index in 0..page_count {
            graph.insert_page(index, size)?;
        }
        Ok(graph)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(_) if trailer_declares_encryption(bytes) => return Err(CodecError::EncryptedUnsupported),
            Err(err) => return Err(err.into()),
        };
        if doc.trailer.has(b"Encrypt") {
            return Err(CodecError::EncryptedUnsupported);
        }

        let pages_root = flatten_page_tree(&mut doc)?;
        log::debug!("decoded graph with {} objects, max id {}", doc.objects.len(), doc.max_id);
        Ok(Self { doc, pages_root, fonts: FontSet::default() })
    }

    /// Serializes a pruned copy of the graph.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut doc = self.doc.clone();
        doc.prune_objects();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn dictionary(&self, id: ObjectId) -> Option<&Dictionary> {
        self.doc.get_dictionary(id).ok()
    }

    /// Follows a reference if `object` is one.
    pub fn resolve_dictionary<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        match object {
            Object::Reference(id) => self.dictionary(*id),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    // --- pages -------------------------------------------------------------

    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc
            .get_dictionary(self.pages_root)
            .and_then(|root| root.get(b"Kids"))
            .and_then(Object::as_array)
            .map(|kids| kids.iter().filter_map(|kid| kid.as_reference().ok()).collect())
            .unwrap_or_default()
    }

    pub fn page_count(&self) -> usize {
        self.page_ids().len()
    }

    pub fn page_id(&self, index: usize) -> Result<ObjectId, CodecError> {
        let ids = self.page_ids();
        ids.get(index)
            .copied()
            .ok_or(CodecError::PageOutOfRange { page: index, page_count: ids.len() })
    }

    fn page_dict(&self, index: usize) -> Result<&Dictionary, CodecError> {
        Ok(self.doc.get_dictionary(self.page_id(index)?)?)
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, CodecError> {
        Ok(self.doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?)
    }

    /// MediaBox extent, unaffected by `/Rotate`.
    pub fn page_size(&self, index: usize) -> Result<PageSize, CodecError> {
        let dict = self.page_dict(index)?;
        Ok(dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| obj.as_array().ok())
            .and_then(|array| parse_rect(array))
            .map(|(x0, y0, x1, y1)| PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
            .unwrap_or_default())
    }

    pub fn rotation(&self, index: usize) -> Result<i32, CodecError> {
        let rotate = self.page_dict(index)?.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0);
        Ok((rotate as i32).rem_euclid(360))
    }

    pub fn set_rotation(&mut self, index: usize, degrees: i32) -> Result<(), CodecError> {
        let page_id = self.page_id(index)?;
        self.page_dict_mut(page_id)?.set("Rotate", degrees.rem_euclid(360) as i64);
        Ok(())
    }

    fn set_kids(&mut self, ids: Vec<ObjectId>) -> Result<(), CodecError> {
        let count = ids.len() as i64;
        let root = self.doc.get_object_mut(self.pages_root).and_then(Object::as_dict_mut)?;
        root.set("Kids", ids.into_iter().map(Object::Reference).collect::<Vec<_>>());
        root.set("Count", count);
        Ok(())
    }

    /// Inserts a blank page so that it ends up at `index`.
    pub fn insert_page(&mut self, index: usize, size: PageSize) -> Result<ObjectId, CodecError> {
        let mut ids = self.page_ids();
        if index > ids.len() {
            return Err(CodecError::PageOutOfRange { page: index, page_count: ids.len() });
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_root,
            "MediaBox" => rect_object(0.0, 0.0, size.width_pt, size.height_pt),
            "Resources" => Dictionary::new(),
            "Contents" => Vec::<Object>::new(),
        });
        ids.insert(index, page_id);
        self.set_kids(ids)?;
        Ok(page_id)
    }

    pub fn remove_page(&mut self, index: usize) -> Result<ObjectId, CodecError> {
        let mut ids = self.page_ids();
        if index >= ids.len() {
            return Err(CodecError::PageOutOfRange { page: index, page_count: ids.len() });
        }

        let page_id = ids.remove(index);
        self.set_kids(ids)?;
        self.retain_fields(|field_page| field_page != Some(page_id))?;
        self.doc.objects.remove(&page_id);
        Ok(page_id)
    }

    /// Rewrites the page order. `order[i]` is the current index of the page
    /// that should end up at position `i`.
    pub fn set_page_order(&mut self, order: &[usize]) -> Result<(), CodecError> {
        let ids = self.page_ids();
        let unique: BTreeSet<usize> = order.iter().copied().collect();
        if order.len() != ids.len() || unique.len() != ids.len() || unique.iter().any(|i| *i >= ids.len()) {
            return Err(CodecError::Malformed(format!(
                "page order {order:?} is not a permutation of {} pages",
                ids.len()
            )));
        }

        self.set_kids(order.iter().map(|index| ids[*index]).collect())
    }

    /// Copies pages of `other` (by index, in the given order) into this graph
    /// starting at position `at`. Returns the new page ids.
    pub fn import_pages(
        &mut self,
        other: &PdfGraph,
        indices: &[usize],
        at: usize,
    ) -> Result<Vec<ObjectId>, CodecError> {
        let page_count = self.page_count();
        if at > page_count {
            return Err(CodecError::PageOutOfRange { page: at, page_count });
        }

        let mut incoming = other.subset_document(indices)?;
        incoming.renumber_objects_with(self.doc.max_id + 1);

        let incoming_catalog = incoming.trailer.get(b"Root").and_then(Object::as_reference)?;
        let incoming_root = incoming.catalog()?.get(b"Pages").and_then(Object::as_reference)?;
        let incoming_pages: Vec<ObjectId> = incoming
            .get_dictionary(incoming_root)?
            .get(b"Kids")
            .and_then(Object::as_array)?
            .iter()
            .filter_map(|kid| kid.as_reference().ok())
            .collect();
        let incoming_fields = acroform_field_ids(&incoming);

        let mut skip = BTreeSet::from([incoming_catalog, incoming_root]);
        if let Ok(info) = incoming.trailer.get(b"Info").and_then(Object::as_reference) {
            skip.insert(info);
        }

        let incoming_max = incoming.max_id;
        for (id, object) in incoming.objects {
            if !skip.contains(&id) {
                self.doc.objects.insert(id, object);
            }
        }
        self.doc.max_id = self.doc.max_id.max(incoming_max);

        let pages_root = self.pages_root;
        for page_id in &incoming_pages {
            self.page_dict_mut(*page_id)?.set("Parent", pages_root);
        }

        let mut ids = self.page_ids();
        for (offset, page_id) in incoming_pages.iter().enumerate() {
            ids.insert(at + offset, *page_id);
        }
        self.set_kids(ids)?;

        for field in incoming_fields {
            self.register_field(field)?;
        }

        log::debug!("imported {} page(s) at position {at}", incoming_pages.len());
        Ok(incoming_pages)
    }

    /// A standalone graph holding only the given pages, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<PdfGraph, CodecError> {
        let doc = self.subset_document(indices)?;
        let pages_root = doc.catalog()?.get(b"Pages").and_then(Object::as_reference)?;
        Ok(Self { doc, pages_root, fonts: FontSet::default() })
    }

    fn subset_document(&self, indices: &[usize]) -> Result<Document, CodecError> {
        let ids = self.page_ids();
        if indices.is_empty() {
            return Err(CodecError::NoPages);
        }

        let mut seen = BTreeSet::new();
        let mut selected = Vec::with_capacity(indices.len());
        for index in indices {
            let id = *ids
                .get(*index)
                .ok_or(CodecError::PageOutOfRange { page: *index, page_count: ids.len() })?;
            if seen.insert(id) {
                selected.push(id);
            }
        }

        let mut scratch = Self { doc: self.doc.clone(), pages_root: self.pages_root, fonts: FontSet::default() };
        scratch.set_kids(selected)?;
        scratch.retain_fields(|field_page| field_page.map_or(true, |page| seen.contains(&page)))?;
        scratch.doc.prune_objects();
        Ok(scratch.doc)
    }

    // --- metadata ----------------------------------------------------------

    pub fn info(&self) -> InfoFields {
        let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|object| self.resolve_dictionary(object))
        else {
            return InfoFields::default();
        };

        let text = |key: &str| info.get(key.as_bytes()).and_then(Object::as_str).ok().map(decode_text_string);
        InfoFields {
            title: text("Title"),
            author: text("Author"),
            subject: text("Subject"),
            keywords: text("Keywords"),
            creator: text("Creator"),
            producer: text("Producer"),
            creation_date: text("CreationDate"),
            mod_date: text("ModDate"),
        }
    }

    /// Writes one text entry of the information dictionary, creating the
    /// dictionary when the trailer has none.
    pub fn set_info(&mut self, key: &str, value: &str) -> Result<(), CodecError> {
        let current = self.doc.trailer.get(b"Info").ok().cloned();
        let info_id = match current {
            Some(Object::Reference(id)) if self.doc.objects.contains_key(&id) => id,
            Some(Object::Dictionary(dict)) => self.doc.add_object(dict),
            _ => self.doc.add_object(Dictionary::new()),
        };
        self.doc.trailer.set("Info", info_id);

        let info = self.doc.get_object_mut(info_id).and_then(Object::as_dict_mut)?;
        info.set(key, encode_text_string(value));
        Ok(())
    }

    // --- content -----------------------------------------------------------

    pub fn content_streams(&self, index: usize) -> Result<Vec<ObjectId>, CodecError> {
        Ok(match self.page_dict(index)?.get(b"Contents") {
            Ok(Object::Reference(id)) => vec![*id],
            Ok(Object::Array(items)) => items.iter().filter_map(|item| item.as_reference().ok()).collect(),
            _ => Vec::new(),
        })
    }

    /// Concatenated, decompressed content of every stream on the page.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>, CodecError> {
        let page_id = self.page_id(index)?;
        if self.content_streams(index)?.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.doc.get_page_content(page_id)?)
    }

    /// Appends `ops` as a new content stream painted above everything else
    /// on the page.
    pub fn append_content(&mut self, index: usize, ops: Vec<Operation>) -> Result<ObjectId, CodecError> {
        let page_id = self.page_id(index)?;
        let bytes = Content { operations: ops }.encode()?;
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), bytes));
        self.contents_array_mut(page_id)?.push(Object::Reference(stream_id));
        Ok(stream_id)
    }

    /// Repaints an existing stream in place, keeping its paint position.
    pub fn replace_content(&mut self, stream_id: ObjectId, ops: Vec<Operation>) -> Result<(), CodecError> {
        let bytes = Content { operations: ops }.encode()?;
        let stream = self.doc.get_object_mut(stream_id).and_then(Object::as_stream_mut)?;
        stream.set_plain_content(bytes);
        Ok(())
    }

    /// Empties the string shown by operation `operation` of a stream. Every
    /// other operation keeps its position, so recorded positions of other
    /// runs in the same stream stay valid.
    pub fn blank_shown_text(&mut self, stream_id: ObjectId, operation: usize) -> Result<(), CodecError> {
        let mut ops = self.content_operations(stream_id)?;
        let shown = ops
            .get_mut(operation)
            .filter(|op| matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\""))
            .and_then(|op| op.operands.last_mut())
            .ok_or_else(|| {
                CodecError::Malformed(format!("operation {operation} of stream {stream_id:?} shows no text"))
            })?;
        match shown {
            Object::Array(items) => items.clear(),
            other => *other = Object::String(Vec::new(), StringFormat::Literal),
        }
        self.replace_content(stream_id, ops)
    }

    /// Decoded operations of a single content stream.
    pub fn content_operations(&self, stream_id: ObjectId) -> Result<Vec<Operation>, CodecError> {
        let stream = self.doc.get_object(stream_id).and_then(Object::as_stream)?;
        let bytes = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
        Ok(Content::decode(&bytes)?.operations)
    }

    pub fn remove_content(&mut self, index: usize, stream_id: ObjectId) -> Result<bool, CodecError> {
        let page_id = self.page_id(index)?;
        let contents = self.contents_array_mut(page_id)?;
        let before = contents.len();
        contents.retain(|item| item.as_reference().ok() != Some(stream_id));
        let removed = contents.len() != before;
        if removed {
            self.doc.objects.remove(&stream_id);
        }
        Ok(removed)
    }

    fn contents_array_mut(&mut self, page_id: ObjectId) -> Result<&mut Vec<Object>, CodecError> {
        let page = self.page_dict_mut(page_id)?;
        let normalized = match page.remove(b"Contents") {
            Some(Object::Array(items)) => items,
            Some(reference @ Object::Reference(_)) => vec![reference],
            _ => Vec::new(),
        };
        page.set("Contents", normalized);
        Ok(page.get_mut(b"Contents").and_then(Object::as_array_mut)?)
    }

    // --- resources ---------------------------------------------------------

    fn resolved_resources(&self, page_id: ObjectId) -> Dictionary {
        self.doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Resources"))
            .ok()
            .and_then(|object| self.resolve_dictionary(object))
            .cloned()
            .unwrap_or_else(Dictionary::new)
    }

    /// Registers `value` under `/Resources/<category>/<name>`. Shared resource
    /// dictionaries are copied onto the page first.
    fn set_resource(&mut self, page_id: ObjectId, category: &str, name: &str, value: Object) -> Result<(), CodecError> {
        let mut resources = self.resolved_resources(page_id);
        let mut entries = resources
            .get(category.as_bytes())
            .ok()
            .and_then(|object| self.resolve_dictionary(object))
            .cloned()
            .unwrap_or_else(Dictionary::new);
        entries.set(name, value);
        resources.set(category, entries);
        self.page_dict_mut(page_id)?.set("Resources", resources);
        Ok(())
    }

    pub fn embed_standard_fonts(&mut self) {
        self.fonts = FontSet::embed_standard(&mut self.doc);
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Makes `font` available on the page and returns its resource name.
    pub fn font_resource(&mut self, index: usize, font: StandardFont) -> Result<String, CodecError> {
        let page_id = self.page_id(index)?;
        let embedded = self.fonts.get(font).filter(|id| self.doc.objects.contains_key(id));
        let font_id = match embedded {
            Some(id) => id,
            None => {
                self.embed_standard_fonts();
                self.fonts
                    .get(font)
                    .ok_or_else(|| CodecError::Malformed(format!("{} not embedded", font.base_font())))?
            }
        };
        self.set_resource(page_id, "Font", font.resource_name(), Object::Reference(font_id))?;
        Ok(font.resource_name().to_owned())
    }

    /// Base font name behind a page font resource.
    pub fn font_base_name(&self, index: usize, resource: &str) -> Option<String> {
        let page_id = self.page_id(index).ok()?;
        let resources = self.resolved_resources(page_id);
        let fonts = self.resolve_dictionary(resources.get(b"Font").ok()?)?;
        let font = self.resolve_dictionary(fonts.get(resource.as_bytes()).ok()?)?;
        let name = font.get(b"BaseFont").and_then(Object::as_name).ok()?;
        Some(String::from_utf8_lossy(name).into_owned())
    }

    /// Embeds image bytes and registers them as an XObject on the page.
    pub fn image_resource(&mut self, index: usize, bytes: &[u8]) -> Result<(String, EmbeddedImage), CodecError> {
        let page_id = self.page_id(index)?;
        let embedded = embed_image(&mut self.doc, bytes)?;
        let name = format!("Im{}", embedded.id.0);
        self.set_resource(page_id, "XObject", &name, Object::Reference(embedded.id))?;
        Ok((name, embedded))
    }

    /// Registers an already embedded XObject on another page.
    pub fn share_xobject(&mut self, index: usize, name: &str, id: ObjectId) -> Result<(), CodecError> {
        let page_id = self.page_id(index)?;
        self.set_resource(page_id, "XObject", name, Object::Reference(id))
    }

    /// Graphics state for constant stroke and fill alpha. Fully opaque
    /// content needs none. A state on the page with exactly this alpha is
    /// reused; otherwise a new one is registered under the first free name.
    pub fn ext_gstate(&mut self, index: usize, opacity: f32) -> Result<Option<String>, CodecError> {
        if opacity >= 1.0 {
            return Ok(None);
        }
        let page_id = self.page_id(index)?;
        let opacity = opacity.clamp(0.0, 1.0);

        let resources = self.resolved_resources(page_id);
        let states = resources
            .get(b"ExtGState")
            .ok()
            .and_then(|object| self.resolve_dictionary(object))
            .cloned()
            .unwrap_or_else(Dictionary::new);
        let existing = states.iter().find_map(|(name, object)| {
            let state = self.resolve_dictionary(object)?;
            let alpha = |key: &[u8]| state.get(key).and_then(Object::as_float).ok();
            let plain = state.iter().all(|(key, _)| matches!(key.as_slice(), b"Type" | b"CA" | b"ca"));
            (plain && alpha(b"CA") == Some(opacity) && alpha(b"ca") == Some(opacity))
                .then(|| String::from_utf8_lossy(name).into_owned())
        });
        if existing.is_some() {
            return Ok(existing);
        }

        let name = (1..)
            .map(|n| format!("GS{n}"))
            .find(|candidate| !states.has(candidate.as_bytes()))
            .unwrap_or_else(|| "GS0".to_owned());
        let state = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "CA" => Object::Real(opacity),
            "ca" => Object::Real(opacity),
        });
        self.set_resource(page_id, "ExtGState", &name, Object::Reference(state))?;
        Ok(Some(name))
    }

    // --- annotations and form fields ---------------------------------------

    /// Annotation dictionaries on the page, with their object ids when they
    /// are indirect.
    pub fn annotations(&self, index: usize) -> Result<Vec<(Option<ObjectId>, Dictionary)>, CodecError> {
        let page = self.page_dict(index)?;
        let Some(annots) = page.get(b"Annots").ok().and_then(|object| match object {
            Object::Reference(id) => self.doc.get_object(*id).ok().and_then(|o| o.as_array().ok()),
            Object::Array(items) => Some(items),
            _ => None,
        }) else {
            return Ok(Vec::new());
        };

        Ok(annots
            .iter()
            .filter_map(|item| {
                let id = item.as_reference().ok();
                self.resolve_dictionary(item).map(|dict| (id, dict.clone()))
            })
            .collect())
    }

    pub fn add_annotation(&mut self, index: usize, mut annotation: Dictionary) -> Result<ObjectId, CodecError> {
        let page_id = self.page_id(index)?;
        annotation.set("P", page_id);
        let id = self.doc.add_object(annotation);
        self.annots_array_mut(page_id)?.push(Object::Reference(id));
        Ok(id)
    }

    /// Swaps the dictionary behind an annotation, keeping its page link.
    pub fn replace_annotation(&mut self, id: ObjectId, mut annotation: Dictionary) -> Result<(), CodecError> {
        let object = self.doc.get_object_mut(id)?;
        if let Ok(page) = object.as_dict().and_then(|dict| dict.get(b"P")) {
            annotation.set("P", page.clone());
        }
        *object = Object::Dictionary(annotation);
        Ok(())
    }

    pub fn remove_annotation(&mut self, index: usize, id: ObjectId) -> Result<bool, CodecError> {
        let page_id = self.page_id(index)?;
        let annots = self.annots_array_mut(page_id)?;
        let before = annots.len();
        annots.retain(|item| item.as_reference().ok() != Some(id));
        let removed = annots.len() != before;

        let fields = self.field_ids();
        if fields.contains(&id) {
            self.write_fields(fields.into_iter().filter(|field| *field != id).collect())?;
        }
        if removed {
            self.doc.objects.remove(&id);
        }
        Ok(removed)
    }

    fn annots_array_mut(&mut self, page_id: ObjectId) -> Result<&mut Vec<Object>, CodecError> {
        let shared = match self.doc.get_dictionary(page_id)?.get(b"Annots") {
            Ok(Object::Reference(id)) => self.doc.get_object(*id).ok().and_then(|o| o.as_array().ok()).cloned(),
            _ => None,
        };
        let page = self.page_dict_mut(page_id)?;
        let normalized = match (shared, page.remove(b"Annots")) {
            (Some(items), _) => items,
            (None, Some(Object::Array(items))) => items,
            _ => Vec::new(),
        };
        page.set("Annots", normalized);
        Ok(page.get_mut(b"Annots").and_then(Object::as_array_mut)?)
    }

    /// Terminal fields listed in the AcroForm.
    pub fn field_ids(&self) -> Vec<ObjectId> {
        acroform_field_ids(&self.doc)
    }

    /// Lists a widget annotation as a top-level AcroForm field, creating the
    /// AcroForm on first use.
    pub fn register_field(&mut self, field_id: ObjectId) -> Result<(), CodecError> {
        let mut fields = self.field_ids();
        if !fields.contains(&field_id) {
            fields.push(field_id);
        }
        self.write_fields(fields)
    }

    fn write_fields(&mut self, fields: Vec<ObjectId>) -> Result<(), CodecError> {
        let mut form = self.acroform().unwrap_or_else(|| {
            dictionary! {
                "NeedAppearances" => true,
                "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            }
        });
        form.set("Fields", fields.into_iter().map(Object::Reference).collect::<Vec<_>>());

        if !form.has(b"DR") {
            if let Some(helvetica) = self.fonts.get(StandardFont::Helvetica) {
                form.set("DR", dictionary! { "Font" => dictionary! { "Helv" => helvetica } });
            }
        }

        let catalog_id = self.doc.trailer.get(b"Root").and_then(Object::as_reference)?;
        let catalog = self.doc.get_object_mut(catalog_id).and_then(Object::as_dict_mut)?;
        catalog.set("AcroForm", form);
        Ok(())
    }

    fn acroform(&self) -> Option<Dictionary> {
        let catalog = self.doc.catalog().ok()?;
        self.resolve_dictionary(catalog.get(b"AcroForm").ok()?).cloned()
    }

    /// Keeps only fields whose `/P` page passes `keep`.
    fn retain_fields(&mut self, keep: impl Fn(Option<ObjectId>) -> bool) -> Result<(), CodecError> {
        if self.acroform().is_none() {
            return Ok(());
        }
        let fields: Vec<ObjectId> = self
            .field_ids()
            .into_iter()
            .filter(|field| {
                let page = self.dictionary(*field).and_then(|dict| dict.get(b"P").and_then(Object::as_reference).ok());
                keep(page)
            })
            .collect();
        self.write_fields(fields)
    }

    /// Drops every widget annotation and the AcroForm itself.
    pub fn strip_form(&mut self) -> Result<(), CodecError> {
        for page_id in self.page_ids() {
            let candidates: Vec<ObjectId> =
                self.annots_array_mut(page_id)?.iter().filter_map(|item| item.as_reference().ok()).collect();
            let widgets: Vec<ObjectId> = candidates
                .into_iter()
                .filter(|id| {
                    self.dictionary(*id)
                        .and_then(|dict| dict.get(b"Subtype").and_then(Object::as_name).ok())
                        .is_some_and(|subtype| subtype == b"Widget")
                })
                .collect();
            if widgets.is_empty() {
                continue;
            }
            self.annots_array_mut(page_id)?
                .retain(|item| item.as_reference().map_or(true, |id| !widgets.contains(&id)));
            for id in widgets {
                self.doc.objects.remove(&id);
            }
        }

        let catalog_id = self.doc.trailer.get(b"Root").and_then(Object::as_reference)?;
        self.doc.get_object_mut(catalog_id).and_then(Object::as_dict_mut)?.remove(b"AcroForm");
        Ok(())
    }
}

/// Whether the last classic trailer of an unparsable file names an
/// `/Encrypt` dictionary.
fn trailer_declares_encryption(bytes: &[u8]) -> bool {
    let keyword = b"trailer";
    let Some(start) = bytes.windows(keyword.len()).rposition(|window| window == keyword) else {
        return false;
    };
    bytes[start..].windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt")
}

fn acroform_field_ids(doc: &Document) -> Vec<ObjectId> {
    let Ok(catalog) = doc.catalog() else {
        return Vec::new();
    };
    let form = match catalog.get(b"AcroForm") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    form.and_then(|form| form.get(b"Fields").and_then(Object::as_array).ok())
        .map(|fields| fields.iter().filter_map(|field| field.as_reference().ok()).collect())
        .unwrap_or_default()
}

/// Makes every page a direct kid of the root `Pages` node, copying inherited
/// attributes down, and brackets existing page content in `q`/`Q` so that
/// appended streams start from the default graphics state.
fn flatten_page_tree(doc: &mut Document) -> Result<ObjectId, CodecError> {
    let pages_root = doc.catalog()?.get(b"Pages").and_then(Object::as_reference)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(CodecError::NoPages);
    }

    let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    for page_id in &page_ids {
        let inherited: Vec<(&str, Object)> = INHERITABLE
            .iter()
            .filter(|key| doc.get_dictionary(*page_id).map_or(false, |page| !page.has(key.as_bytes())))
            .filter_map(|key| inherited_attribute(doc, *page_id, key).map(|value| (*key, value)))
            .collect();

        let page = doc.get_object_mut(*page_id).and_then(Object::as_dict_mut)?;
        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Type", "Page");
        page.set("Parent", pages_root);

        let contents = match page.remove(b"Contents") {
            Some(Object::Array(items)) => items,
            Some(reference @ Object::Reference(_)) => vec![reference],
            _ => Vec::new(),
        };
        if contents.is_empty() {
            page.set("Contents", contents);
        } else {
            let mut bracketed = Vec::with_capacity(contents.len() + 2);
            bracketed.push(Object::Reference(save));
            bracketed.extend(contents);
            bracketed.push(Object::Reference(restore));
            page.set("Contents", bracketed);
        }
    }

    let root = doc.get_object_mut(pages_root).and_then(Object::as_dict_mut)?;
    root.set("Kids", page_ids.iter().copied().map(Object::Reference).collect::<Vec<_>>());
    root.set("Count", page_ids.len() as i64);
    Ok(pages_root)
}

fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &str) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = current {
        depth += 1;
        if depth > 64 {
            log::warn!("page tree deeper than 64 levels above {page_id:?}");
            return None;
        }
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key.as_bytes()) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn parse_rect(array: &[Object]) -> Option<(f32, f32, f32, f32)> {
    if array.len() != 4 {
        return None;
    }
    Some((
        array[0].as_float().ok()?,
        array[1].as_float().ok()?,
        array[2].as_float().ok()?,
        array[3].as_float().ok()?,
    ))
}

pub fn rect_object(x0: f32, y0: f32, x1: f32, y1: f32) -> Object {
    Object::Array(vec![Object::Real(x0), Object::Real(y0), Object::Real(x1), Object::Real(y1)])
}

/// Decodes a PDF text string: UTF-16BE with a byte-order mark, otherwise
/// single-byte Latin-1.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|byte| char::from(*byte)).collect()
}

/// Encodes a PDF text string, falling back to UTF-16BE when the value does
/// not fit Latin-1.
pub fn encode_text_string(value: &str) -> Object {
    if value.chars().all(|c| u32::from(c) < 256) {
        let bytes = value.chars().map(|c| u32::from(c) as u8).collect();
        return Object::String(bytes, StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
