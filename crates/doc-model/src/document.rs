use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotation::Annotation;
use crate::elements::{DrawingElement, EntityId, ImageElement, ObjectRef, PageId, TextElement};
use crate::form::FormField;
use crate::geometry::{next_z_index, PageRotation, Rect, Size};
use crate::signature::Signature;
use crate::watermark::Watermark;
use crate::{now_timestamp, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_print: bool,
    pub can_modify: bool,
    pub can_copy: bool,
    pub can_annotate: bool,
    pub can_fill_forms: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self { can_print: true, can_modify: true, can_copy: true, can_annotate: true, can_fill_forms: true }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub created_at: Option<u64>,
    pub modified_at: Option<u64>,
    pub page_count: usize,
    pub permissions: Permissions,
}

/// Partial metadata edit; `None` leaves a field as it is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
            && self.creator.is_none()
            && self.producer.is_none()
    }
}

impl Metadata {
    pub fn apply(&mut self, update: &MetadataUpdate) {
        let fields = [
            (&mut self.title, &update.title),
            (&mut self.author, &update.author),
            (&mut self.subject, &update.subject),
            (&mut self.keywords, &update.keywords),
            (&mut self.creator, &update.creator),
            (&mut self.producer, &update.producer),
        ];
        for (slot, value) in fields {
            if let Some(value) = value {
                *slot = Some(value.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub rotation: PageRotation,
    pub texts: Vec<TextElement>,
    pub images: Vec<ImageElement>,
    pub drawings: Vec<DrawingElement>,
    pub annotations: Vec<Annotation>,
    pub form_fields: Vec<FormField>,
    pub visible: bool,
    pub locked: bool,
    /// Largest z-index handed out on this page so far.
    pub z_high_water: u32,
}

impl Page {
    pub fn new(number: u32, size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            width: size.width,
            height: size.height,
            rotation: PageRotation::Deg0,
            texts: Vec::new(),
            images: Vec::new(),
            drawings: Vec::new(),
            annotations: Vec::new(),
            form_fields: Vec::new(),
            visible: true,
            locked: false,
            z_high_water: 0,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Applies a rotation delta, exchanging width and height on quarter turns.
    pub fn rotate_by(&mut self, delta: PageRotation) {
        self.rotation = self.rotation.rotate_by(delta);
        if delta.is_quarter_turn() {
            std::mem::swap(&mut self.width, &mut self.height);
        }
    }

    pub fn element_count(&self) -> usize {
        self.texts.len()
            + self.images.len()
            + self.drawings.len()
            + self.annotations.len()
            + self.form_fields.len()
    }

    fn z_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.texts
            .iter()
            .map(|e| e.frame.z_index)
            .chain(self.images.iter().map(|e| e.frame.z_index))
            .chain(self.drawings.iter().map(|e| e.frame.z_index))
            .chain(self.annotations.iter().map(|e| e.z_index))
            .chain(self.form_fields.iter().map(|e| e.z_index))
    }
}

/// Any page-owned entity, by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Text(TextElement),
    Image(ImageElement),
    Drawing(DrawingElement),
    Annotation(Annotation),
    FormField(FormField),
    Signature(Signature),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Text,
    Image,
    Drawing,
    Annotation,
    FormField,
    Signature,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Drawing => "drawing",
            Self::Annotation => "annotation",
            Self::FormField => "form field",
            Self::Signature => "signature",
        }
    }
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Text(e) => e.id,
            Self::Image(e) => e.id,
            Self::Drawing(e) => e.id,
            Self::Annotation(e) => e.id,
            Self::FormField(e) => e.id,
            Self::Signature(e) => e.id,
        }
    }

    pub fn page_id(&self) -> PageId {
        match self {
            Self::Text(e) => e.page_id,
            Self::Image(e) => e.page_id,
            Self::Drawing(e) => e.page_id,
            Self::Annotation(e) => e.page_id,
            Self::FormField(e) => e.page_id,
            Self::Signature(e) => e.page_id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Text(_) => EntityKind::Text,
            Self::Image(_) => EntityKind::Image,
            Self::Drawing(_) => EntityKind::Drawing,
            Self::Annotation(_) => EntityKind::Annotation,
            Self::FormField(_) => EntityKind::FormField,
            Self::Signature(_) => EntityKind::Signature,
        }
    }

    pub fn z_index(&self) -> u32 {
        match self {
            Self::Text(e) => e.frame.z_index,
            Self::Image(e) => e.frame.z_index,
            Self::Drawing(e) => e.frame.z_index,
            Self::Annotation(e) => e.z_index,
            Self::FormField(e) => e.z_index,
            Self::Signature(e) => e.z_index,
        }
    }

    pub fn graph_ref(&self) -> Option<ObjectRef> {
        match self {
            Self::Text(e) => e.graph_ref,
            Self::Image(e) => e.graph_ref,
            Self::Drawing(e) => e.graph_ref,
            Self::Annotation(e) => e.graph_ref,
            Self::FormField(e) => e.graph_ref,
            Self::Signature(e) => e.graph_ref,
        }
    }

    /// Document-space bounds. Text bounds start at the baseline.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Text(e) => e.frame.rect(),
            Self::Image(e) => e.frame.rect(),
            Self::Drawing(e) => e.frame.rect(),
            Self::Annotation(e) => e.rect,
            Self::FormField(e) => e.rect,
            Self::Signature(e) => e.rect,
        }
    }

    /// Whether the entity refuses geometry edits.
    pub fn is_locked(&self) -> bool {
        match self {
            Self::Text(e) => e.frame.locked,
            Self::Image(e) => e.frame.locked,
            Self::Drawing(e) => e.frame.locked,
            Self::Annotation(_) | Self::FormField(_) | Self::Signature(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub pages: Vec<Page>,
    pub metadata: Metadata,
    pub signatures: Vec<Signature>,
    pub watermarks: Vec<Watermark>,
    pub dirty: bool,
    pub created_at: u64,
    pub modified_at: u64,
}

impl Document {
    pub fn new(name: impl Into<String>, pages: Vec<Page>, metadata: Metadata) -> Self {
        let now = now_timestamp();
        let mut document = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pages,
            metadata,
            signatures: Vec::new(),
            watermarks: Vec::new(),
            dirty: false,
            created_at: now,
            modified_at: now,
        };
        document.renumber();
        document
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page_id: PageId) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == page_id)
    }

    pub fn page_mut(&mut self, page_id: PageId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.id == page_id)
    }

    pub fn page_index(&self, page_id: PageId) -> Option<usize> {
        self.pages.iter().position(|page| page.id == page_id)
    }

    pub fn page_by_number(&self, number: u32) -> Option<&Page> {
        number.checked_sub(1).and_then(|index| self.pages.get(index as usize))
    }

    /// Restores contiguous 1-based numbering in sequence order.
    pub fn renumber(&mut self) {
        for (index, page) in self.pages.iter_mut().enumerate() {
            page.number = index as u32 + 1;
        }
        self.metadata.page_count = self.pages.len();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.modified_at = now_timestamp();
    }

    /// Removes a page and everything it owns.
    pub fn remove_page(&mut self, page_id: PageId) -> Option<Page> {
        let index = self.page_index(page_id)?;
        let page = self.pages.remove(index);
        self.signatures.retain(|signature| signature.page_id != page_id);
        for watermark in &mut self.watermarks {
            watermark.applied.retain(|applied| applied.page_id != page_id);
        }
        self.renumber();
        Some(page)
    }

    /// Reserves the next stacking index on a page.
    pub fn claim_z_index(&mut self, page_id: PageId) -> Result<u32, ModelError> {
        let signatures: Vec<u32> = self
            .signatures
            .iter()
            .filter(|signature| signature.page_id == page_id)
            .map(|signature| signature.z_index)
            .collect();
        let page = self.page_mut(page_id).ok_or(ModelError::UnknownPage(page_id))?;
        let z_index = next_z_index(page.z_indices().chain(signatures), page.z_high_water);
        page.z_high_water = z_index;
        Ok(z_index)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.pages.iter().flat_map(|page| page.annotations.iter())
    }

    pub fn form_fields(&self) -> impl Iterator<Item = &FormField> {
        self.pages.iter().flat_map(|page| page.form_fields.iter())
    }

    /// Every entity on a page, lowest z-index first.
    pub fn entities_on_page(&self, page_id: PageId) -> Vec<Entity> {
        let Some(page) = self.page(page_id) else {
            return Vec::new();
        };

        let mut entities: Vec<Entity> = page
            .texts
            .iter()
            .cloned()
            .map(Entity::Text)
            .chain(page.images.iter().cloned().map(Entity::Image))
            .chain(page.drawings.iter().cloned().map(Entity::Drawing))
            .chain(page.annotations.iter().cloned().map(Entity::Annotation))
            .chain(page.form_fields.iter().cloned().map(Entity::FormField))
            .chain(
                self.signatures
                    .iter()
                    .filter(|signature| signature.page_id == page_id)
                    .cloned()
                    .map(Entity::Signature),
            )
            .collect();
        entities.sort_by_key(Entity::z_index);
        entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<Entity> {
        if let Some(signature) = self.signatures.iter().find(|signature| signature.id == id) {
            return Some(Entity::Signature(signature.clone()));
        }

        self.pages.iter().find_map(|page| {
            page.texts
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(Entity::Text)
                .or_else(|| page.images.iter().find(|e| e.id == id).cloned().map(Entity::Image))
                .or_else(|| page.drawings.iter().find(|e| e.id == id).cloned().map(Entity::Drawing))
                .or_else(|| {
                    page.annotations.iter().find(|e| e.id == id).cloned().map(Entity::Annotation)
                })
                .or_else(|| {
                    page.form_fields.iter().find(|e| e.id == id).cloned().map(Entity::FormField)
                })
        })
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.find_entity(id).is_some()
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        if let Some(index) = self.signatures.iter().position(|signature| signature.id == id) {
            return Some(Entity::Signature(self.signatures.remove(index)));
        }

        for page in &mut self.pages {
            if let Some(index) = page.texts.iter().position(|e| e.id == id) {
                return Some(Entity::Text(page.texts.remove(index)));
            }
            if let Some(index) = page.images.iter().position(|e| e.id == id) {
                return Some(Entity::Image(page.images.remove(index)));
            }
            if let Some(index) = page.drawings.iter().position(|e| e.id == id) {
                return Some(Entity::Drawing(page.drawings.remove(index)));
            }
            if let Some(index) = page.annotations.iter().position(|e| e.id == id) {
                return Some(Entity::Annotation(page.annotations.remove(index)));
            }
            if let Some(index) = page.form_fields.iter().position(|e| e.id == id) {
                return Some(Entity::FormField(page.form_fields.remove(index)));
            }
        }
        None
    }

    /// Stores an entity on its owning page.
    pub fn insert_entity(&mut self, entity: Entity) -> Result<(), ModelError> {
        let page_id = entity.page_id();
        if let Entity::Signature(signature) = entity {
            if self.page(page_id).is_none() {
                return Err(ModelError::UnknownPage(page_id));
            }
            self.signatures.push(signature);
            return Ok(());
        }

        let page = self.page_mut(page_id).ok_or(ModelError::UnknownPage(page_id))?;
        match entity {
            Entity::Text(e) => page.texts.push(e),
            Entity::Image(e) => page.images.push(e),
            Entity::Drawing(e) => page.drawings.push(e),
            Entity::Annotation(e) => page.annotations.push(e),
            Entity::FormField(e) => page.form_fields.push(e),
            Entity::Signature(_) => {}
        }
        Ok(())
    }

    /// Replaces the stored entity with the same id. Returns `false` when no
    /// entity with that id exists.
    pub fn replace_entity(&mut self, entity: Entity) -> bool {
        let id = entity.id();
        if self.remove_entity(id).is_none() {
            return false;
        }
        self.insert_entity(entity).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Frame, TextStyle};
    use crate::signature::SignatureMethod;
    use crate::watermark::{AppliedWatermark, PageSelector, WatermarkContent, WatermarkPosition};
    use crate::{ObjectRef, Rect};
    use std::sync::Arc;

    fn document(pages: usize) -> Document {
        let pages = (0..pages).map(|_| Page::new(0, Size::default())).collect();
        Document::new("test.pdf", pages, Metadata::default())
    }

    fn text(page_id: PageId, z_index: u32) -> Entity {
        Entity::Text(TextElement {
            id: Uuid::new_v4(),
            page_id,
            content: "hello".to_owned(),
            frame: Frame::new(Rect::new(10.0, 10.0, 30.0, 12.0), z_index),
            style: TextStyle::default(),
            graph_ref: None,
            origin: None,
        })
    }

    #[test]
    fn new_document_numbers_pages_contiguously() {
        let doc = document(4);
        let numbers: Vec<u32> = doc.pages.iter().map(|page| page.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(doc.metadata.page_count, 4);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let mut page = Page::new(1, Size::new(612.0, 792.0));
        page.rotate_by(PageRotation::Deg90);
        assert_eq!((page.width, page.height), (792.0, 612.0));
        page.rotate_by(PageRotation::Deg180);
        assert_eq!((page.width, page.height), (792.0, 612.0));
        assert_eq!(page.rotation, PageRotation::Deg270);
    }

    #[test]
    fn removing_page_cascades_owned_entities() {
        let mut doc = document(2);
        let doomed = doc.pages[0].id;
        let kept = doc.pages[1].id;

        doc.insert_entity(text(doomed, 1)).expect("insert on first page");
        doc.insert_entity(text(kept, 1)).expect("insert on second page");
        doc.insert_entity(Entity::Signature(Signature {
            id: Uuid::new_v4(),
            page_id: doomed,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            image: Arc::from(vec![1u8, 2, 3]),
            method: SignatureMethod::Drawn,
            author: None,
            signed_at: 0,
            verified: false,
            z_index: 2,
            graph_ref: None,
        }))
        .expect("insert signature");
        doc.watermarks.push(Watermark {
            id: Uuid::new_v4(),
            content: WatermarkContent::Image { data: Arc::from(vec![0u8]), width: 1.0, height: 1.0 },
            pages: PageSelector::All,
            position: WatermarkPosition::Center,
            rotation: 0.0,
            opacity: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            applied: vec![
                AppliedWatermark { page_id: doomed, graph_ref: ObjectRef::new(5, 0) },
                AppliedWatermark { page_id: kept, graph_ref: ObjectRef::new(6, 0) },
            ],
        });

        doc.remove_page(doomed).expect("page exists");

        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].number, 1);
        assert!(doc.signatures.is_empty());
        assert_eq!(doc.watermarks[0].applied.len(), 1);
        assert_eq!(doc.pages[0].texts.len(), 1);
    }

    #[test]
    fn claimed_z_indices_never_repeat_after_deletion() {
        let mut doc = document(1);
        let page_id = doc.pages[0].id;

        let first = doc.claim_z_index(page_id).expect("page exists");
        let entity = text(page_id, first);
        let entity_id = entity.id();
        doc.insert_entity(entity).expect("insert");
        doc.remove_entity(entity_id).expect("remove");

        let second = doc.claim_z_index(page_id).expect("page exists");
        assert!(second > first);
    }

    #[test]
    fn claim_z_index_rejects_unknown_page() {
        let mut doc = document(1);
        let unknown = Uuid::new_v4();
        assert_eq!(doc.claim_z_index(unknown), Err(ModelError::UnknownPage(unknown)));
    }

    #[test]
    fn entities_on_page_are_ordered_by_z_index() {
        let mut doc = document(1);
        let page_id = doc.pages[0].id;
        doc.insert_entity(text(page_id, 7)).expect("insert");
        doc.insert_entity(text(page_id, 2)).expect("insert");

        let order: Vec<u32> = doc.entities_on_page(page_id).iter().map(Entity::z_index).collect();
        assert_eq!(order, vec![2, 7]);
    }

    #[test]
    fn replace_entity_keeps_owner() {
        let mut doc = document(1);
        let page_id = doc.pages[0].id;
        let Entity::Text(mut element) = text(page_id, 1) else {
            unreachable!();
        };
        doc.insert_entity(Entity::Text(element.clone())).expect("insert");

        element.content = "changed".to_owned();
        assert!(doc.replace_entity(Entity::Text(element.clone())));
        assert_eq!(doc.pages[0].texts[0].content, "changed");
        assert!(!doc.replace_entity(text(page_id, 3)));
    }

    #[test]
    fn metadata_update_touches_only_given_fields() {
        let mut metadata = Metadata { title: Some("Old".to_owned()), author: Some("A".to_owned()), ..Metadata::default() };
        metadata.apply(&MetadataUpdate { title: Some("New".to_owned()), ..MetadataUpdate::default() });
        assert_eq!(metadata.title.as_deref(), Some("New"));
        assert_eq!(metadata.author.as_deref(), Some("A"));
    }
}
