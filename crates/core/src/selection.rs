//! Selection set and clipboard.

use chrono::{DateTime, Utc};
use doc_model::{Document, Entity, EntityId, PageId};
use indexmap::IndexSet;

/// Selected entity ids in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: IndexSet<EntityId>,
}

impl Selection {
    /// Replaces the selection with a single entity.
    pub fn select(&mut self, id: EntityId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    pub fn select_many(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.ids.clear();
        self.ids.extend(ids);
    }

    /// Adds to the selection without dropping what is already selected.
    pub fn add(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    pub fn toggle(&mut self, id: EntityId) {
        if !self.ids.shift_remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Selects every entity on `page_id`, lowest z-index first. Returns the
    /// number selected.
    pub fn select_all(&mut self, document: &Document, page_id: PageId) -> usize {
        self.select_many(document.entities_on_page(page_id).iter().map(Entity::id));
        self.ids.len()
    }

    /// Drops ids that no longer resolve, e.g. after undo.
    pub fn retain_existing(&mut self, document: &Document) {
        self.ids.retain(|id| document.contains_entity(*id));
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Current data of the selected entities, in selection order.
    pub fn entities(&self, document: &Document) -> Vec<Entity> {
        self.ids.iter().filter_map(|id| document.find_entity(*id)).collect()
    }
}

/// Copied entity data. Entries are values, not references; later edits to
/// the originals do not reach the clipboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    entries: Vec<Entity>,
    copied_at: DateTime<Utc>,
    source_page: Option<PageId>,
}

impl Clipboard {
    /// Copies the selected entities. `None` when nothing selected still
    /// exists.
    pub fn capture(selection: &Selection, document: &Document) -> Option<Self> {
        let entries = selection.entities(document);
        let source_page = entries.first().map(Entity::page_id);
        (!entries.is_empty()).then(|| Self { entries, copied_at: Utc::now(), source_page })
    }

    pub fn entries(&self) -> &[Entity] {
        &self.entries
    }

    pub fn copied_at(&self) -> DateTime<Utc> {
        self.copied_at
    }

    pub fn source_page(&self) -> Option<PageId> {
        self.source_page
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Page a paste lands on: the requested page if it exists, then the page
    /// the entries were copied from, then the first page.
    pub fn paste_target(&self, requested: Option<PageId>, document: &Document) -> Option<PageId> {
        [requested, self.source_page]
            .into_iter()
            .flatten()
            .find(|page_id| document.page(*page_id).is_some())
            .or_else(|| document.pages.first().map(|page| page.id))
    }
}
