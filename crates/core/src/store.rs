//! Editor Store
//!
//! The single mutation surface for UI collaborators. Actions go through
//! [`Store::dispatch`]; the store drives the [`DocumentManager`], records
//! undoable steps, keeps the selection and clipboard, and publishes an
//! immutable [`EditorSnapshot`] after every action. Readers only ever see
//! whole snapshots.

use std::sync::Arc;

use doc_model::{
    apply_view_action, Document, EntityId, MetadataUpdate, PageId, PageRotation, ViewAction, ViewState,
};
use pdf_engine::{DocumentSource, PdfGraph};
use serde_json::json;

use crate::config::EditorConfig;
use crate::document_manager::DocumentManager;
use crate::error::{EditError, EditResult};
use crate::history::{ActionKind, History, HistoryEntry};
use crate::options::{
    AddPageOptions, AnnotationOptions, DrawingOptions, ElementUpdate, ExportFormat, FormFieldOptions,
    ImageOptions, PageRange, SaveOptions, SignatureOptions, TextOptions, WatermarkOptions,
};
use crate::selection::{Clipboard, Selection};

#[derive(Debug, Clone)]
pub enum EditorAction {
    Load(DocumentSource),
    CreateNew { page_count: usize },
    Save(SaveOptions),
    Export(ExportFormat),
    SetMetadata(MetadataUpdate),
    RestoreOriginal,

    AddPage(AddPageOptions),
    DeletePage(PageId),
    RotatePage { page_id: PageId, degrees: i32 },
    ReorderPages(Vec<PageId>),
    Merge { source: DocumentSource, at: Option<usize> },

    AddText { page_id: PageId, options: TextOptions },
    AddImage { page_id: PageId, options: ImageOptions },
    AddDrawing { page_id: PageId, options: DrawingOptions },
    AddAnnotation { page_id: PageId, options: AnnotationOptions },
    AddFormField { page_id: PageId, options: FormFieldOptions },
    AddSignature { page_id: PageId, options: SignatureOptions },
    UpdateElement { id: EntityId, update: ElementUpdate },
    DeleteElement(EntityId),
    AddWatermark(WatermarkOptions),
    RemoveWatermark(EntityId),

    Undo,
    Redo,

    Select(EntityId),
    SelectMany(Vec<EntityId>),
    AddToSelection(EntityId),
    ToggleSelection(EntityId),
    ClearSelection,
    /// Selects everything on the current page.
    SelectAll,
    Copy,
    Cut,
    /// Pastes onto the given page, or the current page when `None`.
    Paste { page_id: Option<PageId> },
    DeleteSelected,

    View(ViewAction),
}

impl EditorAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::CreateNew { .. } => "create",
            Self::Save(_) => "save",
            Self::Export(_) => "export",
            Self::SetMetadata(_) => "set metadata",
            Self::RestoreOriginal => "restore original",
            Self::AddPage(_) => "add page",
            Self::DeletePage(_) => "delete page",
            Self::RotatePage { .. } => "rotate page",
            Self::ReorderPages(_) => "reorder pages",
            Self::Merge { .. } => "merge",
            Self::AddText { .. } => "add text",
            Self::AddImage { .. } => "add image",
            Self::AddDrawing { .. } => "add drawing",
            Self::AddAnnotation { .. } => "add annotation",
            Self::AddFormField { .. } => "add form field",
            Self::AddSignature { .. } => "add signature",
            Self::UpdateElement { .. } => "update element",
            Self::DeleteElement(_) => "delete element",
            Self::AddWatermark(_) => "add watermark",
            Self::RemoveWatermark(_) => "remove watermark",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Select(_)
            | Self::SelectMany(_)
            | Self::AddToSelection(_)
            | Self::ToggleSelection(_)
            | Self::ClearSelection
            | Self::SelectAll => "select",
            Self::Copy => "copy",
            Self::Cut => "cut",
            Self::Paste { .. } => "paste",
            Self::DeleteSelected => "delete selection",
            Self::View(_) => "view",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Applied,
    /// Nothing to do, e.g. undo with no past.
    Unchanged,
    /// Id of the page, element or watermark the action created.
    Created(EntityId),
    Pasted(Vec<EntityId>),
    Bytes(Vec<u8>),
}

/// Everything a UI needs to draw the editor, captured after one action.
#[derive(Debug, Clone, Default)]
pub struct EditorSnapshot {
    pub document: Option<Document>,
    pub selection: Vec<EntityId>,
    pub view: ViewState,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_label: Option<String>,
    pub redo_label: Option<String>,
    pub loading: bool,
    pub saving: bool,
    pub has_clipboard: bool,
    pub last_error: Option<String>,
}

type Listener = Box<dyn FnMut(&EditorSnapshot)>;

pub struct Store {
    manager: DocumentManager,
    history: History,
    selection: Selection,
    clipboard: Option<Clipboard>,
    view: ViewState,
    loading: bool,
    saving: bool,
    last_error: Option<String>,
    snapshot: Arc<EditorSnapshot>,
    listeners: Vec<Listener>,
}

impl Store {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_manager(DocumentManager::new(config))
    }

    pub fn with_manager(manager: DocumentManager) -> Self {
        let history = History::new(manager.config().history_limit);
        let mut store = Self {
            manager,
            history,
            selection: Selection::default(),
            clipboard: None,
            view: ViewState::default(),
            loading: false,
            saving: false,
            last_error: None,
            snapshot: Arc::default(),
            listeners: Vec::new(),
        };
        store.publish();
        store
    }

    pub fn snapshot(&self) -> Arc<EditorSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn manager(&self) -> &DocumentManager {
        &self.manager
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    /// Calls `listener` with every snapshot published from now on.
    pub fn subscribe(&mut self, listener: impl FnMut(&EditorSnapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Applies one action. A failed action leaves document, history and
    /// selection as they were and is reported in the snapshot's
    /// `last_error`.
    pub fn dispatch(&mut self, action: EditorAction) -> EditResult<DispatchOutcome> {
        let name = action.name();
        let result = self.apply(action);
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => {
                log::warn!("{name} failed: {err}");
                self.last_error = Some(err.to_string());
            }
        }
        self.loading = false;
        self.saving = false;
        self.publish();
        result
    }

    /// Standalone graphs per page range; the open document is untouched.
    pub fn split_document(&self, ranges: &[PageRange]) -> EditResult<Vec<PdfGraph>> {
        self.manager.split_document(ranges)
    }

    pub fn extract_pages(&self, numbers: &[u32]) -> EditResult<PdfGraph> {
        self.manager.extract_pages(numbers)
    }

    fn apply(&mut self, action: EditorAction) -> EditResult<DispatchOutcome> {
        use DispatchOutcome::{Applied, Bytes, Created, Pasted, Unchanged};

        match action {
            EditorAction::Load(source) => {
                self.loading = true;
                self.publish();
                self.manager.load(source)?;
                self.opened()?;
                Ok(Applied)
            }
            EditorAction::CreateNew { page_count } => {
                self.manager.create_new(page_count)?;
                self.opened()?;
                Ok(Applied)
            }
            EditorAction::Save(options) => {
                self.saving = true;
                self.publish();
                Ok(Bytes(self.manager.save(&options)?))
            }
            EditorAction::Export(format) => {
                self.saving = true;
                self.publish();
                Ok(Bytes(self.manager.export_document(&format)?))
            }
            EditorAction::SetMetadata(update) => {
                if update.is_empty() {
                    return Ok(Unchanged);
                }
                self.manager.set_metadata(&update)?;
                self.record(ActionKind::SetMetadata, json!({ "title": update.title, "author": update.author }))?;
                Ok(Applied)
            }
            EditorAction::RestoreOriginal => {
                self.manager.restore_original()?;
                self.selection.clear();
                self.record(ActionKind::RestoreOriginal, json!({}))?;
                Ok(Applied)
            }

            EditorAction::AddPage(options) => {
                let page = self.manager.add_page(options)?;
                self.record(ActionKind::AddPage, json!({ "page_id": page.id, "number": page.number }))?;
                Ok(Created(page.id))
            }
            EditorAction::DeletePage(page_id) => {
                let page = self.manager.delete_page(page_id)?;
                self.record(
                    ActionKind::DeletePage,
                    json!({ "page_id": page_id, "number": page.number, "elements": page.element_count() }),
                )?;
                Ok(Applied)
            }
            EditorAction::RotatePage { page_id, degrees } => {
                let rotation: PageRotation = self.manager.rotate_page(page_id, degrees)?;
                self.record(
                    ActionKind::RotatePage,
                    json!({ "page_id": page_id, "degrees": degrees, "rotation": rotation.degrees() }),
                )?;
                Ok(Applied)
            }
            EditorAction::ReorderPages(order) => {
                self.manager.reorder_pages(&order)?;
                self.record(ActionKind::ReorderPages, json!({ "order": order }))?;
                Ok(Applied)
            }
            EditorAction::Merge { source, at } => {
                let name = source.display_name();
                let pages = self.manager.merge_document(source, at)?;
                self.record(ActionKind::Merge, json!({ "source": name, "pages": pages }))?;
                Ok(Applied)
            }

            EditorAction::AddText { page_id, options } => {
                let text = self.manager.add_text(page_id, options)?;
                self.record_element("Add Text", text.id, page_id)?;
                Ok(Created(text.id))
            }
            EditorAction::AddImage { page_id, options } => {
                let image = self.manager.add_image(page_id, options)?;
                self.record_element("Add Image", image.id, page_id)?;
                Ok(Created(image.id))
            }
            EditorAction::AddDrawing { page_id, options } => {
                let drawing = self.manager.add_drawing(page_id, options)?;
                self.record_element("Add Drawing", drawing.id, page_id)?;
                Ok(Created(drawing.id))
            }
            EditorAction::AddAnnotation { page_id, options } => {
                let annotation = self.manager.add_annotation(page_id, options)?;
                self.record_element("Add Annotation", annotation.id, page_id)?;
                Ok(Created(annotation.id))
            }
            EditorAction::AddFormField { page_id, options } => {
                let field = self.manager.add_form_field(page_id, options)?;
                self.record_element("Add Form Field", field.id, page_id)?;
                Ok(Created(field.id))
            }
            EditorAction::AddSignature { page_id, options } => {
                let signature = self.manager.add_signature(page_id, options)?;
                self.record_element("Add Signature", signature.id, page_id)?;
                Ok(Created(signature.id))
            }
            EditorAction::UpdateElement { id, update } => {
                let entity = self.manager.update_element(id, &update)?;
                self.record(ActionKind::UpdateElement, json!({ "id": id, "kind": entity.kind().label() }))?;
                Ok(Applied)
            }
            EditorAction::DeleteElement(id) => {
                let entity = self.manager.delete_element(id)?;
                self.selection.retain_existing(self.manager.require_document()?);
                self.record(ActionKind::DeleteElement, json!({ "ids": [id], "kind": entity.kind().label() }))?;
                Ok(Applied)
            }
            EditorAction::AddWatermark(options) => {
                let watermark = self.manager.add_watermark(options)?;
                self.record(ActionKind::AddWatermark, json!({ "id": watermark.id, "pages": watermark.applied.len() }))?;
                Ok(Created(watermark.id))
            }
            EditorAction::RemoveWatermark(id) => {
                self.manager.remove_watermark(id)?;
                self.record(ActionKind::RemoveWatermark, json!({ "id": id }))?;
                Ok(Applied)
            }

            EditorAction::Undo => {
                let Some(entry) = self.history.undo() else {
                    return Ok(Unchanged);
                };
                log::debug!("undo to {}", entry.label);
                self.manager.restore(entry.snapshot())?;
                self.selection.retain_existing(self.manager.require_document()?);
                Ok(Applied)
            }
            EditorAction::Redo => {
                let Some(entry) = self.history.redo() else {
                    return Ok(Unchanged);
                };
                log::debug!("redo {}", entry.label);
                self.manager.restore(entry.snapshot())?;
                self.selection.retain_existing(self.manager.require_document()?);
                Ok(Applied)
            }

            EditorAction::Select(id) => {
                self.require_entities(&[id])?;
                self.selection.select(id);
                Ok(Applied)
            }
            EditorAction::SelectMany(ids) => {
                self.require_entities(&ids)?;
                self.selection.select_many(ids);
                Ok(Applied)
            }
            EditorAction::AddToSelection(id) => {
                self.require_entities(&[id])?;
                Ok(if self.selection.add(id) { Applied } else { Unchanged })
            }
            EditorAction::ToggleSelection(id) => {
                self.require_entities(&[id])?;
                self.selection.toggle(id);
                Ok(Applied)
            }
            EditorAction::ClearSelection => {
                if self.selection.is_empty() {
                    return Ok(Unchanged);
                }
                self.selection.clear();
                Ok(Applied)
            }
            EditorAction::SelectAll => {
                let page_id = self.current_page_id().ok_or(EditError::NotLoaded)?;
                self.selection.select_all(self.manager.require_document()?, page_id);
                Ok(Applied)
            }
            EditorAction::Copy => {
                match Clipboard::capture(&self.selection, self.manager.require_document()?) {
                    Some(clipboard) => {
                        log::debug!("copied {} element(s)", clipboard.len());
                        self.clipboard = Some(clipboard);
                        Ok(Applied)
                    }
                    None => Ok(Unchanged),
                }
            }
            EditorAction::Cut => {
                let Some(clipboard) = Clipboard::capture(&self.selection, self.manager.require_document()?) else {
                    return Ok(Unchanged);
                };
                let ids: Vec<EntityId> = self.selection.ids().collect();
                self.manager.delete_elements(&ids)?;
                self.clipboard = Some(clipboard);
                self.selection.clear();
                self.record(ActionKind::Cut, json!({ "ids": ids }))?;
                Ok(Applied)
            }
            EditorAction::Paste { page_id } => {
                let clipboard = self
                    .clipboard
                    .as_ref()
                    .filter(|clipboard| !clipboard.is_empty())
                    .ok_or_else(|| EditError::InvalidArgument("clipboard is empty".to_owned()))?;
                let document = self.manager.require_document()?;
                let target = match page_id {
                    Some(page_id) => document.page(page_id).map(|page| page.id).ok_or_else(|| EditError::page_not_found(page_id))?,
                    None => clipboard.paste_target(self.current_page_id(), document).ok_or(EditError::NotLoaded)?,
                };
                let entries = clipboard.entries().to_vec();

                let offset = self.manager.config().paste_offset;
                let pasted = self.manager.paste_entities(&entries, target, offset)?;
                let ids: Vec<EntityId> = pasted.iter().map(|entity| entity.id()).collect();
                self.record(ActionKind::Paste, json!({ "ids": ids, "page_id": target }))?;
                Ok(Pasted(ids))
            }
            EditorAction::DeleteSelected => {
                if self.selection.is_empty() {
                    return Ok(Unchanged);
                }
                let ids: Vec<EntityId> = self.selection.ids().collect();
                self.manager.delete_elements(&ids)?;
                self.selection.clear();
                self.history_entry(ActionKind::DeleteElement, json!({ "ids": ids }), Some("Delete Selection"))?;
                Ok(Applied)
            }

            EditorAction::View(action) => {
                apply_view_action(&mut self.view, action);
                Ok(Applied)
            }
        }
    }

    /// Starts history over for a freshly opened document.
    fn opened(&mut self) -> EditResult<()> {
        let document = self.manager.require_document()?;
        let baseline = json!({ "name": document.name, "pages": document.page_count() });
        self.history.reset(HistoryEntry::new(ActionKind::Open, baseline, self.manager.snapshot()?));
        self.selection.clear();
        apply_view_action(&mut self.view, ViewAction::PagesChanged { page_count: document.page_count() as u32 });
        apply_view_action(&mut self.view, ViewAction::SetCurrentPage(1));
        Ok(())
    }

    fn record(&mut self, kind: ActionKind, detail: serde_json::Value) -> EditResult<()> {
        self.history_entry(kind, detail, None)
    }

    fn record_element(&mut self, label: &str, id: EntityId, page_id: PageId) -> EditResult<()> {
        self.history_entry(ActionKind::AddElement, json!({ "id": id, "page_id": page_id }), Some(label))
    }

    fn history_entry(&mut self, kind: ActionKind, detail: serde_json::Value, label: Option<&str>) -> EditResult<()> {
        let mut entry = HistoryEntry::new(kind, detail, self.manager.snapshot()?);
        if let Some(label) = label {
            entry = entry.with_label(label);
        }
        self.history.record(entry);
        Ok(())
    }

    fn require_entities(&self, ids: &[EntityId]) -> EditResult<()> {
        let document = self.manager.require_document()?;
        match ids.iter().find(|id| !document.contains_entity(**id)) {
            Some(missing) => Err(EditError::element_not_found(*missing)),
            None => Ok(()),
        }
    }

    fn current_page_id(&self) -> Option<PageId> {
        let document = self.manager.document()?;
        document.page_by_number(self.view.current_page).map(|page| page.id)
    }

    fn publish(&mut self) {
        let page_count = self.manager.document().map_or(0, Document::page_count) as u32;
        if page_count != self.view.page_count {
            apply_view_action(&mut self.view, ViewAction::PagesChanged { page_count });
        }

        let snapshot = Arc::new(EditorSnapshot {
            document: self.manager.document().cloned(),
            selection: self.selection.ids().collect(),
            view: self.view,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            undo_label: self.history.undo_label().map(str::to_owned),
            redo_label: self.history.redo_label().map(str::to_owned),
            loading: self.loading,
            saving: self.saving,
            has_clipboard: self.clipboard.as_ref().is_some_and(|clipboard| !clipboard.is_empty()),
            last_error: self.last_error.clone(),
        });
        self.snapshot = Arc::clone(&snapshot);
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use doc_model::{Entity, Tool};

    fn store_with(pages: usize) -> Store {
        let mut store = Store::new(EditorConfig::default());
        store.dispatch(EditorAction::CreateNew { page_count: pages }).expect("document created");
        store
    }

    fn first_page(store: &Store) -> PageId {
        store.snapshot().document.as_ref().expect("document").pages[0].id
    }

    fn add_text(store: &mut Store, page_id: PageId, content: &str) -> EntityId {
        let outcome = store
            .dispatch(EditorAction::AddText { page_id, options: TextOptions::new(content, 10.0, 20.0) })
            .expect("text");
        match outcome {
            DispatchOutcome::Created(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn fresh_document_has_nothing_to_undo() {
        let mut store = store_with(1);
        let snapshot = store.snapshot();
        assert!(!snapshot.can_undo && !snapshot.can_redo);
        assert_eq!(snapshot.view.page_count, 1);
        assert_eq!(store.dispatch(EditorAction::Undo).expect("undo"), DispatchOutcome::Unchanged);
    }

    #[test]
    fn undo_and_redo_restore_snapshots() {
        let mut store = store_with(1);
        let page_id = first_page(&store);
        add_text(&mut store, page_id, "one");
        store.dispatch(EditorAction::AddPage(AddPageOptions::default())).expect("page");
        assert_eq!(store.snapshot().undo_label.as_deref(), Some("Add Page"));

        store.dispatch(EditorAction::Undo).expect("undo");
        let snapshot = store.snapshot();
        assert_eq!(snapshot.document.as_ref().expect("document").page_count(), 1);
        assert_eq!(snapshot.view.page_count, 1);
        assert_eq!(snapshot.redo_label.as_deref(), Some("Add Page"));
        assert_eq!(snapshot.undo_label.as_deref(), Some("Add Text"));

        store.dispatch(EditorAction::Undo).expect("undo");
        assert_eq!(store.manager().document().expect("document").pages[0].element_count(), 0);
        assert!(!store.snapshot().can_undo);

        store.dispatch(EditorAction::Redo).expect("redo");
        store.dispatch(EditorAction::Redo).expect("redo");
        assert_eq!(store.manager().graph().expect("graph").page_count(), 2);
        assert!(!store.snapshot().can_redo);
    }

    #[test]
    fn failures_are_reported_and_leave_state_alone() {
        let mut store = store_with(1);
        let page_id = first_page(&store);
        let err = store.dispatch(EditorAction::DeletePage(page_id)).expect_err("last page");
        assert!(matches!(err, EditError::LastPage));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.last_error.as_deref(), Some("cannot delete the only remaining page"));
        assert!(!snapshot.can_undo);

        store.dispatch(EditorAction::View(ViewAction::SetTool(Tool::Text))).expect("tool");
        assert_eq!(store.snapshot().last_error, None);
        assert_eq!(store.snapshot().view.tool, Tool::Text);
    }

    #[test]
    fn selecting_unknown_elements_fails() {
        let mut store = store_with(1);
        let err = store.dispatch(EditorAction::Select(EntityId::new_v4())).expect_err("unknown");
        assert!(matches!(err, EditError::NotFound { kind: "element", .. }));
        assert!(store.snapshot().selection.is_empty());
    }

    #[test]
    fn paste_needs_a_clipboard() {
        let mut store = store_with(1);
        let err = store.dispatch(EditorAction::Paste { page_id: None }).expect_err("empty clipboard");
        assert!(matches!(err, EditError::InvalidArgument(_)));
    }

    #[test]
    fn copy_paste_leaves_selection_alone() {
        let mut store = store_with(2);
        let page_id = first_page(&store);
        let original = add_text(&mut store, page_id, "stamp");

        store.dispatch(EditorAction::Select(original)).expect("select");
        store.dispatch(EditorAction::Copy).expect("copy");
        assert!(store.snapshot().has_clipboard);

        let second = store.snapshot().document.as_ref().expect("document").pages[1].id;
        let DispatchOutcome::Pasted(ids) =
            store.dispatch(EditorAction::Paste { page_id: Some(second) }).expect("paste")
        else {
            panic!("paste outcome");
        };
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], original);
        assert_eq!(store.snapshot().selection, vec![original]);

        let document = store.manager().document().expect("document");
        let Some(Entity::Text(copy)) = document.find_entity(ids[0]) else { panic!("pasted text") };
        assert_eq!(copy.content, "stamp");
        assert_eq!(copy.page_id, second);
    }

    #[test]
    fn cut_removes_and_keeps_a_copy() {
        let mut store = store_with(1);
        let page_id = first_page(&store);
        let first = add_text(&mut store, page_id, "a");
        let second = add_text(&mut store, page_id, "b");

        store.dispatch(EditorAction::SelectAll).expect("select all");
        assert_eq!(store.snapshot().selection, vec![first, second]);
        store.dispatch(EditorAction::Cut).expect("cut");

        let snapshot = store.snapshot();
        assert!(snapshot.selection.is_empty());
        assert!(snapshot.has_clipboard);
        assert_eq!(snapshot.document.as_ref().expect("document").pages[0].element_count(), 0);
        assert_eq!(snapshot.undo_label.as_deref(), Some("Cut"));

        store.dispatch(EditorAction::Undo).expect("undo cut");
        assert_eq!(store.manager().document().expect("document").pages[0].element_count(), 2);
    }

    #[test]
    fn delete_selected_is_one_step() {
        let mut store = store_with(1);
        let page_id = first_page(&store);
        let ids = vec![add_text(&mut store, page_id, "a"), add_text(&mut store, page_id, "b")];
        store.dispatch(EditorAction::SelectMany(ids)).expect("select");
        store.dispatch(EditorAction::DeleteSelected).expect("delete");
        assert_eq!(store.snapshot().undo_label.as_deref(), Some("Delete Selection"));
        assert_eq!(store.dispatch(EditorAction::DeleteSelected).expect("nothing"), DispatchOutcome::Unchanged);

        store.dispatch(EditorAction::Undo).expect("undo");
        assert_eq!(store.manager().document().expect("document").pages[0].element_count(), 2);
    }

    #[test]
    fn listeners_see_load_progress() {
        let mut store = Store::new(EditorConfig::default());
        let bytes = {
            let mut source = store_with(2);
            match source.dispatch(EditorAction::Save(SaveOptions::default())).expect("save") {
                DispatchOutcome::Bytes(bytes) => bytes,
                other => panic!("unexpected outcome {other:?}"),
            }
        };

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.loading));
        store.dispatch(EditorAction::Load(DocumentSource::Bytes(bytes))).expect("load");

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert_eq!(store.snapshot().view.page_count, 2);
        assert!(!store.snapshot().loading);
    }
}
