use doc_model::{to_document_space, to_ui_space, AnnotationKind, Color, Entity, FormFieldKind, Point, Size};
use pdf_editor_core::{
    AddPageOptions, AnnotationOptions, DispatchOutcome, DocumentSource, EditError, EditorAction, EditorConfig,
    ElementUpdate, FormFieldOptions, SaveOptions, Store, TextOptions, WatermarkOptions,
};
use proptest::prelude::*;

fn open(pages: usize) -> Store {
    let mut store = Store::new(EditorConfig::default());
    store.dispatch(EditorAction::CreateNew { page_count: pages }).expect("document created");
    store
}

fn page_id(store: &Store, index: usize) -> uuid::Uuid {
    store.manager().document().expect("document").pages[index].id
}

fn save(store: &mut Store) -> Vec<u8> {
    match store.dispatch(EditorAction::Save(SaveOptions::default())).expect("save") {
        DispatchOutcome::Bytes(bytes) => bytes,
        other => panic!("unexpected outcome {other:?}"),
    }
}

fn reload(bytes: Vec<u8>) -> Store {
    let mut store = Store::new(EditorConfig::default());
    store.dispatch(EditorAction::Load(DocumentSource::Bytes(bytes))).expect("reload");
    store
}

fn created(outcome: DispatchOutcome) -> uuid::Uuid {
    match outcome {
        DispatchOutcome::Created(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    }
}

fn texts(store: &Store) -> Vec<String> {
    let document = store.manager().document().expect("document");
    document.pages[0].texts.iter().map(|text| text.content.clone()).collect()
}

fn text_id(store: &Store, content: &str) -> uuid::Uuid {
    let document = store.manager().document().expect("document");
    document.pages[0].texts.iter().find(|text| text.content == content).map(|text| text.id).expect("text")
}

#[test]
fn rotated_page_with_text_survives_a_reload() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    store
        .dispatch(EditorAction::AddText { page_id: page, options: TextOptions::new("Hello", 50.0, 50.0) })
        .expect("text");
    store.dispatch(EditorAction::RotatePage { page_id: page, degrees: 90 }).expect("rotate");
    assert_eq!(store.snapshot().document.as_ref().expect("document").pages[0].size(), Size::new(792.0, 612.0));

    let bytes = save(&mut store);
    let mut reopened = Store::new(EditorConfig::default());
    reopened.dispatch(EditorAction::Load(DocumentSource::Bytes(bytes))).expect("reload");

    let snapshot = reopened.snapshot();
    let document = snapshot.document.as_ref().expect("document");
    assert_eq!(document.page_count(), 1);
    assert_eq!(document.pages[0].size(), Size::new(792.0, 612.0));
    assert!(document.pages[0].texts.iter().any(|text| text.content == "Hello"));
    assert!(!snapshot.can_undo);
}

#[test]
fn graph_and_model_stay_in_step() {
    let mut store = open(2);
    let first = page_id(&store, 0);
    store.dispatch(EditorAction::AddPage(AddPageOptions { size: None, position: Some(0) })).expect("page");
    store.dispatch(EditorAction::AddWatermark(WatermarkOptions::text("DRAFT", 36.0))).expect("watermark");
    store.dispatch(EditorAction::DeletePage(first)).expect("delete");

    let manager = store.manager();
    let document = manager.document().expect("document");
    assert_eq!(manager.graph().expect("graph").page_count(), document.page_count());
    assert_eq!(document.pages.iter().map(|page| page.number).collect::<Vec<_>>(), vec![1, 2]);
    assert!(document.watermarks[0].applied.iter().all(|applied| applied.page_id != first));

    store.dispatch(EditorAction::Undo).expect("undo delete");
    let manager = store.manager();
    assert_eq!(manager.graph().expect("graph").page_count(), 3);
    assert_eq!(manager.document().expect("document").pages[1].id, first);
}

#[test]
fn undo_rotation_restores_size() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    store.dispatch(EditorAction::RotatePage { page_id: page, degrees: -90 }).expect("rotate");
    assert_eq!(store.snapshot().undo_label.as_deref(), Some("Rotate Page"));

    store.dispatch(EditorAction::Undo).expect("undo");
    let snapshot = store.snapshot();
    assert_eq!(snapshot.document.as_ref().expect("document").pages[0].size(), Size::new(612.0, 792.0));
    assert_eq!(snapshot.redo_label.as_deref(), Some("Rotate Page"));
    assert_eq!(store.manager().graph().expect("graph").rotation(0).expect("rotation"), 0);
}

#[test]
fn new_action_after_undo_drops_redo() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    store.dispatch(EditorAction::AddText { page_id: page, options: TextOptions::new("a", 10.0, 10.0) }).expect("a");
    store.dispatch(EditorAction::Undo).expect("undo");
    assert!(store.snapshot().can_redo);

    store.dispatch(EditorAction::AddText { page_id: page, options: TextOptions::new("b", 10.0, 10.0) }).expect("b");
    let snapshot = store.snapshot();
    assert!(!snapshot.can_redo);
    assert_eq!(store.dispatch(EditorAction::Redo).expect("redo"), DispatchOutcome::Unchanged);

    let texts = &snapshot.document.as_ref().expect("document").pages[0].texts;
    assert_eq!(texts.iter().map(|text| text.content.as_str()).collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn cut_then_paste_moves_elements_to_another_page() {
    let mut store = open(2);
    let (first, second) = (page_id(&store, 0), page_id(&store, 1));
    let DispatchOutcome::Created(id) = store
        .dispatch(EditorAction::AddText { page_id: first, options: TextOptions::new("moving", 100.0, 100.0) })
        .expect("text")
    else {
        panic!("text outcome");
    };

    store.dispatch(EditorAction::Select(id)).expect("select");
    store.dispatch(EditorAction::Cut).expect("cut");
    let DispatchOutcome::Pasted(ids) =
        store.dispatch(EditorAction::Paste { page_id: Some(second) }).expect("paste")
    else {
        panic!("paste outcome");
    };

    let document = store.manager().document().expect("document");
    assert_eq!(document.pages[0].element_count(), 0);
    let Some(Entity::Text(text)) = document.find_entity(ids[0]) else { panic!("pasted text") };
    assert_eq!(text.page_id, second);
    assert_eq!(text.content, "moving");
    assert_eq!(text.frame.origin(), Point::new(110.0, 682.0));
}

#[test]
fn operations_without_a_document_fail_cleanly() {
    let mut store = Store::new(EditorConfig::default());
    let err = store.dispatch(EditorAction::AddPage(AddPageOptions::default())).expect_err("no document");
    assert!(matches!(err, EditError::NotLoaded));
    assert_eq!(store.snapshot().last_error.as_deref(), Some("no document is loaded"));
    assert!(store.snapshot().document.is_none());
}

#[test]
fn deleted_text_stays_deleted_after_saving_again() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    store.dispatch(EditorAction::AddText { page_id: page, options: TextOptions::new("Hello", 50.0, 50.0) }).expect("text");
    let mut store = reload(save(&mut store));

    let hello = text_id(&store, "Hello");
    store.dispatch(EditorAction::DeleteElement(hello)).expect("delete");
    assert!(texts(&store).is_empty());

    let reopened = reload(save(&mut store));
    assert!(texts(&reopened).is_empty());
}

#[test]
fn undoing_a_delete_of_file_text_restores_it_on_disk() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    store.dispatch(EditorAction::AddText { page_id: page, options: TextOptions::new("Keep", 50.0, 50.0) }).expect("text");
    let mut store = reload(save(&mut store));

    store.dispatch(EditorAction::DeleteElement(text_id(&store, "Keep"))).expect("delete");
    store.dispatch(EditorAction::Undo).expect("undo");

    assert_eq!(texts(&reload(save(&mut store))), vec!["Keep"]);
}

#[test]
fn edited_text_replaces_the_original_after_reload() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    for (content, y) in [("Title", 50.0), ("Body", 100.0)] {
        store.dispatch(EditorAction::AddText { page_id: page, options: TextOptions::new(content, 50.0, y) }).expect("text");
    }
    let mut store = reload(save(&mut store));

    let update = ElementUpdate {
        content: Some("Heading".to_owned()),
        position: Some(Point::new(80.0, 40.0)),
        ..ElementUpdate::default()
    };
    store.dispatch(EditorAction::UpdateElement { id: text_id(&store, "Title"), update }).expect("update");

    let reopened = reload(save(&mut store));
    let mut contents = texts(&reopened);
    contents.sort();
    assert_eq!(contents, vec!["Body", "Heading"]);
    let document = reopened.manager().document().expect("document");
    let heading = document.pages[0].texts.iter().find(|text| text.content == "Heading").expect("heading");
    assert_eq!(to_ui_space(heading.frame.origin(), 792.0, 0.0), Point::new(80.0, 40.0));
}

#[test]
fn annotation_edits_survive_a_reload() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    let size = Size::new(120.0, 14.0);
    let mut note = AnnotationOptions::new(AnnotationKind::Highlight, Point::new(40.0, 60.0), size);
    note.contents = Some("first pass".to_owned());
    let kept = created(store.dispatch(EditorAction::AddAnnotation { page_id: page, options: note }).expect("highlight"));
    let dropped = created(
        store
            .dispatch(EditorAction::AddAnnotation {
                page_id: page,
                options: AnnotationOptions::new(AnnotationKind::Underline, Point::new(40.0, 90.0), size),
            })
            .expect("underline"),
    );
    let mut store = reload(save(&mut store));

    let update = ElementUpdate {
        content: Some("second pass".to_owned()),
        color: Some(Color::RED),
        ..ElementUpdate::default()
    };
    store.dispatch(EditorAction::UpdateElement { id: kept, update }).expect("update annotation");
    store.dispatch(EditorAction::DeleteElement(dropped)).expect("delete annotation");

    let reopened = reload(save(&mut store));
    let document = reopened.manager().document().expect("document");
    let annotations = &document.pages[0].annotations;
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].id, kept);
    assert_eq!(annotations[0].contents.as_deref(), Some("second pass"));
    assert_eq!(annotations[0].color, Color::RED);
    assert_eq!(reopened.manager().graph().expect("graph").annotations(0).expect("annots").len(), 1);
}

#[test]
fn form_field_edits_survive_a_reload() {
    let mut store = open(1);
    let page = page_id(&store, 0);
    let email = FormFieldOptions::new(FormFieldKind::Text, "email", Point::new(40.0, 60.0), Size::new(160.0, 20.0));
    let agree = FormFieldOptions::new(FormFieldKind::Checkbox, "agree", Point::new(40.0, 100.0), Size::new(12.0, 12.0));
    let email = created(store.dispatch(EditorAction::AddFormField { page_id: page, options: email }).expect("email"));
    let agree = created(store.dispatch(EditorAction::AddFormField { page_id: page, options: agree }).expect("agree"));
    let mut store = reload(save(&mut store));

    let update = ElementUpdate {
        content: Some("ops@example.com".to_owned()),
        position: Some(Point::new(60.0, 60.0)),
        ..ElementUpdate::default()
    };
    store.dispatch(EditorAction::UpdateElement { id: email, update }).expect("update field");
    store.dispatch(EditorAction::DeleteElement(agree)).expect("delete field");

    let reopened = reload(save(&mut store));
    let document = reopened.manager().document().expect("document");
    let fields = &document.pages[0].form_fields;
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].id, email);
    assert_eq!(fields[0].name, "email");
    assert_eq!(fields[0].default_value.as_deref(), Some("ops@example.com"));
    assert_eq!(fields[0].rect.ui_origin(792.0), Point::new(60.0, 60.0));
    assert_eq!(reopened.manager().graph().expect("graph").field_ids().len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ui_and_document_space_round_trip(
        x in 0.0f32..2000.0,
        y in 0.0f32..2000.0,
        page_height in 100.0f32..2000.0,
        element_height in 0.0f32..200.0,
    ) {
        let ui = Point::new(x, y);
        let back = to_ui_space(to_document_space(ui, page_height, element_height), page_height, element_height);
        prop_assert!((back.x - ui.x).abs() < 1e-3);
        prop_assert!((back.y - ui.y).abs() < 1e-2);
    }
}
