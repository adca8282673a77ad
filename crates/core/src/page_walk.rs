//! Builds model pages from a decoded graph: page geometry, text runs,
//! annotations and form widgets.

use doc_model::{
    now_timestamp, Annotation, AnnotationKind, Color, ContentOrigin, FontFamily, FormField, FormFieldKind, Frame,
    ObjectRef, Page, PageRotation, Rect, Size, TextElement, TextStyle,
};
use pdf_engine::{decode_text_string, Dictionary, Object, ObjectId, PdfGraph, TextExtractor, TextRun};
use uuid::Uuid;

use crate::document_manager::parse_pdf_date;
use crate::error::EditResult;

/// `/Ff` bit marking a required field.
pub(crate) const FLAG_REQUIRED: i64 = 1 << 1;
/// `/Ff` bit turning a button field into a radio button.
pub(crate) const FLAG_RADIO: i64 = 1 << 15;
/// `/Ff` bit turning a choice field into a combo box.
pub(crate) const FLAG_COMBO: i64 = 1 << 17;

pub(crate) fn walk_pages(graph: &PdfGraph, extractor: &dyn TextExtractor) -> EditResult<Vec<Page>> {
    (0..graph.page_count()).map(|index| walk_page(graph, extractor, index)).collect()
}

/// Model page for graph page `index`. Width and height are as displayed,
/// so a page turned a quarter reports its MediaBox extent swapped.
pub(crate) fn walk_page(graph: &PdfGraph, extractor: &dyn TextExtractor, index: usize) -> EditResult<Page> {
    let media = graph.page_size(index)?;
    let rotation = PageRotation::from_degrees(graph.rotation(index)?).unwrap_or_default();
    let mut size = Size::new(media.width_pt, media.height_pt);
    if rotation.is_quarter_turn() {
        size = size.swapped();
    }

    let mut page = Page::new(index as u32 + 1, size);
    page.rotation = rotation;
    let mut z_index = 0;
    let mut next_z = || {
        z_index += 1;
        z_index
    };

    match extractor.text_runs(graph, index) {
        Ok(runs) => {
            for run in runs {
                let text = text_from_run(graph, index, page.id, &run, next_z());
                page.texts.push(text);
            }
        }
        Err(err) => log::warn!("skipping text of page {}: {err}", index + 1),
    }

    for (object_id, dict) in graph.annotations(index)? {
        let subtype = name_of(&dict, b"Subtype");
        if subtype.as_deref() == Some("Widget") {
            match field_from_dict(graph, &dict, page.id, object_id) {
                Some(mut field) => {
                    field.z_index = next_z();
                    page.form_fields.push(field);
                }
                None => log::warn!("skipping unreadable form widget on page {}", index + 1),
            }
            continue;
        }

        let Some(kind) = subtype.as_deref().and_then(AnnotationKind::from_subtype) else {
            log::debug!("ignoring {:?} annotation on page {}", subtype, index + 1);
            continue;
        };
        match annotation_from_dict(&dict, kind, page.id, object_id) {
            Some(mut annotation) => {
                annotation.z_index = next_z();
                page.annotations.push(annotation);
            }
            None => log::warn!("skipping unreadable {} annotation on page {}", kind.subtype(), index + 1),
        }
    }

    page.z_high_water = z_index;
    Ok(page)
}

fn text_from_run(graph: &PdfGraph, index: usize, page_id: Uuid, run: &TextRun, z_index: u32) -> TextElement {
    let font = run
        .font_resource
        .as_deref()
        .and_then(|resource| graph.font_base_name(index, resource))
        .and_then(|base| FontFamily::from_base_font(base.rsplit('+').next().unwrap_or(&base)))
        .unwrap_or_default();

    let [x, y, width, height] = run.bbox;
    let mut frame = Frame::new(Rect::new(x, y, width, height), z_index);
    frame.rotation = run.transform[1].atan2(run.transform[0]).to_degrees();

    TextElement {
        id: Uuid::new_v4(),
        page_id,
        content: run.text.clone(),
        frame,
        style: TextStyle { font, font_size: run.font_size, color: Color::BLACK },
        graph_ref: None,
        origin: run.origin.map(|origin| ContentOrigin { stream: origin.stream.into(), operation: origin.operation }),
    }
}

fn annotation_from_dict(
    dict: &Dictionary,
    kind: AnnotationKind,
    page_id: Uuid,
    object_id: Option<ObjectId>,
) -> Option<Annotation> {
    let rect = rect_of(dict)?;
    let modified_at = text_of(dict, b"M").as_deref().and_then(parse_pdf_date).unwrap_or_else(now_timestamp);
    let created_at = text_of(dict, b"CreationDate").as_deref().and_then(parse_pdf_date).unwrap_or(modified_at);

    Some(Annotation {
        id: id_of(dict),
        page_id,
        kind,
        rect,
        color: color_of(dict).unwrap_or(Color::YELLOW),
        contents: text_of(dict, b"Contents"),
        author: text_of(dict, b"T"),
        created_at,
        modified_at,
        z_index: 0,
        graph_ref: object_id.map(ObjectRef::from),
    })
}

/// Reads a terminal widget; `/FT`, `/T`, `/V` and `/Ff` may sit on its
/// parent field.
fn field_from_dict(
    graph: &PdfGraph,
    dict: &Dictionary,
    page_id: Uuid,
    object_id: Option<ObjectId>,
) -> Option<FormField> {
    let parent = dict.get(b"Parent").ok().and_then(|parent| graph.resolve_dictionary(parent));
    let lookup = |key: &[u8]| dict.get(key).ok().or_else(|| parent.and_then(|parent| parent.get(key).ok()));

    let field_type = lookup(b"FT").and_then(|object| object.as_name().ok())?;
    let flags = lookup(b"Ff").and_then(|object| object.as_i64().ok()).unwrap_or(0);
    let kind = match field_type {
        b"Tx" => FormFieldKind::Text,
        b"Btn" if flags & FLAG_RADIO != 0 => FormFieldKind::Radio,
        b"Btn" => FormFieldKind::Checkbox,
        b"Ch" => FormFieldKind::Dropdown,
        _ => return None,
    };

    let name = lookup(b"T").and_then(|object| object.as_str().ok()).map(decode_text_string)?;
    let default_value = lookup(b"V").and_then(|value| match value {
        Object::Name(name) if name.as_slice() == b"Off" => None,
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    });
    let options = lookup(b"Opt")
        .and_then(|object| object.as_array().ok())
        .map(|items| items.iter().filter_map(option_label).collect())
        .unwrap_or_default();

    Some(FormField {
        id: id_of(dict),
        page_id,
        kind,
        name,
        rect: rect_of(dict)?,
        default_value,
        options,
        required: flags & FLAG_REQUIRED != 0,
        z_index: 0,
        graph_ref: object_id.map(ObjectRef::from),
    })
}

/// Choice options are either text strings or `[export display]` pairs.
fn option_label(item: &Object) -> Option<String> {
    match item {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Array(pair) => pair.last().and_then(|label| label.as_str().ok()).map(decode_text_string),
        _ => None,
    }
}

/// Annotations written here carry their entity id in `/NM`; anything else
/// gets a fresh id.
fn id_of(dict: &Dictionary) -> Uuid {
    text_of(dict, b"NM").and_then(|name| Uuid::parse_str(&name).ok()).unwrap_or_else(Uuid::new_v4)
}

fn name_of(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).and_then(Object::as_name).ok().map(|name| String::from_utf8_lossy(name).into_owned())
}

fn text_of(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).and_then(Object::as_str).ok().map(decode_text_string)
}

fn rect_of(dict: &Dictionary) -> Option<Rect> {
    let values: Vec<f32> = dict
        .get(b"Rect")
        .and_then(Object::as_array)
        .ok()?
        .iter()
        .filter_map(|value| value.as_float().ok())
        .collect();
    let [x0, y0, x1, y1] = values[..] else {
        return None;
    };
    Some(Rect::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs()))
}

fn color_of(dict: &Dictionary) -> Option<Color> {
    let components: Vec<f32> = dict
        .get(b"C")
        .and_then(Object::as_array)
        .ok()?
        .iter()
        .filter_map(|value| value.as_float().ok())
        .collect();
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    match components[..] {
        [gray] => Some(Color::rgb(channel(gray), channel(gray), channel(gray))),
        [r, g, b] => Some(Color::rgb(channel(r), channel(g), channel(b))),
        _ => None,
    }
}
