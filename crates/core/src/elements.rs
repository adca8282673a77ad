//! Placing, editing and removing page elements.
//!
//! Text, images, drawings and signatures painted here each own one content
//! stream appended to their page; annotations and form fields own their
//! annotation dictionary. Repainting rewrites that object in place, so paint
//! order never changes after placement. Text read from an opened file lives
//! inside the file's own streams: deleting it blanks the operation that
//! showed it, and the first edit moves it into a stream of its own.

use std::sync::Arc;

use doc_model::{
    now_timestamp, to_document_space, Annotation, AnnotationKind, Color, Document, DrawingElement,
    DrawingShape, Entity, EntityId, FontFamily, FormField, FormFieldKind, Frame, ImageElement, ImageKind,
    PageId, Point, Rect, Signature, Size, TextElement, TextStyle,
};
use pdf_engine::{
    decode_data_url, encode_text_string, encode_win_ansi, image_ops, rect_object, shape_ops, text_ops,
    Dictionary, ImageFormat, Object, ObjectId, Operation, PdfGraph, Rgb, Shape, ShapePaint, StandardFont,
    TextPaint,
};
use uuid::Uuid;

use crate::document_manager::{is_checked, pdf_date, DocumentManager};
use crate::error::{EditError, EditResult};
use crate::options::{
    AnnotationOptions, DrawingOptions, ElementUpdate, FormFieldOptions, ImageOptions, ImageSource, ShapeInput,
    SignatureOptions, TextOptions,
};
use crate::page_walk::{FLAG_COMBO, FLAG_RADIO, FLAG_REQUIRED};

/// Annotation flag: print the annotation with the page.
const ANNOT_PRINT: i64 = 1 << 2;

impl DocumentManager {
    /// Paints a line of text with its baseline origin at `options.position`.
    pub fn add_text(&mut self, page_id: PageId, options: TextOptions) -> EditResult<TextElement> {
        if options.content.is_empty() {
            return Err(EditError::InvalidArgument("text content is empty".to_owned()));
        }
        check_opacity(options.opacity)?;

        self.transact(|graph, document, config| {
            let (index, page_height) = page_slot(document, page_id)?;
            let style = TextStyle {
                font: options.font.unwrap_or(config.default_font),
                font_size: options.font_size.unwrap_or(config.default_font_size),
                color: options.color,
            };
            check_positive("font size", style.font_size)?;

            let origin = to_document_space(options.position, page_height, 0.0);
            let width = style.font.measure(&options.content, style.font_size);
            let mut frame = Frame::new(Rect::new(origin.x, origin.y, width, style.font_size), document.claim_z_index(page_id)?);
            frame.rotation = options.rotation;
            frame.opacity = options.opacity;

            let mut text = TextElement {
                id: Uuid::new_v4(),
                page_id,
                content: options.content,
                frame,
                style,
                graph_ref: None,
                origin: None,
            };
            paint_text(graph, index, &mut text)?;
            store(document, Entity::Text(text.clone()))?;
            log::debug!("added text {} on page {}", text.id, index + 1);
            Ok(text)
        })
    }

    /// Embeds a PNG or JPEG image with its top-left corner at
    /// `options.position`.
    pub fn add_image(&mut self, page_id: PageId, options: ImageOptions) -> EditResult<ImageElement> {
        check_opacity(options.opacity)?;
        let bytes = image_bytes(options.source)?;

        self.transact(|graph, document, _| {
            let (index, page_height) = page_slot(document, page_id)?;
            let (resource, embedded) = graph.image_resource(index, &bytes).map_err(EditError::embed("image"))?;
            let size = options
                .size
                .unwrap_or_else(|| Size::new(embedded.width_px as f32, embedded.height_px as f32));
            check_size(size)?;

            let rect = Rect::from_ui(options.position, size, page_height);
            let mut frame = Frame::new(rect, document.claim_z_index(page_id)?);
            frame.rotation = options.rotation;
            frame.opacity = options.opacity;

            let mut image = ImageElement {
                id: Uuid::new_v4(),
                page_id,
                frame,
                kind: image_kind(embedded.format),
                data: Arc::from(bytes),
                graph_ref: None,
            };
            let ops = image_element_ops(graph, index, &image.frame, &resource)?;
            image.graph_ref = Some(graph.append_content(index, ops)?.into());
            store(document, Entity::Image(image.clone()))?;
            log::debug!("added {:?} image {} on page {}", image.kind, image.id, index + 1);
            Ok(image)
        })
    }

    pub fn add_drawing(&mut self, page_id: PageId, options: DrawingOptions) -> EditResult<DrawingElement> {
        check_opacity(options.opacity)?;
        if options.stroke.is_none() && options.fill.is_none() {
            return Err(EditError::InvalidArgument("drawing needs a stroke or a fill".to_owned()));
        }
        if let ShapeInput::Path { points, .. } = &options.shape {
            if points.len() < 2 {
                return Err(EditError::InvalidArgument("a path needs at least two points".to_owned()));
            }
        }

        self.transact(|graph, document, _| {
            let (index, page_height) = page_slot(document, page_id)?;
            let (shape, rect) = document_shape(&options.shape, page_height)?;

            let mut frame = Frame::new(rect, document.claim_z_index(page_id)?);
            frame.opacity = options.opacity;
            let mut drawing = DrawingElement {
                id: Uuid::new_v4(),
                page_id,
                frame,
                shape,
                stroke: options.stroke,
                fill: options.fill,
                stroke_width: options.stroke_width.max(0.0),
                graph_ref: None,
            };
            paint_drawing(graph, index, &mut drawing)?;
            store(document, Entity::Drawing(drawing.clone()))?;
            log::debug!("added drawing {} on page {}", drawing.id, index + 1);
            Ok(drawing)
        })
    }

    pub fn add_annotation(&mut self, page_id: PageId, options: AnnotationOptions) -> EditResult<Annotation> {
        check_size(options.size)?;

        self.transact(|graph, document, config| {
            let (index, page_height) = page_slot(document, page_id)?;
            let now = now_timestamp();
            let mut annotation = Annotation {
                id: Uuid::new_v4(),
                page_id,
                kind: options.kind,
                rect: Rect::from_ui(options.position, options.size, page_height),
                color: options.color,
                contents: options.contents,
                author: options.author.or_else(|| config.author.clone()),
                created_at: now,
                modified_at: now,
                z_index: document.claim_z_index(page_id)?,
                graph_ref: None,
            };
            paint_annotation(graph, index, &mut annotation)?;
            store(document, Entity::Annotation(annotation.clone()))?;
            log::debug!("added {} annotation {} on page {}", annotation.kind.subtype(), annotation.id, index + 1);
            Ok(annotation)
        })
    }

    /// Adds an AcroForm widget. Field names are the serialized keys and must
    /// be unique.
    pub fn add_form_field(&mut self, page_id: PageId, options: FormFieldOptions) -> EditResult<FormField> {
        check_size(options.size)?;
        let name = options.name.trim().to_owned();
        if name.is_empty() {
            return Err(EditError::InvalidArgument("form field name is empty".to_owned()));
        }
        if options.kind == FormFieldKind::Dropdown && options.options.is_empty() {
            return Err(EditError::InvalidArgument("a dropdown needs at least one option".to_owned()));
        }

        self.transact(|graph, document, _| {
            if document.form_fields().any(|field| field.name == name) {
                return Err(EditError::InvalidArgument(format!("a form field named {name:?} already exists")));
            }
            let (index, page_height) = page_slot(document, page_id)?;
            let mut field = FormField {
                id: Uuid::new_v4(),
                page_id,
                kind: options.kind,
                name,
                rect: Rect::from_ui(options.position, options.size, page_height),
                default_value: options.default_value,
                options: options.options,
                required: options.required,
                z_index: document.claim_z_index(page_id)?,
                graph_ref: None,
            };
            paint_field(graph, index, &mut field)?;
            store(document, Entity::FormField(field.clone()))?;
            log::debug!("added form field {:?} on page {}", field.name, index + 1);
            Ok(field)
        })
    }

    /// Stamps a signature image. The stamp starts unverified.
    pub fn add_signature(&mut self, page_id: PageId, options: SignatureOptions) -> EditResult<Signature> {
        check_size(options.size)?;
        let bytes = image_bytes(options.image)?;

        self.transact(|graph, document, config| {
            let (index, page_height) = page_slot(document, page_id)?;
            let mut signature = Signature {
                id: Uuid::new_v4(),
                page_id,
                rect: Rect::from_ui(options.position, options.size, page_height),
                image: Arc::from(bytes),
                method: options.method,
                author: options.author.or_else(|| config.author.clone()),
                signed_at: now_timestamp(),
                verified: false,
                z_index: document.claim_z_index(page_id)?,
                graph_ref: None,
            };
            paint_signature(graph, index, &mut signature)?;
            store(document, Entity::Signature(signature.clone()))?;
            log::debug!("added {:?} signature {} on page {}", signature.method, signature.id, index + 1);
            Ok(signature)
        })
    }

    /// Moves, resizes, restyles or toggles an element and repaints it.
    /// Locked elements accept nothing but unlocking.
    pub fn update_element(&mut self, id: EntityId, update: &ElementUpdate) -> EditResult<Entity> {
        if let Some(opacity) = update.opacity {
            check_opacity(opacity)?;
        }
        if let Some(size) = update.size {
            check_size(size)?;
        }
        if let Some(font_size) = update.font_size {
            check_positive("font size", font_size)?;
        }

        self.transact(|graph, document, _| {
            let current = document.find_entity(id).ok_or_else(|| EditError::element_not_found(id))?;
            if current.is_locked() && update.changes_more_than_lock() {
                return Err(EditError::InvalidArgument(format!("element {id} is locked")));
            }
            let (index, page_height) = page_slot(document, current.page_id())?;

            let mut updated = apply_update(current, update, page_height);
            repaint(graph, index, &mut updated)?;
            document.replace_entity(updated.clone());
            document.mark_dirty();
            log::debug!("updated {} {id}", updated.kind().label());
            Ok(updated)
        })
    }

    /// Removes an element and the graph object backing it.
    pub fn delete_element(&mut self, id: EntityId) -> EditResult<Entity> {
        self.transact(|graph, document, _| {
            let entity = document.find_entity(id).ok_or_else(|| EditError::element_not_found(id))?;
            let (index, _) = page_slot(document, entity.page_id())?;
            unpaint(graph, index, &entity)?;
            document.remove_entity(id);
            document.mark_dirty();
            log::debug!("deleted {} {id}", entity.kind().label());
            Ok(entity)
        })
    }

    /// Removes several elements at once; either all of them go or none.
    pub fn delete_elements(&mut self, ids: &[EntityId]) -> EditResult<Vec<Entity>> {
        self.transact(|graph, document, _| {
            let mut removed = Vec::with_capacity(ids.len());
            for id in ids {
                let entity = document.find_entity(*id).ok_or_else(|| EditError::element_not_found(*id))?;
                let (index, _) = page_slot(document, entity.page_id())?;
                unpaint(graph, index, &entity)?;
                document.remove_entity(*id);
                removed.push(entity);
            }
            document.mark_dirty();
            log::debug!("deleted {} element(s)", removed.len());
            Ok(removed)
        })
    }

    /// Places copies of `entities` on `target`, shifted right and down by
    /// `offset`. Every copy gets a new id and a fresh z-index; form field
    /// copies get a unique name.
    pub fn paste_entities(&mut self, entities: &[Entity], target: PageId, offset: f32) -> EditResult<Vec<Entity>> {
        if entities.is_empty() {
            return Err(EditError::InvalidArgument("nothing to paste".to_owned()));
        }

        self.transact(|graph, document, _| {
            let (index, _) = page_slot(document, target)?;
            let mut pasted = Vec::with_capacity(entities.len());
            for source in entities {
                let z_index = document.claim_z_index(target)?;
                let mut copy = relocated_copy(source, target, z_index, offset);
                if let Entity::FormField(field) = &mut copy {
                    field.name = unique_field_name(document, &field.name);
                }
                paint_new(graph, index, &mut copy)?;
                store(document, copy.clone())?;
                pasted.push(copy);
            }
            log::debug!("pasted {} element(s) onto page {}", pasted.len(), index + 1);
            Ok(pasted)
        })
    }
}

pub(crate) fn standard_font(font: FontFamily) -> StandardFont {
    match font {
        FontFamily::Helvetica => StandardFont::Helvetica,
        FontFamily::HelveticaBold => StandardFont::HelveticaBold,
        FontFamily::TimesRoman => StandardFont::TimesRoman,
        FontFamily::TimesItalic => StandardFont::TimesItalic,
        FontFamily::Courier => StandardFont::Courier,
    }
}

pub(crate) fn rgb(color: Color) -> Rgb {
    Rgb::from_u8(color.r, color.g, color.b)
}

/// Frame opacity combined with the color's own alpha.
pub(crate) fn effective_opacity(opacity: f32, color: Color) -> f32 {
    opacity * color.a as f32 / 255.0
}

pub(crate) fn image_bytes(source: ImageSource) -> EditResult<Vec<u8>> {
    match source {
        ImageSource::Bytes(bytes) => Ok(bytes),
        ImageSource::DataUrl(url) => decode_data_url(&url).map_err(EditError::embed("image")),
    }
}

fn image_kind(format: ImageFormat) -> ImageKind {
    match format {
        ImageFormat::Png => ImageKind::Png,
        ImageFormat::Jpeg => ImageKind::Jpeg,
    }
}

fn page_slot(document: &Document, page_id: PageId) -> EditResult<(usize, f32)> {
    let index = document.page_index(page_id).ok_or_else(|| EditError::page_not_found(page_id))?;
    Ok((index, document.pages[index].height))
}

fn store(document: &mut Document, entity: Entity) -> EditResult<()> {
    document.insert_entity(entity)?;
    document.mark_dirty();
    Ok(())
}

fn check_opacity(opacity: f32) -> EditResult<()> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(())
    } else {
        Err(EditError::InvalidArgument(format!("opacity {opacity} is outside 0..=1")))
    }
}

fn check_positive(what: &str, value: f32) -> EditResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(EditError::InvalidArgument(format!("{what} must be positive, got {value}")))
    }
}

fn check_size(size: Size) -> EditResult<()> {
    check_positive("width", size.width)?;
    check_positive("height", size.height)
}

/// Converts a UI-space shape to document space together with its bounds.
fn document_shape(input: &ShapeInput, page_height: f32) -> EditResult<(DrawingShape, Rect)> {
    let flip = |point: &Point| to_document_space(*point, page_height, 0.0);
    Ok(match input {
        ShapeInput::Line { from, to } => {
            let (from, to) = (flip(from), flip(to));
            (DrawingShape::Line { from, to }, Rect::from_corners(from, to))
        }
        ShapeInput::Rectangle { origin, size } => {
            check_size(*size)?;
            (DrawingShape::Rectangle, Rect::from_ui(*origin, *size, page_height))
        }
        ShapeInput::Ellipse { origin, size } => {
            check_size(*size)?;
            (DrawingShape::Ellipse, Rect::from_ui(*origin, *size, page_height))
        }
        ShapeInput::Path { points, closed } => {
            let points: Vec<Point> = points.iter().map(flip).collect();
            let bounds = bounds_of(&points);
            (DrawingShape::Path { points, closed: *closed }, bounds)
        }
    })
}

fn bounds_of(points: &[Point]) -> Rect {
    let (mut min, mut max) = (Point::new(f32::MAX, f32::MAX), Point::new(f32::MIN, f32::MIN));
    for point in points {
        min = Point::new(min.x.min(point.x), min.y.min(point.y));
        max = Point::new(max.x.max(point.x), max.y.max(point.y));
    }
    if points.is_empty() {
        return Rect::default();
    }
    Rect::from_corners(min, max)
}

// --- painting ---------------------------------------------------------------

fn text_element_ops(graph: &mut PdfGraph, index: usize, text: &TextElement) -> EditResult<Vec<Operation>> {
    if !text.frame.visible {
        return Ok(Vec::new());
    }
    let font_resource = graph.font_resource(index, standard_font(text.style.font))?;
    let ext_gstate = graph.ext_gstate(index, effective_opacity(text.frame.opacity, text.style.color))?;
    Ok(text_ops(&TextPaint {
        font_resource,
        font_size: text.style.font_size,
        color: rgb(text.style.color),
        x: text.frame.x,
        y: text.frame.y,
        rotation: text.frame.rotation,
        text: encode_win_ansi(&text.content),
        ext_gstate,
    }))
}

fn image_element_ops(graph: &mut PdfGraph, index: usize, frame: &Frame, resource: &str) -> EditResult<Vec<Operation>> {
    if !frame.visible {
        return Ok(Vec::new());
    }
    let ext_gstate = graph.ext_gstate(index, frame.opacity)?;
    Ok(image_ops(resource, frame.x, frame.y, frame.width, frame.height, frame.rotation, ext_gstate.as_deref()))
}

fn drawing_ops(graph: &mut PdfGraph, index: usize, drawing: &DrawingElement) -> EditResult<Vec<Operation>> {
    let frame = &drawing.frame;
    if !frame.visible {
        return Ok(Vec::new());
    }
    let shape = match &drawing.shape {
        DrawingShape::Line { from, to } => Shape::Line { from: (from.x, from.y), to: (to.x, to.y) },
        DrawingShape::Rectangle => Shape::Rect { x: frame.x, y: frame.y, width: frame.width, height: frame.height },
        DrawingShape::Ellipse => Shape::Ellipse {
            cx: frame.x + frame.width / 2.0,
            cy: frame.y + frame.height / 2.0,
            rx: frame.width / 2.0,
            ry: frame.height / 2.0,
        },
        DrawingShape::Path { points, closed } => {
            Shape::Polyline { points: points.iter().map(|point| (point.x, point.y)).collect(), closed: *closed }
        }
    };
    let alpha = drawing.stroke.or(drawing.fill).map_or(1.0, |color| color.a as f32 / 255.0);
    let ext_gstate = graph.ext_gstate(index, frame.opacity * alpha)?;

    Ok(shape_ops(&ShapePaint {
        shape,
        stroke: drawing.stroke.map(rgb),
        fill: drawing.fill.map(rgb),
        stroke_width: drawing.stroke_width,
        rotation: frame.rotation,
        origin: (frame.x + frame.width / 2.0, frame.y + frame.height / 2.0),
        ext_gstate,
    }))
}

fn paint_text(graph: &mut PdfGraph, index: usize, text: &mut TextElement) -> EditResult<()> {
    let ops = text_element_ops(graph, index, text)?;
    text.graph_ref = Some(graph.append_content(index, ops)?.into());
    Ok(())
}

fn paint_image(graph: &mut PdfGraph, index: usize, image: &mut ImageElement) -> EditResult<()> {
    let (resource, _) = graph.image_resource(index, &image.data).map_err(EditError::embed("image"))?;
    let ops = image_element_ops(graph, index, &image.frame, &resource)?;
    image.graph_ref = Some(graph.append_content(index, ops)?.into());
    Ok(())
}

fn paint_drawing(graph: &mut PdfGraph, index: usize, drawing: &mut DrawingElement) -> EditResult<()> {
    let ops = drawing_ops(graph, index, drawing)?;
    drawing.graph_ref = Some(graph.append_content(index, ops)?.into());
    Ok(())
}

fn paint_signature(graph: &mut PdfGraph, index: usize, signature: &mut Signature) -> EditResult<()> {
    let (resource, _) = graph.image_resource(index, &signature.image).map_err(EditError::embed("signature"))?;
    let ops = image_element_ops(graph, index, &signature_frame(signature), &resource)?;
    signature.graph_ref = Some(graph.append_content(index, ops)?.into());
    Ok(())
}

fn paint_annotation(graph: &mut PdfGraph, index: usize, annotation: &mut Annotation) -> EditResult<()> {
    annotation.graph_ref = Some(graph.add_annotation(index, annotation_dictionary(annotation))?.into());
    Ok(())
}

fn paint_field(graph: &mut PdfGraph, index: usize, field: &mut FormField) -> EditResult<()> {
    let id = graph.add_annotation(index, field_dictionary(field))?;
    graph.register_field(id)?;
    field.graph_ref = Some(id.into());
    Ok(())
}

fn signature_frame(signature: &Signature) -> Frame {
    Frame::new(signature.rect, signature.z_index)
}

/// Creates the graph object backing `entity` and records its reference.
pub(crate) fn paint_new(graph: &mut PdfGraph, index: usize, entity: &mut Entity) -> EditResult<()> {
    match entity {
        Entity::Text(text) => paint_text(graph, index, text),
        Entity::Image(image) => paint_image(graph, index, image),
        Entity::Drawing(drawing) => paint_drawing(graph, index, drawing),
        Entity::Annotation(annotation) => paint_annotation(graph, index, annotation),
        Entity::FormField(field) => paint_field(graph, index, field),
        Entity::Signature(signature) => paint_signature(graph, index, signature),
    }
}

/// Rewrites the graph object backing `entity` to match the record. Text
/// still shown from a file stream is blanked there and painted anew.
fn repaint(graph: &mut PdfGraph, index: usize, entity: &mut Entity) -> EditResult<()> {
    if let Entity::Text(text) = &mut *entity {
        if text.graph_ref.is_none() {
            if let Some(origin) = text.origin.take() {
                graph.blank_shown_text(origin.stream.into(), origin.operation)?;
                return paint_text(graph, index, text);
            }
        }
    }
    let Some(reference) = entity.graph_ref() else {
        log::warn!("{} {} has no graph object to repaint", entity.kind().label(), entity.id());
        return Ok(());
    };
    let id: ObjectId = reference.into();

    match entity {
        Entity::Text(text) => {
            let ops = text_element_ops(graph, index, text)?;
            graph.replace_content(id, ops)?;
        }
        Entity::Image(image) => {
            let resource = existing_xobject(graph, id, index, &image.data, "image")?;
            let ops = image_element_ops(graph, index, &image.frame, &resource)?;
            graph.replace_content(id, ops)?;
        }
        Entity::Signature(signature) => {
            let resource = existing_xobject(graph, id, index, &signature.image, "signature")?;
            let ops = image_element_ops(graph, index, &signature_frame(signature), &resource)?;
            graph.replace_content(id, ops)?;
        }
        Entity::Drawing(drawing) => {
            let ops = drawing_ops(graph, index, drawing)?;
            graph.replace_content(id, ops)?;
        }
        Entity::Annotation(annotation) => graph.replace_annotation(id, annotation_dictionary(annotation))?,
        Entity::FormField(field) => graph.replace_annotation(id, field_dictionary(field))?,
    }
    Ok(())
}

/// The XObject a stream already paints, or a fresh embedding when the
/// stream paints nothing (hidden elements).
fn existing_xobject(
    graph: &mut PdfGraph,
    stream: ObjectId,
    index: usize,
    data: &[u8],
    what: &'static str,
) -> EditResult<String> {
    let painted = graph.content_operations(stream).ok().and_then(|ops| {
        ops.into_iter()
            .find(|op| op.operator == "Do")
            .and_then(|op| op.operands.first().and_then(|name| name.as_name().ok()).map(|name| String::from_utf8_lossy(name).into_owned()))
    });
    match painted {
        Some(resource) => Ok(resource),
        None => Ok(graph.image_resource(index, data).map_err(EditError::embed(what))?.0),
    }
}

fn unpaint(graph: &mut PdfGraph, index: usize, entity: &Entity) -> EditResult<()> {
    if let Entity::Text(TextElement { graph_ref: None, origin: Some(origin), .. }) = entity {
        graph.blank_shown_text(origin.stream.into(), origin.operation)?;
        return Ok(());
    }
    let Some(reference) = entity.graph_ref() else {
        log::warn!("{} {} has no graph object to remove", entity.kind().label(), entity.id());
        return Ok(());
    };
    let id: ObjectId = reference.into();
    let removed = match entity {
        Entity::Annotation(_) | Entity::FormField(_) => graph.remove_annotation(index, id)?,
        _ => graph.remove_content(index, id)?,
    };
    if !removed {
        log::warn!("graph object {id:?} of {} {} was already gone", entity.kind().label(), entity.id());
    }
    Ok(())
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn reals(values: &[f32]) -> Object {
    Object::Array(values.iter().map(|value| Object::Real(*value)).collect())
}

fn color_array(color: Color) -> Object {
    let (r, g, b, _) = color.to_normalized();
    reals(&[r, g, b])
}

fn annotation_dictionary(annotation: &Annotation) -> Dictionary {
    let rect = annotation.rect;
    let mut dict = Dictionary::new();
    dict.set("Type", name("Annot"));
    dict.set("Subtype", name(annotation.kind.subtype()));
    dict.set("Rect", rect_object(rect.x, rect.y, rect.right(), rect.top()));
    dict.set("C", color_array(annotation.color));
    dict.set("F", ANNOT_PRINT);
    dict.set("NM", encode_text_string(&annotation.id.to_string()));
    dict.set("M", encode_text_string(&pdf_date(annotation.modified_at)));
    dict.set("CreationDate", encode_text_string(&pdf_date(annotation.created_at)));
    if annotation.color.a < 255 {
        dict.set("CA", Object::Real(annotation.color.a as f32 / 255.0));
    }
    if let Some(contents) = &annotation.contents {
        dict.set("Contents", encode_text_string(contents));
    }
    if let Some(author) = &annotation.author {
        dict.set("T", encode_text_string(author));
    }

    match annotation.kind {
        kind if kind.is_markup() => {
            dict.set(
                "QuadPoints",
                reals(&[rect.x, rect.top(), rect.right(), rect.top(), rect.x, rect.y, rect.right(), rect.y]),
            );
        }
        AnnotationKind::Ink => {
            let middle = rect.y + rect.height / 2.0;
            dict.set("InkList", Object::Array(vec![reals(&[rect.x, middle, rect.right(), middle])]));
        }
        AnnotationKind::Square | AnnotationKind::Circle => {
            let mut border = Dictionary::new();
            border.set("W", 1_i64);
            dict.set("BS", border);
        }
        AnnotationKind::FreeText => {
            let (r, g, b, _) = annotation.color.to_normalized();
            dict.set("DA", Object::string_literal(format!("/Helv 12 Tf {r:.3} {g:.3} {b:.3} rg")));
        }
        AnnotationKind::Note => {
            dict.set("Name", name("Comment"));
            dict.set("Open", false);
        }
        _ => {}
    }
    dict
}

fn field_dictionary(field: &FormField) -> Dictionary {
    let rect = field.rect;
    let mut dict = Dictionary::new();
    dict.set("Type", name("Annot"));
    dict.set("Subtype", name("Widget"));
    dict.set("FT", name(field.kind.field_type()));
    dict.set("T", encode_text_string(&field.name));
    dict.set("Rect", rect_object(rect.x, rect.y, rect.right(), rect.top()));
    dict.set("F", ANNOT_PRINT);
    dict.set("NM", encode_text_string(&field.id.to_string()));
    dict.set("DA", Object::string_literal("/Helv 0 Tf 0 g"));

    let mut flags = 0;
    if field.required {
        flags |= FLAG_REQUIRED;
    }
    match field.kind {
        FormFieldKind::Radio => flags |= FLAG_RADIO,
        FormFieldKind::Dropdown => flags |= FLAG_COMBO,
        FormFieldKind::Text | FormFieldKind::Checkbox => {}
    }
    if flags != 0 {
        dict.set("Ff", flags);
    }

    match field.kind {
        FormFieldKind::Text | FormFieldKind::Dropdown => {
            if let Some(value) = &field.default_value {
                dict.set("V", encode_text_string(value));
                dict.set("DV", encode_text_string(value));
            }
        }
        FormFieldKind::Checkbox | FormFieldKind::Radio => {
            let state = if field.default_value.as_deref().is_some_and(is_checked) { "Yes" } else { "Off" };
            dict.set("V", name(state));
            dict.set("AS", name(state));
        }
    }
    if field.kind == FormFieldKind::Dropdown {
        dict.set("Opt", Object::Array(field.options.iter().map(|option| encode_text_string(option)).collect()));
    }
    dict
}

// --- updates and copies -----------------------------------------------------

fn apply_update(entity: Entity, update: &ElementUpdate, page_height: f32) -> Entity {
    match entity {
        Entity::Text(mut text) => {
            if let Some(content) = &update.content {
                text.content = content.clone();
            }
            if let Some(font_size) = update.font_size {
                text.style.font_size = font_size;
            }
            if let Some(color) = update.color {
                text.style.color = color;
            }
            if let Some(position) = update.position {
                let origin = to_document_space(position, page_height, 0.0);
                text.frame.x = origin.x;
                text.frame.y = origin.y;
            }
            text.frame.width = text.style.font.measure(&text.content, text.style.font_size);
            text.frame.height = text.style.font_size;
            apply_frame_flags(&mut text.frame, update);
            Entity::Text(text)
        }
        Entity::Image(mut image) => {
            image.frame = reframe(image.frame, update, page_height);
            apply_frame_flags(&mut image.frame, update);
            Entity::Image(image)
        }
        Entity::Drawing(mut drawing) => {
            let before = drawing.frame.rect();
            drawing.frame = reframe(drawing.frame, update, page_height);
            refit_shape(&mut drawing.shape, before, drawing.frame.rect());
            if let Some(color) = update.color {
                drawing.stroke = Some(color);
            }
            if let Some(fill) = update.fill {
                drawing.fill = Some(fill);
            }
            if let Some(width) = update.stroke_width {
                drawing.stroke_width = width.max(0.0);
            }
            apply_frame_flags(&mut drawing.frame, update);
            Entity::Drawing(drawing)
        }
        Entity::Annotation(mut annotation) => {
            annotation.rect = relocate(annotation.rect, update, page_height);
            if let Some(color) = update.color {
                annotation.color = color;
            }
            if let Some(content) = &update.content {
                annotation.contents = Some(content.clone());
            }
            annotation.modified_at = now_timestamp();
            Entity::Annotation(annotation)
        }
        Entity::FormField(mut field) => {
            field.rect = relocate(field.rect, update, page_height);
            if let Some(content) = &update.content {
                field.default_value = Some(content.clone());
            }
            Entity::FormField(field)
        }
        Entity::Signature(mut signature) => {
            signature.rect = relocate(signature.rect, update, page_height);
            Entity::Signature(signature)
        }
    }
}

/// Applies a UI-space move and resize; the top-left corner stays put when
/// only the size changes.
fn relocate(rect: Rect, update: &ElementUpdate, page_height: f32) -> Rect {
    if update.position.is_none() && update.size.is_none() {
        return rect;
    }
    let size = update.size.unwrap_or(Size::new(rect.width, rect.height));
    let origin = update.position.unwrap_or_else(|| rect.ui_origin(page_height));
    Rect::from_ui(origin, size, page_height)
}

fn reframe(frame: Frame, update: &ElementUpdate, page_height: f32) -> Frame {
    let rect = relocate(frame.rect(), update, page_height);
    Frame { x: rect.x, y: rect.y, width: rect.width, height: rect.height, ..frame }
}

fn apply_frame_flags(frame: &mut Frame, update: &ElementUpdate) {
    if let Some(rotation) = update.rotation {
        frame.rotation = rotation;
    }
    if let Some(opacity) = update.opacity {
        frame.opacity = opacity;
    }
    if let Some(visible) = update.visible {
        frame.visible = visible;
    }
    if let Some(locked) = update.locked {
        frame.locked = locked;
    }
}

/// Maps line and path points from the old bounds onto the new ones.
fn refit_shape(shape: &mut DrawingShape, before: Rect, after: Rect) {
    let scale = |from: f32, to: f32| if from > 0.0 { to / from } else { 1.0 };
    let (sx, sy) = (scale(before.width, after.width), scale(before.height, after.height));
    let map = |point: Point| Point::new(after.x + (point.x - before.x) * sx, after.y + (point.y - before.y) * sy);

    match shape {
        DrawingShape::Line { from, to } => {
            *from = map(*from);
            *to = map(*to);
        }
        DrawingShape::Path { points, .. } => {
            for point in points.iter_mut() {
                *point = map(*point);
            }
        }
        DrawingShape::Rectangle | DrawingShape::Ellipse => {}
    }
}

/// Copy of `source` owned by `target` with no backing object yet. `offset`
/// is UI space, so the copy moves right and down.
fn relocated_copy(source: &Entity, target: PageId, z_index: u32, offset: f32) -> Entity {
    let (dx, dy) = (offset, -offset);
    let now = now_timestamp();
    match source.clone() {
        Entity::Text(mut text) => {
            text.id = Uuid::new_v4();
            text.page_id = target;
            text.graph_ref = None;
            text.origin = None;
            text.frame = Frame { x: text.frame.x + dx, y: text.frame.y + dy, z_index, ..text.frame };
            Entity::Text(text)
        }
        Entity::Image(mut image) => {
            image.id = Uuid::new_v4();
            image.page_id = target;
            image.graph_ref = None;
            image.frame = Frame { x: image.frame.x + dx, y: image.frame.y + dy, z_index, ..image.frame };
            Entity::Image(image)
        }
        Entity::Drawing(mut drawing) => {
            drawing.id = Uuid::new_v4();
            drawing.page_id = target;
            drawing.graph_ref = None;
            drawing.frame = Frame { x: drawing.frame.x + dx, y: drawing.frame.y + dy, z_index, ..drawing.frame };
            drawing.shape.translate(dx, dy);
            Entity::Drawing(drawing)
        }
        Entity::Annotation(mut annotation) => {
            annotation.id = Uuid::new_v4();
            annotation.page_id = target;
            annotation.graph_ref = None;
            annotation.rect = annotation.rect.translate(dx, dy);
            annotation.z_index = z_index;
            annotation.created_at = now;
            annotation.modified_at = now;
            Entity::Annotation(annotation)
        }
        Entity::FormField(mut field) => {
            field.id = Uuid::new_v4();
            field.page_id = target;
            field.graph_ref = None;
            field.rect = field.rect.translate(dx, dy);
            field.z_index = z_index;
            Entity::FormField(field)
        }
        Entity::Signature(mut signature) => {
            signature.id = Uuid::new_v4();
            signature.page_id = target;
            signature.graph_ref = None;
            signature.rect = signature.rect.translate(dx, dy);
            signature.z_index = z_index;
            Entity::Signature(signature)
        }
    }
}

fn unique_field_name(document: &Document, base: &str) -> String {
    let taken = |candidate: &str| document.form_fields().any(|field| field.name == candidate);
    (2..)
        .map(|suffix| format!("{base}_{suffix}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| format!("{base}_{}", Uuid::new_v4()))
}
