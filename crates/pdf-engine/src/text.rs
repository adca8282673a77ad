use lopdf::content::{Content, Operation};
use lopdf::{Object, ObjectId};

use crate::fonts::decode_win_ansi;
use crate::graph::PdfGraph;
use crate::CodecError;

/// The operation that showed a run: its content stream and its position
/// among that stream's operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOrigin {
    pub stream: ObjectId,
    pub operation: usize,
}

/// One shown string with the transform it was shown under.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Text rendering matrix `[a b c d e f]`; `e`/`f` is the baseline origin.
    pub transform: [f32; 6],
    /// Approximate bounds `[x, y, width, height]`, y at the baseline.
    pub bbox: [f32; 4],
    pub font_size: f32,
    /// Page font resource the run was shown with.
    pub font_resource: Option<String>,
    /// `None` when the page content had to be read as a whole.
    pub origin: Option<RunOrigin>,
}

pub trait TextExtractor {
    fn text_runs(&self, graph: &PdfGraph, page_index: usize) -> Result<Vec<TextRun>, CodecError>;
}

/// Walks the page content streams in paint order and records every
/// `Tj`/`TJ`/`'`/`"`. Shown bytes are read as WinAnsi.
///
/// Glyph widths are not consulted: run width is estimated as half the font
/// size per character.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTextExtractor;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[derive(Debug, Clone)]
struct TextState {
    ctm: Matrix,
    font: Option<String>,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self { ctm: IDENTITY, font: None, font_size: 0.0, leading: 0.0 }
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(|operand| operand.as_float().ok()).collect()
}

fn shown_text(operand: &Object) -> String {
    match operand {
        Object::String(bytes, _) => decode_win_ansi(bytes),
        Object::Array(items) => items.iter().map(shown_text).collect(),
        _ => String::new(),
    }
}

impl TextExtractor for ContentTextExtractor {
    fn text_runs(&self, graph: &PdfGraph, page_index: usize) -> Result<Vec<TextRun>, CodecError> {
        let segments = content_segments(graph, page_index)?;

        let mut runs = Vec::new();
        let mut stack: Vec<TextState> = Vec::new();
        let mut state = TextState::default();
        let mut text_matrix = IDENTITY;
        let mut line_matrix = IDENTITY;

        let operations = segments.iter().flat_map(|(stream, operations)| {
            operations.iter().enumerate().map(move |(position, operation)| {
                (stream.map(|stream| RunOrigin { stream, operation: position }), operation)
            })
        });

        for (origin, operation) in operations {
            let operands = &operation.operands;
            match operation.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => state = stack.pop().unwrap_or_default(),
                "cm" => {
                    if let [a, b, c, d, e, f] = numbers(operands)[..] {
                        state.ctm = multiply(&[a, b, c, d, e, f], &state.ctm);
                    }
                }
                "BT" => {
                    text_matrix = IDENTITY;
                    line_matrix = IDENTITY;
                }
                "Tf" => {
                    state.font = operands.first().and_then(|name| name.as_name().ok()).map(|name| String::from_utf8_lossy(name).into_owned());
                    state.font_size = operands.get(1).and_then(|size| size.as_float().ok()).unwrap_or(state.font_size);
                }
                "TL" => state.leading = numbers(operands).first().copied().unwrap_or(state.leading),
                "Tm" => {
                    if let [a, b, c, d, e, f] = numbers(operands)[..] {
                        text_matrix = [a, b, c, d, e, f];
                        line_matrix = text_matrix;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty] = numbers(operands)[..] {
                        if operation.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = multiply(&translate(tx, ty), &line_matrix);
                        text_matrix = line_matrix;
                    }
                }
                "T*" => {
                    line_matrix = multiply(&translate(0.0, -state.leading), &line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    if matches!(operation.operator.as_str(), "'" | "\"") {
                        line_matrix = multiply(&translate(0.0, -state.leading), &line_matrix);
                        text_matrix = line_matrix;
                    }
                    let Some(operand) = operands.last() else {
                        continue;
                    };
                    let text = shown_text(operand);
                    if text.trim().is_empty() {
                        continue;
                    }

                    let transform = multiply(&text_matrix, &state.ctm);
                    let scale = (transform[0] * transform[0] + transform[1] * transform[1]).sqrt();
                    let font_size = state.font_size * if scale > 0.0 { scale } else { 1.0 };
                    let width = text.chars().count() as f32 * font_size * 0.5;
                    runs.push(TextRun {
                        bbox: [transform[4], transform[5], width, font_size],
                        text,
                        transform,
                        font_size,
                        font_resource: state.font.clone(),
                        origin,
                    });
                }
                _ => {}
            }
        }

        Ok(runs)
    }
}

type Segment = (Option<ObjectId>, Vec<Operation>);

/// Operations of each content stream of the page. Graphics state carries
/// over from one stream to the next. A stream that does not decode on its
/// own makes the whole page decode as one anonymous segment.
fn content_segments(graph: &PdfGraph, page_index: usize) -> Result<Vec<Segment>, CodecError> {
    let streams = graph.content_streams(page_index)?;
    let mut segments = Vec::with_capacity(streams.len());
    for stream in streams {
        match graph.content_operations(stream) {
            Ok(operations) => segments.push((Some(stream), operations)),
            Err(err) => {
                log::debug!("content stream {stream:?} of page {} is not self-contained: {err}", page_index + 1);
                let bytes = graph.page_content(page_index)?;
                if bytes.is_empty() {
                    return Ok(Vec::new());
                }
                return Ok(vec![(None, Content::decode(&bytes)?.operations)]);
            }
        }
    }
    Ok(segments)
}
