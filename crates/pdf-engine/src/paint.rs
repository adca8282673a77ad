//! Content-stream builders for the primitives the editor paints.
//!
//! Every builder wraps its output in `q`/`Q` so graphics state never leaks
//! into neighbouring streams on the same page. All coordinates are document
//! space (origin bottom-left, y up).

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

/// Bézier control distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// Device RGB color with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self { r: r as f32 / 255.0, g: g as f32 / 255.0, b: b as f32 / 255.0 }
    }

    pub fn to_array(self) -> Vec<Object> {
        vec![real(self.r), real(self.g), real(self.b)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPaint {
    pub font_resource: String,
    pub font_size: f32,
    pub color: Rgb,
    /// Baseline origin.
    pub x: f32,
    pub y: f32,
    /// Degrees, counter-clockwise around the baseline origin.
    pub rotation: f32,
    /// Already encoded for the font.
    pub text: Vec<u8>,
    pub ext_gstate: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { from: (f32, f32), to: (f32, f32) },
    Rect { x: f32, y: f32, width: f32, height: f32 },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
    Polyline { points: Vec<(f32, f32)>, closed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapePaint {
    pub shape: Shape,
    pub stroke: Option<Rgb>,
    pub fill: Option<Rgb>,
    pub stroke_width: f32,
    /// Degrees, counter-clockwise around `origin`.
    pub rotation: f32,
    pub origin: (f32, f32),
    pub ext_gstate: Option<String>,
}

pub fn text_ops(paint: &TextPaint) -> Vec<Operation> {
    let (sin, cos) = paint.rotation.to_radians().sin_cos();
    let mut ops = vec![Operation::new("q", vec![])];
    push_gstate(&mut ops, paint.ext_gstate.as_deref());
    ops.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(paint.font_resource.as_bytes().to_vec()), real(paint.font_size)]),
        Operation::new("rg", paint.color.to_array()),
        Operation::new("Tm", vec![real(cos), real(sin), real(-sin), real(cos), real(paint.x), real(paint.y)]),
        Operation::new("Tj", vec![Object::String(paint.text.clone(), StringFormat::Literal)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);
    ops
}

/// Places an image XObject so that it fills `width`×`height` with its
/// bottom-left corner at (`x`, `y`).
pub fn image_ops(
    resource: &str,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    rotation: f32,
    ext_gstate: Option<&str>,
) -> Vec<Operation> {
    let (sin, cos) = rotation.to_radians().sin_cos();
    let mut ops = vec![Operation::new("q", vec![])];
    push_gstate(&mut ops, ext_gstate);
    ops.extend([
        Operation::new(
            "cm",
            vec![real(width * cos), real(width * sin), real(-height * sin), real(height * cos), real(x), real(y)],
        ),
        Operation::new("Do", vec![Object::Name(resource.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]);
    ops
}

pub fn shape_ops(paint: &ShapePaint) -> Vec<Operation> {
    let mut ops = vec![Operation::new("q", vec![])];
    push_gstate(&mut ops, paint.ext_gstate.as_deref());

    if paint.rotation != 0.0 {
        let (sin, cos) = paint.rotation.to_radians().sin_cos();
        let (ox, oy) = paint.origin;
        ops.push(Operation::new(
            "cm",
            vec![
                real(cos),
                real(sin),
                real(-sin),
                real(cos),
                real(ox - cos * ox + sin * oy),
                real(oy - sin * ox - cos * oy),
            ],
        ));
    }
    if let Some(stroke) = paint.stroke {
        ops.push(Operation::new("RG", stroke.to_array()));
        ops.push(Operation::new("w", vec![real(paint.stroke_width)]));
    }
    if let Some(fill) = paint.fill {
        ops.push(Operation::new("rg", fill.to_array()));
    }

    let closed = match &paint.shape {
        Shape::Line { from, to } => {
            ops.push(move_to(from.0, from.1));
            ops.push(line_to(to.0, to.1));
            false
        }
        Shape::Rect { x, y, width, height } => {
            ops.push(Operation::new("re", vec![real(*x), real(*y), real(*width), real(*height)]));
            true
        }
        Shape::Ellipse { cx, cy, rx, ry } => {
            ellipse_path(&mut ops, *cx, *cy, *rx, *ry);
            true
        }
        Shape::Polyline { points, closed } => {
            let mut iter = points.iter();
            if let Some(first) = iter.next() {
                ops.push(move_to(first.0, first.1));
                ops.extend(iter.map(|point| line_to(point.0, point.1)));
                if *closed {
                    ops.push(Operation::new("h", vec![]));
                }
            }
            *closed
        }
    };

    let operator = match (paint.stroke.is_some(), paint.fill.is_some() && closed) {
        (true, true) => "B",
        (false, true) => "f",
        (true, false) => "S",
        (false, false) => "n",
    };
    ops.push(Operation::new(operator, vec![]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

fn ellipse_path(ops: &mut Vec<Operation>, cx: f32, cy: f32, rx: f32, ry: f32) {
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    ops.push(move_to(cx + rx, cy));
    ops.push(curve_to([cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry]));
    ops.push(curve_to([cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy]));
    ops.push(curve_to([cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry]));
    ops.push(curve_to([cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy]));
    ops.push(Operation::new("h", vec![]));
}

fn push_gstate(ops: &mut Vec<Operation>, ext_gstate: Option<&str>) {
    if let Some(name) = ext_gstate {
        ops.push(Operation::new("gs", vec![Object::Name(name.as_bytes().to_vec())]));
    }
}

fn move_to(x: f32, y: f32) -> Operation {
    Operation::new("m", vec![real(x), real(y)])
}

fn line_to(x: f32, y: f32) -> Operation {
    Operation::new("l", vec![real(x), real(y)])
}

fn curve_to(points: [f32; 6]) -> Operation {
    Operation::new("c", points.into_iter().map(real).collect())
}

fn real(value: f32) -> Object {
    Object::Real(value)
}
