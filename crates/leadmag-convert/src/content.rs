//! Content-stream interpretation
//!
//! Walks a page's decoded content stream tracking the text matrix, the
//! current transformation matrix, and the active font, and emits positioned
//! text runs and image references. Positions are in PDF user space (origin
//! bottom-left, y grows upward); ordering happens later in `layout`.

use lopdf::content::Content;

use crate::fonts::FontTable;
use crate::pipeline::ConvertError;

/// 2D affine transform, row-vector convention: `[a b 0; c d 0; e f 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn identity() -> Self {
        Matrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    /// `self` applied first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Vertical scale factor (length of the transformed y-axis unit vector).
    pub fn scale_y(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// A positioned run of decoded text.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub seq: usize,
}

/// A positioned reference to an XObject drawn with `Do`. Whether it's an
/// image is decided by the caller against the page resources.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub name: Vec<u8>,
    pub x: f64,
    /// Top edge of the placed image in user space.
    pub y: f64,
    pub seq: usize,
}

#[derive(Debug, Clone)]
pub enum PageItem {
    Text(TextRun),
    Image(ImageRef),
}

/// TJ adjustments at or below this (thousandths of text space) act as word
/// separators.
const TJ_SPACE_THRESHOLD: f64 = -180.0;

struct Interpreter<'a> {
    fonts: &'a FontTable,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    leading: f64,
    font_name: Option<Vec<u8>>,
    font_size: f64,
    seq: usize,
    items: Vec<PageItem>,
}

impl<'a> Interpreter<'a> {
    fn new(fonts: &'a FontTable) -> Self {
        Interpreter {
            fonts,
            ctm: Matrix::identity(),
            ctm_stack: Vec::new(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            leading: 0.0,
            font_name: None,
            font_size: 0.0,
            seq: 0,
            items: Vec::new(),
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self.font_name.as_deref().and_then(|n| self.fonts.get(n)) {
            Some(font) => font.decode(bytes),
            None => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    fn show_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let combined = self.tm.multiply(&self.ctm);
        self.items.push(PageItem::Text(TextRun {
            text,
            x: combined.e,
            y: combined.f,
            size: self.font_size * combined.scale_y(),
            seq: self.seq,
        }));
        self.seq += 1;
    }

    fn draw_xobject(&mut self, name: Vec<u8>) {
        // The unit square maps through the CTM; the top edge lands at f + d.
        let y_top = self.ctm.f + self.ctm.d.max(0.0);
        self.items.push(PageItem::Image(ImageRef {
            name,
            x: self.ctm.e,
            y: y_top,
            seq: self.seq,
        }));
        self.seq += 1;
    }
}

fn operand_f64(obj: &lopdf::Object) -> Option<f64> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f64),
        lopdf::Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Interpret a page's content stream into positioned items.
pub fn interpret_page(
    content_bytes: &[u8],
    fonts: &FontTable,
) -> Result<Vec<PageItem>, ConvertError> {
    let content = Content::decode(content_bytes)
        .map_err(|e| ConvertError::Malformed(format!("failed to decode content stream: {}", e)))?;

    let mut interp = Interpreter::new(fonts);

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => interp.ctm_stack.push(interp.ctm),
            "Q" => {
                if let Some(m) = interp.ctm_stack.pop() {
                    interp.ctm = m;
                }
            }
            "cm" => {
                if operands.len() == 6 {
                    let vals: Vec<f64> = operands.iter().filter_map(operand_f64).collect();
                    if vals.len() == 6 {
                        let m = Matrix {
                            a: vals[0],
                            b: vals[1],
                            c: vals[2],
                            d: vals[3],
                            e: vals[4],
                            f: vals[5],
                        };
                        interp.ctm = m.multiply(&interp.ctm);
                    }
                }
            }
            "BT" => {
                interp.tm = Matrix::identity();
                interp.tlm = Matrix::identity();
            }
            "ET" => {}
            "Tf" => {
                if operands.len() == 2 {
                    if let Ok(name) = operands[0].as_name() {
                        interp.font_name = Some(name.to_vec());
                    }
                    if let Some(size) = operand_f64(&operands[1]) {
                        interp.font_size = size;
                    }
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(operand_f64) {
                    interp.leading = l;
                }
            }
            "Tm" => {
                if operands.len() == 6 {
                    let vals: Vec<f64> = operands.iter().filter_map(operand_f64).collect();
                    if vals.len() == 6 {
                        let m = Matrix {
                            a: vals[0],
                            b: vals[1],
                            c: vals[2],
                            d: vals[3],
                            e: vals[4],
                            f: vals[5],
                        };
                        interp.tm = m;
                        interp.tlm = m;
                    }
                }
            }
            "Td" => {
                if operands.len() == 2 {
                    if let (Some(tx), Some(ty)) =
                        (operand_f64(&operands[0]), operand_f64(&operands[1]))
                    {
                        interp.next_line(tx, ty);
                    }
                }
            }
            "TD" => {
                if operands.len() == 2 {
                    if let (Some(tx), Some(ty)) =
                        (operand_f64(&operands[0]), operand_f64(&operands[1]))
                    {
                        interp.leading = -ty;
                        interp.next_line(tx, ty);
                    }
                }
            }
            "T*" => {
                let leading = interp.leading;
                interp.next_line(0.0, -leading);
            }
            "Tj" => {
                if let Some(lopdf::Object::String(bytes, _)) = operands.first() {
                    let text = interp.decode(bytes);
                    interp.show_text(text);
                }
            }
            "'" => {
                let leading = interp.leading;
                interp.next_line(0.0, -leading);
                if let Some(lopdf::Object::String(bytes, _)) = operands.first() {
                    let text = interp.decode(bytes);
                    interp.show_text(text);
                }
            }
            "\"" => {
                let leading = interp.leading;
                interp.next_line(0.0, -leading);
                if let Some(lopdf::Object::String(bytes, _)) = operands.get(2) {
                    let text = interp.decode(bytes);
                    interp.show_text(text);
                }
            }
            "TJ" => {
                if let Some(lopdf::Object::Array(arr)) = operands.first() {
                    let mut text = String::new();
                    for element in arr {
                        match element {
                            lopdf::Object::String(bytes, _) => {
                                text.push_str(&interp.decode(bytes));
                            }
                            other => {
                                if let Some(adj) = operand_f64(other) {
                                    if adj <= TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                                        text.push(' ');
                                    }
                                }
                            }
                        }
                    }
                    interp.show_text(text);
                }
            }
            "Do" => {
                if let Some(Ok(name)) = operands.first().map(|o| o.as_name()) {
                    interp.draw_xobject(name.to_vec());
                }
            }
            // Path, color, and clipping operators don't affect extraction
            _ => {}
        }
    }

    Ok(interp.items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    fn encode(ops: Vec<Operation>) -> Vec<u8> {
        Content { operations: ops }.encode().unwrap()
    }

    fn text_op(s: &str) -> lopdf::Object {
        lopdf::Object::string_literal(s)
    }

    #[test]
    fn test_simple_text_position_and_size() {
        let bytes = encode(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![lopdf::Object::Name(b"F1".to_vec()), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![text_op("Hello")]),
            Operation::new("ET", vec![]),
        ]);

        let items = interpret_page(&bytes, &FontTable::empty()).unwrap();
        assert_eq!(items.len(), 1);
        match &items[0] {
            PageItem::Text(run) => {
                assert_eq!(run.text, "Hello");
                assert!((run.x - 72.0).abs() < 1e-9);
                assert!((run.y - 700.0).abs() < 1e-9);
                assert!((run.size - 24.0).abs() < 1e-9);
            }
            other => panic!("expected text run, got {:?}", other),
        }
    }

    #[test]
    fn test_td_advances_lines_downward() {
        let bytes = encode(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![lopdf::Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![text_op("first")]),
            Operation::new("Td", vec![0.into(), lopdf::Object::Integer(-14)]),
            Operation::new("Tj", vec![text_op("second")]),
            Operation::new("ET", vec![]),
        ]);

        let items = interpret_page(&bytes, &FontTable::empty()).unwrap();
        assert_eq!(items.len(), 2);
        let (y0, y1) = match (&items[0], &items[1]) {
            (PageItem::Text(a), PageItem::Text(b)) => (a.y, b.y),
            _ => panic!("expected two text runs"),
        };
        assert!(y1 < y0);
        assert!((y0 - y1 - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_tj_array_concatenates_with_kerning_spaces() {
        let array = lopdf::Object::Array(vec![
            text_op("Hel"),
            lopdf::Object::Integer(-20), // kerning, not a space
            text_op("lo"),
            lopdf::Object::Integer(-250), // word space
            text_op("world"),
        ]);
        let bytes = encode(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![lopdf::Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("TJ", vec![array]),
            Operation::new("ET", vec![]),
        ]);

        let items = interpret_page(&bytes, &FontTable::empty()).unwrap();
        match &items[0] {
            PageItem::Text(run) => assert_eq!(run.text, "Hello world"),
            other => panic!("expected text run, got {:?}", other),
        }
    }

    #[test]
    fn test_quote_operator_uses_leading() {
        let bytes = encode(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![lopdf::Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![text_op("first")]),
            Operation::new("'", vec![text_op("second")]),
            Operation::new("ET", vec![]),
        ]);

        let items = interpret_page(&bytes, &FontTable::empty()).unwrap();
        let (y0, y1) = match (&items[0], &items[1]) {
            (PageItem::Text(a), PageItem::Text(b)) => (a.y, b.y),
            _ => panic!("expected two text runs"),
        };
        assert!((y0 - y1 - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_do_records_image_placement_through_ctm() {
        let bytes = encode(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    200.into(),
                    0.into(),
                    0.into(),
                    100.into(),
                    100.into(),
                    300.into(),
                ],
            ),
            Operation::new("Do", vec![lopdf::Object::Name(b"Im1".to_vec())]),
            Operation::new("Q", vec![]),
        ]);

        let items = interpret_page(&bytes, &FontTable::empty()).unwrap();
        match &items[0] {
            PageItem::Image(img) => {
                assert_eq!(img.name, b"Im1".to_vec());
                assert!((img.x - 100.0).abs() < 1e-9);
                // top edge = 300 (translate) + 100 (height)
                assert!((img.y - 400.0).abs() < 1e-9);
            }
            other => panic!("expected image ref, got {:?}", other),
        }
    }

    #[test]
    fn test_tm_scale_affects_font_size() {
        let bytes = encode(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![lopdf::Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new(
                "Tm",
                vec![2.into(), 0.into(), 0.into(), 2.into(), 72.into(), 700.into()],
            ),
            Operation::new("Tj", vec![text_op("big")]),
            Operation::new("ET", vec![]),
        ]);

        let items = interpret_page(&bytes, &FontTable::empty()).unwrap();
        match &items[0] {
            PageItem::Text(run) => assert!((run.size - 24.0).abs() < 1e-9),
            other => panic!("expected text run, got {:?}", other),
        }
    }
}
