//! Content-stream interpreter producing positioned text runs.

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use crate::layout::TextRun;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Largest CID a two-byte code can address.
const MAX_CID: u32 = 0xFFFF;

/// `a` then `b`, in the row-vector convention used by PDF.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn translate(tx: f32, ty: f32, m: &Matrix) -> Matrix {
    multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], m)
}

/// A CID from a `W` array entry, `None` outside the two-byte code space.
fn cid(value: f32) -> Option<u32> {
    (0.0..=MAX_CID as f32).contains(&value).then_some(value as u32)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Glyph advance widths of one font, in thousandths of text space.
#[derive(Debug, Clone)]
struct FontMetrics {
    two_byte: bool,
    widths: HashMap<u32, f32>,
    default_width: f32,
}

impl FontMetrics {
    fn load(doc: &Document, font: &Dictionary) -> Self {
        let is_type0 = matches!(font.get(b"Subtype").and_then(Object::as_name), Ok(b"Type0"));
        if is_type0 {
            Self::load_composite(doc, font)
        } else {
            Self::load_simple(doc, font)
        }
    }

    fn load_simple(doc: &Document, font: &Dictionary) -> Self {
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;

        let widths = resolve(doc, font.get(b"Widths").ok())
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .enumerate()
                    .filter_map(|(i, w)| Some((first_char + i as u32, number(resolve(doc, Some(w))?)?)))
                    .collect()
            })
            .unwrap_or_default();

        let default_width = resolve(doc, font.get(b"FontDescriptor").ok())
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(number)
            .filter(|w| *w > 0.0)
            .unwrap_or(500.0);

        Self {
            two_byte: false,
            widths,
            default_width,
        }
    }

    fn load_composite(doc: &Document, font: &Dictionary) -> Self {
        let descendant = resolve(doc, font.get(b"DescendantFonts").ok())
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| resolve(doc, Some(o)))
            .and_then(|o| o.as_dict().ok());

        let mut metrics = Self {
            two_byte: true,
            widths: HashMap::new(),
            default_width: 1000.0,
        };

        let Some(cid_font) = descendant else {
            return metrics;
        };

        if let Some(dw) = cid_font.get(b"DW").ok().and_then(number) {
            metrics.default_width = dw;
        }

        // W: [c [w1 w2 ...]] or [c_first c_last w]
        if let Some(w) = resolve(doc, cid_font.get(b"W").ok()).and_then(|o| o.as_array().ok()) {
            let mut i = 0;
            while i < w.len() {
                let Some(start) = number(&w[i]) else { break };
                let start = cid(start);
                match resolve(doc, w.get(i + 1)) {
                    Some(Object::Array(list)) => {
                        if let Some(start) = start {
                            let cids = (start..=MAX_CID).zip(list.iter());
                            for (cid, width) in cids {
                                if let Some(width) = number(width) {
                                    metrics.widths.insert(cid, width);
                                }
                            }
                        }
                        i += 2;
                    }
                    Some(end) => {
                        let (Some(end), Some(width)) = (number(end), w.get(i + 2).and_then(number))
                        else {
                            break;
                        };
                        match (start, cid(end)) {
                            (Some(start), Some(end)) if start <= end => {
                                for cid in start..=end {
                                    metrics.widths.insert(cid, width);
                                }
                            }
                            _ => debug!("Skipping malformed W range {:?}..{}", start, end),
                        }
                        i += 3;
                    }
                    None => break,
                }
            }
        }

        metrics
    }

    fn codes<'a>(&self, bytes: &'a [u8]) -> Box<dyn Iterator<Item = u32> + 'a> {
        if self.two_byte {
            Box::new(
                bytes
                    .chunks(2)
                    .map(|c| c.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))),
            )
        } else {
            Box::new(bytes.iter().map(|b| u32::from(*b)))
        }
    }

    fn width(&self, code: u32) -> f32 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            two_byte: false,
            widths: HashMap::new(),
            default_width: 500.0,
        }
    }
}

fn resolve<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Object> {
    doc.dereference(obj?).ok().map(|(_, o)| o)
}

/// Graphics and text state needed to place glyph runs.
pub(super) struct TextInterpreter<'a> {
    doc: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    metrics: HashMap<Vec<u8>, FontMetrics>,
    ctm: Matrix,
    saved: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    runs: Vec<TextRun>,
}

impl<'a> TextInterpreter<'a> {
    pub(super) fn new(doc: &'a Document, fonts: BTreeMap<Vec<u8>, &'a Dictionary>) -> Self {
        Self {
            doc,
            fonts,
            metrics: HashMap::new(),
            ctm: IDENTITY,
            saved: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            runs: Vec::new(),
        }
    }

    /// Run all operations and return the runs in stream order.
    pub(super) fn run(mut self, operations: &[Operation]) -> Vec<TextRun> {
        for op in operations {
            self.apply(op);
        }
        self.runs
    }

    fn apply(&mut self, op: &Operation) {
        let args = &op.operands;
        let arg = |i: usize| args.get(i).and_then(number);

        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = self.matrix_operand(args) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                if let Some(name) = args.first().and_then(|o| o.as_name().ok()) {
                    self.font = name.to_vec();
                }
                if let Some(size) = arg(1) {
                    self.font_size = size;
                }
            }
            "TL" => self.leading = arg(0).unwrap_or(self.leading),
            "Tc" => self.char_spacing = arg(0).unwrap_or(0.0),
            "Tw" => self.word_spacing = arg(0).unwrap_or(0.0),
            "Tz" => self.horizontal_scale = arg(0).unwrap_or(100.0) / 100.0,
            "Td" | "TD" => {
                let (tx, ty) = (arg(0).unwrap_or(0.0), arg(1).unwrap_or(0.0));
                if op.operator == "TD" {
                    self.leading = -ty;
                }
                self.next_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = self.matrix_operand(args) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = args.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = args.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.word_spacing = arg(0).unwrap_or(self.word_spacing);
                self.char_spacing = arg(1).unwrap_or(self.char_spacing);
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = args.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = args.first() {
                    self.show_array(items);
                }
            }
            _ => {}
        }
    }

    fn matrix_operand(&self, args: &[Object]) -> Option<Matrix> {
        if args.len() < 6 {
            return None;
        }
        let mut m = IDENTITY;
        for (slot, obj) in m.iter_mut().zip(args) {
            *slot = number(obj)?;
        }
        Some(m)
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = translate(tx, ty, &self.tlm);
        self.tm = self.tlm;
    }

    /// Horizontal advance of a string in unscaled text space.
    fn advance(&mut self, bytes: &[u8]) -> f32 {
        if !self.metrics.contains_key(&self.font) {
            let loaded = self
                .fonts
                .get(&self.font)
                .map(|dict| FontMetrics::load(self.doc, dict))
                .unwrap_or_default();
            self.metrics.insert(self.font.clone(), loaded);
        }

        let (size, tc, tw, th) = (
            self.font_size,
            self.char_spacing,
            self.word_spacing,
            self.horizontal_scale,
        );
        let metrics = &self.metrics[&self.font];
        metrics
            .codes(bytes)
            .map(|code| {
                let mut w = metrics.width(code) / 1000.0 * size + tc;
                if !metrics.two_byte && code == 32 {
                    w += tw;
                }
                w * th
            })
            .sum()
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(font_dict) = self.fonts.get(&self.font) {
            if let Ok(encoding) = font_dict.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }

        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            return String::from_utf16_lossy(&utf16);
        }

        bytes.iter().map(|&b| b as char).collect()
    }

    fn show(&mut self, bytes: &[u8]) {
        let start = multiply(&self.tm, &self.ctm);
        let text = self.decode(bytes);
        let advance = self.advance(bytes);
        self.tm = translate(advance, 0.0, &self.tm);
        self.emit(text, start, advance);
    }

    fn show_array(&mut self, items: &[Object]) {
        let start = multiply(&self.tm, &self.ctm);
        let mut text = String::new();
        let mut total = 0.0;

        for item in items {
            let step = match item {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(bytes));
                    self.advance(bytes)
                }
                other => match number(other) {
                    Some(adjust) => -adjust / 1000.0 * self.font_size * self.horizontal_scale,
                    None => 0.0,
                },
            };
            self.tm = translate(step, 0.0, &self.tm);
            total += step;
        }

        self.emit(text, start, total);
    }

    fn emit(&mut self, text: String, trm: Matrix, advance: f32) {
        if text.trim().is_empty() {
            return;
        }
        let x_scale = trm[0].hypot(trm[1]);
        let y_scale = trm[2].hypot(trm[3]);
        let run = TextRun::new(
            text,
            trm[4],
            trm[5],
            advance * x_scale,
            self.font_size * y_scale,
        );
        trace!("run {:?} at ({:.1}, {:.1}) w={:.1}", run.text, run.x, run.y, run.width);
        self.runs.push(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn int(n: i64) -> Object {
        Object::Integer(n)
    }

    fn font(name: &str) -> Object {
        Object::Name(name.as_bytes().to_vec())
    }

    fn text(s: &str) -> Object {
        Object::string_literal(s)
    }

    fn interpret(ops: Vec<Operation>) -> Vec<TextRun> {
        let doc = Document::with_version("1.5");
        TextInterpreter::new(&doc, BTreeMap::new()).run(&ops)
    }

    #[test]
    fn test_multiply_translation() {
        let m = translate(10.0, 20.0, &[2.0, 0.0, 0.0, 2.0, 5.0, 5.0]);
        assert_eq!(m, [2.0, 0.0, 0.0, 2.0, 25.0, 45.0]);
    }

    #[test]
    fn test_positions_from_td_and_tm() {
        let runs = interpret(vec![
            op("BT", vec![]),
            op("Tf", vec![font("F1"), int(10)]),
            op("Td", vec![int(100), int(700)]),
            op("Tj", vec![text("ABC")]),
            op("Tm", vec![int(1), int(0), int(0), int(1), int(50), int(500)]),
            op("Tj", vec![text("X")]),
            op("ET", vec![]),
        ]);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "ABC");
        assert_eq!((runs[0].x, runs[0].y), (100.0, 700.0));
        // default width 500/1000 * 10 per glyph
        assert_eq!(runs[0].width, 15.0);
        assert_eq!(runs[0].height, 10.0);
        assert_eq!((runs[1].x, runs[1].y), (50.0, 500.0));
    }

    #[test]
    fn test_consecutive_tj_advances() {
        let runs = interpret(vec![
            op("BT", vec![]),
            op("Tf", vec![font("F1"), int(10)]),
            op("Td", vec![int(0), int(100)]),
            op("Tj", vec![text("AB")]),
            op("Tj", vec![text("C")]),
            op("ET", vec![]),
        ]);
        assert_eq!(runs[1].x, 10.0);
    }

    #[test]
    fn test_ctm_and_graphics_stack() {
        let runs = interpret(vec![
            op("q", vec![]),
            op("cm", vec![int(2), int(0), int(0), int(2), int(10), int(10)]),
            op("BT", vec![]),
            op("Tf", vec![font("F1"), int(5)]),
            op("Td", vec![int(1), int(1)]),
            op("Tj", vec![text("A")]),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Td", vec![int(1), int(1)]),
            op("Tj", vec![text("B")]),
            op("ET", vec![]),
        ]);

        assert_eq!((runs[0].x, runs[0].y), (12.0, 12.0));
        assert_eq!(runs[0].height, 10.0);
        assert_eq!((runs[1].x, runs[1].y), (1.0, 1.0));
    }

    #[test]
    fn test_tj_array_kerning_and_leading() {
        let runs = interpret(vec![
            op("BT", vec![]),
            op("Tf", vec![font("F1"), int(10)]),
            op("TD", vec![int(0), int(-12)]),
            op("TJ", vec![Object::Array(vec![text("A"), int(-1000), text("B")])]),
            op("T*", vec![]),
            op("Tj", vec![text("C")]),
            op("Tj", vec![text("   ")]),
            op("ET", vec![]),
        ]);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "AB");
        assert_eq!(runs[0].width, 20.0);
        assert_eq!(runs[1].y, -24.0);
    }

    #[test]
    fn test_simple_font_widths() {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65,
            "Widths" => vec![int(700), int(300)],
        });
        let font_dict = doc.get_dictionary(font_id).unwrap().clone();
        let mut fonts = BTreeMap::new();
        fonts.insert(b"F1".to_vec(), &font_dict);

        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![font("F1"), int(10)]),
            op("Tj", vec![text("ABZ")]),
            op("ET", vec![]),
        ];
        let runs = TextInterpreter::new(&doc, fonts).run(&ops);

        // 7 + 3 + 5 (no MissingWidth, default 500)
        assert!((runs[0].width - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_composite_font_widths() {
        let mut doc = Document::with_version("1.5");
        let cid_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 1000,
            "W" => vec![int(1), Object::Array(vec![int(500), int(250)]), int(10), int(12), int(600)],
        });
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_id)],
        });
        let type0 = doc.get_dictionary(font_id).unwrap().clone();
        let metrics = FontMetrics::load(&doc, &type0);

        assert!(metrics.two_byte);
        assert_eq!(metrics.width(1), 500.0);
        assert_eq!(metrics.width(2), 250.0);
        assert_eq!(metrics.width(11), 600.0);
        assert_eq!(metrics.width(99), 1000.0);
        assert_eq!(metrics.codes(&[0x00, 0x02, 0x00, 0x0B]).collect::<Vec<_>>(), vec![2, 11]);
    }

    #[test]
    fn test_malformed_width_ranges_are_skipped() {
        let mut doc = Document::with_version("1.5");
        let cid_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => vec![
                int(0), int(4294967295), int(500),
                int(-3), int(2), int(400),
                int(9), int(5), int(300),
                int(20), int(21), int(700),
            ],
        });
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(cid_id)],
        });
        let type0 = doc.get_dictionary(font_id).unwrap().clone();
        let metrics = FontMetrics::load(&doc, &type0);

        assert_eq!(metrics.widths.len(), 2);
        assert_eq!(metrics.width(0), 1000.0);
        assert_eq!(metrics.width(1), 1000.0);
        assert_eq!(metrics.width(7), 1000.0);
        assert_eq!(metrics.width(21), 700.0);
    }
}
