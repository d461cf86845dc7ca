//! Reading-order reconstruction from positioned glyph runs.

mod reconstruct;

pub use reconstruct::LayoutReconstructor;

use serde::{Deserialize, Serialize};

/// A positioned fragment of text as reported by the PDF layer.
///
/// Coordinates are in PDF user space: `y` is the baseline and grows upward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Text content (non-empty).
    pub text: String,
    /// Left edge of the run.
    pub x: f32,
    /// Baseline of the run.
    pub y: f32,
    /// Advance width of the run.
    pub width: f32,
    /// Height of the run (font size scaled to user space).
    pub height: f32,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge of the run.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Reconstructed text of one page plus the runs in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// Text with `\n` at inferred line breaks and spaces at inferred word gaps.
    pub text: String,
    /// Runs in reading order, kept for geometry-aware lookups.
    pub runs: Vec<TextRun>,
}

impl PageText {
    /// Reconstructed lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
