//! Item row anchor: the `*category*name` marker that starts an item line.

use super::patterns::{ITEM_ANCHOR_LINE, ITEM_NAME};
use super::{ExtractionMatch, FieldExtractor};

/// The located item anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAnchor {
    /// Strict item name: `*category*` plus the following non-space characters.
    pub name: String,
    /// Remainder of the anchor line after the name.
    pub remainder: String,
}

impl ItemAnchor {
    /// Leading characters of the name used to find the anchor among runs.
    pub fn probe(&self, chars: usize) -> String {
        self.name.chars().take(chars.max(1)).collect()
    }
}

/// Finds item anchors in reconstructed page text.
pub struct AnchorExtractor;

impl AnchorExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnchorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AnchorExtractor {
    type Output = ExtractionMatch<ItemAnchor>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        ITEM_ANCHOR_LINE
            .find_iter(text)
            .map(|m| {
                let line = m.as_str();
                let name = ITEM_NAME
                    .find(line)
                    .map(|n| n.as_str())
                    .unwrap_or(line)
                    .to_string();
                let remainder = line[name.len()..].trim().to_string();
                ExtractionMatch::new(ItemAnchor { name, remainder }, line)
                    .with_position(m.start(), m.end())
            })
            .collect()
    }
}
