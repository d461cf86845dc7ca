//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the fapiao pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FapiaoConfig {
    /// Layout reconstruction thresholds.
    pub layout: LayoutConfig,

    /// Invoice field extraction configuration.
    pub extraction: ExtractionConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,
}

/// Geometry thresholds, in PDF layout units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Runs whose baselines differ by at most this much share a reading-order band.
    pub sort_y_tolerance: f32,

    /// A baseline jump larger than this starts a new text line.
    pub line_break_y_tolerance: f32,

    /// A horizontal gap larger than this between neighbours inserts a space.
    pub space_gap_threshold: f32,

    /// Runs within this distance of the item anchor belong to the item row.
    pub row_y_tolerance: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sort_y_tolerance: 5.0,
            line_break_y_tolerance: 8.0,
            space_gap_threshold: 2.0,
            row_y_tolerance: 12.0,
        }
    }
}

/// Invoice field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Absolute tolerance when matching `quantity * price` against the row amount.
    pub product_tolerance: f64,

    /// Number of leading name characters used to find the anchor run.
    pub anchor_probe_chars: usize,

    /// Use the positioned runs to collect the item row before falling back to text.
    pub prefer_geometry: bool,

    /// Recognised unit-of-measure tokens.
    pub units: Vec<String>,

    /// Unit used when none is recognised.
    pub default_unit: String,

    /// Placeholder shown for records without a recognised item name.
    pub unrecognized_name: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            product_tolerance: 0.05,
            anchor_probe_chars: 6,
            prefer_geometry: true,
            units: [
                "个", "套", "台", "箱", "盒", "米", "kg", "g", "L", "把", "张", "支", "组", "件",
                "只", "瓶", "包", "本", "桶", "卷", "块", "根", "双", "袋",
            ]
            .iter()
            .map(|u| u.to_string())
            .collect(),
            default_unit: "个".to_string(),
            unrecognized_name: "未识别商品".to_string(),
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Page to read glyph runs from (1-indexed).
    pub page: u32,

    /// Try an empty password on encrypted documents.
    pub decrypt_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page: 1,
            decrypt_empty_password: true,
        }
    }
}

impl FapiaoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: FapiaoConfig =
            serde_json::from_str(r#"{"layout": {"row_y_tolerance": 20.0}}"#).unwrap();
        assert_eq!(config.layout.row_y_tolerance, 20.0);
        assert_eq!(config.layout.sort_y_tolerance, 5.0);
        assert_eq!(config.extraction.default_unit, "个");
        assert_eq!(config.pdf.page, 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FapiaoConfig::default();
        config.extraction.product_tolerance = 0.1;
        config.save(&path).unwrap();

        let loaded = FapiaoConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.product_tolerance, 0.1);
    }
}
