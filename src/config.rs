//! Extraction pipeline configuration.
//!
//! Every hand-tuned threshold of the pipeline lives here (or in the named
//! confidence table in `extraction::metadata`) so tuning never means hunting
//! for inline numbers. Defaults match the values the heuristics were
//! calibrated against; a TOML file can override any subset.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pages read from the front of a PDF. Metadata is front-loaded in
    /// government records and OCR is expensive, so more pages buy little.
    pub max_pdf_pages: u32,

    /// Document-level text-layer threshold: total extracted characters above
    /// which the PDF text layer is used directly, skipping OCR.
    pub min_document_text_chars: usize,

    /// Per-page text-layer threshold: pages at or below this are treated as
    /// image-only and rendered for OCR.
    pub min_page_text_chars: usize,

    /// Render resolution for rasterizing scanned PDF pages.
    pub render_dpi: u32,

    /// Tesseract language code.
    pub ocr_language: String,

    /// Minimum image file size worth running OCR on.
    pub min_image_bytes: u64,

    /// OCR confidence below which a text-fidelity warning is attached.
    pub low_ocr_confidence: f32,

    /// Field confidence below which a reliability warning is attached.
    pub low_field_confidence: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pdf_pages: 5,
            min_document_text_chars: 100,
            min_page_text_chars: 50,
            render_dpi: 300,
            ocr_language: "eng".to_string(),
            min_image_bytes: crate::extraction::ocr::MIN_IMAGE_BYTES,
            low_ocr_confidence: 60.0,
            low_field_confidence: 50,
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.max_pdf_pages, 5);
        assert_eq!(config.min_document_text_chars, 100);
        assert_eq!(config.min_page_text_chars, 50);
        assert_eq!(config.low_field_confidence, 50);
    }

    #[test]
    fn test_partial_toml_override() {
        let config: ExtractionConfig = toml::from_str("max_pdf_pages = 3\nocr_language = \"deu\"").unwrap();
        assert_eq!(config.max_pdf_pages, 3);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.render_dpi, 300);
    }
}
