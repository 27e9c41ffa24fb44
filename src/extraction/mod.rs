//! Document metadata extraction pipeline.
//!
//! Given an uploaded file (PDF, image, or plain text) of a primary-source
//! historical document, produce a best-effort structured guess of title,
//! date, issuing agency, and document number, each with a confidence score.
//!
//! Components:
//! - `metadata`: pure pattern-matching field extraction
//! - `pdf`: Poppler-backed text layer reading and page rendering
//! - `ocr`: Tesseract-backed recognition with a reusable singleton worker
//! - `orchestrator`: file-kind detection and the decision policy tying the
//!   adapters together

pub mod metadata;
pub mod ocr;
pub mod orchestrator;
pub mod pdf;
pub mod progress;

pub use metadata::{parse_metadata, ExtractedMetadata, MetadataField};
pub use ocr::{OcrAdapter, OcrEngine, OcrError, OcrOutput};
pub use orchestrator::{
    calculate_overall_confidence, detect_file_kind, is_file_supported, supported_file_types,
    DocumentExtractor, ExtractionMethod, ExtractionResult, FileKind,
};
pub use pdf::{PdfError, PdfExtraction, PdfReadOptions, PdfReader, PopplerReader};
pub use progress::{ExtractionProgress, ExtractionStage, ProgressFn};

/// Availability of the external tools the default adapters shell out to.
pub fn check_tools() -> Vec<(String, bool)> {
    ["pdftotext", "pdftoppm", "pdfinfo", "tesseract"]
        .iter()
        .map(|tool| (tool.to_string(), ocr::check_binary(tool)))
        .collect()
}
