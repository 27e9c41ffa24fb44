//! Extraction orchestrator.
//!
//! Detects the file kind, drives the PDF and OCR adapters according to the
//! decision policy, merges text, runs the metadata parser, and aggregates
//! confidences and warnings. `extract` never fails: every error becomes a
//! `success: false` result with the cause folded into the warnings, because
//! this pipeline sits under a user-facing upload flow that must not crash.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::config::ExtractionConfig;

use super::metadata::{self, ExtractedMetadata};
use super::ocr::{check_image_quality, OcrAdapter, OcrError};
use super::pdf::{PdfError, PdfReadOptions, PdfReader, PopplerReader};
use super::progress::{ExtractionStage, ProgressFn, ProgressReporter};

/// Which code path produced the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Direct PDF text layer.
    PdfText,
    /// OCR over rendered PDF pages (possibly merged with text-layer pages).
    PdfOcr,
    /// OCR over an image file.
    ImageOcr,
    /// Plain text read.
    TextFile,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfText => "pdf_text",
            Self::PdfOcr => "pdf_ocr",
            Self::ImageOcr => "image_ocr",
            Self::TextFile => "text_file",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detected kind of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    Text,
    Unknown,
}

/// Terminal artifact returned to the caller.
#[derive(Debug, Serialize)]
pub struct ExtractionResult {
    /// False only on unhandled failure (unsupported type, adapter error).
    pub success: bool,
    pub metadata: ExtractedMetadata,
    /// Full assembled text blob, retained for auditing and re-parsing.
    pub raw_text: String,
    /// Weighted combination of the four field confidences, 0-100.
    pub overall_confidence: u8,
    pub extraction_method: ExtractionMethod,
    /// Advisory caveats, never fatal.
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}

/// Errors internal to one extraction branch; folded into warnings at the
/// orchestrator boundary.
#[derive(Debug, Error)]
enum BranchError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to read text file: {0}")]
    Io(#[from] std::io::Error),
}

/// Field weights for the overall confidence. Title and date are slightly
/// favored as the fields most load-bearing for downstream filing.
const TITLE_WEIGHT: f64 = 0.30;
const DATE_WEIGHT: f64 = 0.25;
const AGENCY_WEIGHT: f64 = 0.25;
const NUMBER_WEIGHT: f64 = 0.20;

/// Overall confidence as a fixed weighted sum of the field confidences.
pub fn calculate_overall_confidence(metadata: &ExtractedMetadata) -> u8 {
    let weighted = metadata.title.confidence as f64 * TITLE_WEIGHT
        + metadata.date.confidence as f64 * DATE_WEIGHT
        + metadata.agency.confidence as f64 * AGENCY_WEIGHT
        + metadata.document_number.confidence as f64 * NUMBER_WEIGHT;
    weighted.round() as u8
}

/// Classify a file as PDF, image, or text using content sniffing first and
/// the extension as fallback.
pub fn detect_file_kind(path: &Path) -> FileKind {
    if let Ok(Some(kind)) = infer::get_from_path(path) {
        let mime = kind.mime_type();
        if mime == "application/pdf" {
            return FileKind::Pdf;
        }
        if mime.starts_with("image/") {
            return FileKind::Image;
        }
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => FileKind::Pdf,
        "jpg" | "jpeg" | "png" | "tiff" | "tif" | "webp" | "gif" => FileKind::Image,
        "txt" | "md" | "text" => FileKind::Text,
        _ => {
            if mime_guess::from_path(path)
                .first()
                .is_some_and(|m| m.type_() == mime_guess::mime::TEXT)
            {
                FileKind::Text
            } else {
                FileKind::Unknown
            }
        }
    }
}

/// File extensions the pipeline accepts, for UI/CLI capability lists.
pub fn supported_file_types() -> &'static [&'static str] {
    &[".pdf", ".png", ".jpg", ".jpeg", ".tiff", ".webp", ".txt"]
}

/// Whether a file would be accepted by `extract`.
pub fn is_file_supported(path: &Path) -> bool {
    detect_file_kind(path) != FileKind::Unknown
}

/// Per-file completion callback for batch extraction.
pub type BatchProgressFn = dyn Fn(usize, usize, &ExtractionResult) + Send + Sync;

/// The extraction pipeline. Adapters are injected so callers (and tests)
/// control the collaborators; the OCR adapter is shared to keep its worker
/// a process-wide singleton.
pub struct DocumentExtractor {
    pdf: Box<dyn PdfReader>,
    ocr: Arc<OcrAdapter>,
    config: ExtractionConfig,
}

impl DocumentExtractor {
    /// Extractor wired to the default collaborators: Poppler for PDFs and
    /// Tesseract for OCR.
    pub fn new(config: ExtractionConfig) -> Self {
        let ocr = Arc::new(OcrAdapter::tesseract(&config.ocr_language));
        Self::with_adapters(Box::new(PopplerReader::new()), ocr, config)
    }

    pub fn with_adapters(
        pdf: Box<dyn PdfReader>,
        ocr: Arc<OcrAdapter>,
        config: ExtractionConfig,
    ) -> Self {
        Self { pdf, ocr, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Shared OCR adapter, for callers that manage worker lifecycle
    /// themselves.
    pub fn ocr_adapter(&self) -> &Arc<OcrAdapter> {
        &self.ocr
    }

    /// Extract metadata from one file.
    ///
    /// Never fails; adapter errors and unsupported inputs come back as
    /// `success: false` with an explanatory warning. The progress callback
    /// is best-effort and may be invoked zero or more times.
    pub async fn extract(&self, path: &Path, on_progress: Option<&ProgressFn>) -> ExtractionResult {
        let start = Instant::now();
        let mut reporter = ProgressReporter::new(on_progress);
        let mut warnings = Vec::new();

        reporter.report(ExtractionStage::Detecting, 0, "Detecting file type...");
        let kind = detect_file_kind(path);

        let outcome = match kind {
            FileKind::Pdf => self.extract_from_pdf(path, &mut reporter, &mut warnings).await,
            FileKind::Image => self.extract_from_image(path, &mut reporter, &mut warnings).await,
            FileKind::Text => self.extract_from_text_file(path, &mut reporter).await,
            FileKind::Unknown => Err(BranchError::Unsupported(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            )),
        };

        match outcome {
            Ok((raw_text, extraction_method)) => {
                reporter.report(
                    ExtractionStage::ParsingMetadata,
                    80,
                    "Parsing metadata from text...",
                );
                let filename = path.file_name().and_then(|n| n.to_str());
                let metadata = metadata::parse_metadata(&raw_text, filename);
                let overall_confidence = calculate_overall_confidence(&metadata);

                let threshold = self.config.low_field_confidence;
                if metadata.title.confidence < threshold {
                    warnings.push("Title could not be reliably extracted".to_string());
                }
                if metadata.date.confidence < threshold {
                    warnings.push("Date could not be reliably extracted".to_string());
                }
                if metadata.agency.confidence < threshold {
                    warnings.push("Agency could not be reliably identified".to_string());
                }
                if metadata.document_number.confidence < threshold {
                    warnings.push("Document number could not be reliably extracted".to_string());
                }

                reporter.report(ExtractionStage::Complete, 100, "Extraction complete");

                ExtractionResult {
                    success: true,
                    metadata,
                    raw_text,
                    overall_confidence,
                    extraction_method,
                    warnings,
                    processing_time_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(error) => {
                tracing::warn!("extraction failed for {}: {}", path.display(), error);
                warnings.push(format!("Extraction failed: {}", error));

                ExtractionResult {
                    success: false,
                    metadata: ExtractedMetadata::empty(),
                    raw_text: String::new(),
                    overall_confidence: 0,
                    extraction_method: ExtractionMethod::TextFile,
                    warnings,
                    processing_time_ms: start.elapsed().as_millis() as u64,
                }
            }
        }
    }

    /// Sequential extraction over a list of files.
    ///
    /// The shared OCR worker is reused across the batch and torn down after
    /// the last file, since no further work is pending.
    pub async fn extract_batch(
        &self,
        paths: &[PathBuf],
        on_file_done: Option<&BatchProgressFn>,
    ) -> Vec<ExtractionResult> {
        let total = paths.len();
        let mut results = Vec::with_capacity(total);

        for (index, path) in paths.iter().enumerate() {
            let result = self.extract(path, None).await;
            if let Some(callback) = on_file_done {
                callback(index + 1, total, &result);
            }
            results.push(result);
        }

        self.ocr.terminate().await;
        results
    }

    /// PDF branch: prefer the text layer, fall back to per-page OCR.
    async fn extract_from_pdf(
        &self,
        path: &Path,
        reporter: &mut ProgressReporter<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<(String, ExtractionMethod), BranchError> {
        reporter.report(
            ExtractionStage::ExtractingText,
            10,
            "Extracting text from PDF...",
        );

        let options = PdfReadOptions {
            max_pages: self.config.max_pdf_pages,
            render_for_ocr: true,
            min_page_text_chars: self.config.min_page_text_chars,
            render_dpi: self.config.render_dpi,
        };
        let extraction = self.pdf.read_pages(path, options).await?;

        // Cheap path: a usable text layer skips OCR entirely.
        if extraction.has_text_layer
            && extraction.text.chars().count() > self.config.min_document_text_chars
        {
            return Ok((extraction.text, ExtractionMethod::PdfText));
        }

        // Pages with neither a text layer nor a rendered image have nothing
        // to contribute; each one gets its own advisory warning.
        let mut pending: Vec<(u32, &Path)> = Vec::new();
        for page in &extraction.pages {
            if page.has_text {
                continue;
            }
            match page.image_path.as_deref() {
                Some(image) => pending.push((page.page_number, image)),
                None => warnings.push(format!(
                    "Could not render page {} for OCR - its content is missing from the extracted text",
                    page.page_number
                )),
            }
        }

        if pending.is_empty() {
            warnings.push(
                "PDF appears to be scanned but could not render pages for OCR".to_string(),
            );
            return Ok((extraction.text.clone(), ExtractionMethod::PdfText));
        }

        reporter.report(
            ExtractionStage::RunningOcr,
            30,
            format!("Running OCR on {} page(s)...", pending.len()),
        );

        let total = pending.len();
        let mut ocr_texts: HashMap<u32, String> = HashMap::new();
        let mut confidences: Vec<f32> = Vec::new();

        for (index, (page_number, image_path)) in pending.iter().enumerate() {
            let progress = 30 + (index * 50 / total) as u8;
            reporter.report(
                ExtractionStage::RunningOcr,
                progress,
                format!("OCR: processing page {} of {}...", index + 1, total),
            );

            let output = self.ocr.recognize_file(image_path).await?;
            if let Some(confidence) = output.confidence {
                confidences.push(confidence);
            }
            ocr_texts.insert(*page_number, output.text);
        }

        // Merge, preserving original page order: text-layer pages keep their
        // text, OCR'd pages get their recognized output.
        let mut combined = String::new();
        for page in &extraction.pages {
            let chunk = if page.has_text {
                Some(&page.text)
            } else {
                ocr_texts.get(&page.page_number)
            };
            if let Some(chunk) = chunk {
                combined.push_str(chunk);
                combined.push_str("\n\n");
            }
        }

        if !confidences.is_empty() {
            let average = confidences.iter().sum::<f32>() / confidences.len() as f32;
            if average < self.config.low_ocr_confidence {
                warnings.push(format!(
                    "OCR confidence is low ({}%) - document may be difficult to read",
                    average.round()
                ));
            }
        }

        Ok((combined.trim().to_string(), ExtractionMethod::PdfOcr))
    }

    /// Image branch: quality pre-check, then OCR.
    async fn extract_from_image(
        &self,
        path: &Path,
        reporter: &mut ProgressReporter<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<(String, ExtractionMethod), BranchError> {
        check_image_quality(path, self.config.min_image_bytes)?;

        reporter.report(ExtractionStage::RunningOcr, 20, "Running OCR on image...");
        let output = self.ocr.recognize_file(path).await?;

        if output
            .confidence
            .is_some_and(|c| c < self.config.low_ocr_confidence)
        {
            warnings.push("OCR confidence is low - please verify extracted text".to_string());
        }

        Ok((output.text, ExtractionMethod::ImageOcr))
    }

    /// Text branch: decode bytes directly, nothing else to do before parsing.
    async fn extract_from_text_file(
        &self,
        path: &Path,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<(String, ExtractionMethod), BranchError> {
        reporter.report(ExtractionStage::ExtractingText, 50, "Reading text file...");
        let bytes = tokio::fs::read(path).await?;
        Ok((
            String::from_utf8_lossy(&bytes).to_string(),
            ExtractionMethod::TextFile,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::metadata::MetadataField;

    fn field(confidence: u8) -> MetadataField<String> {
        MetadataField {
            value: Some("x".to_string()),
            confidence,
            source: "test",
            alternatives: Vec::new(),
        }
    }

    #[test]
    fn test_overall_confidence_weighting() {
        let metadata = ExtractedMetadata {
            title: field(80),
            date: field(90),
            agency: MetadataField {
                value: Some(crate::models::AgencyCode::Fbi),
                confidence: 85,
                source: "test",
                alternatives: Vec::new(),
            },
            document_number: field(70),
        };
        // 80*0.3 + 90*0.25 + 85*0.25 + 70*0.2 = 81.75 -> 82
        assert_eq!(calculate_overall_confidence(&metadata), 82);
    }

    #[test]
    fn test_overall_confidence_zero_metadata() {
        assert_eq!(calculate_overall_confidence(&ExtractedMetadata::empty()), 0);
    }

    #[test]
    fn test_detect_file_kind_by_extension() {
        assert_eq!(detect_file_kind(Path::new("memo.pdf")), FileKind::Pdf);
        assert_eq!(detect_file_kind(Path::new("scan.JPG")), FileKind::Image);
        assert_eq!(detect_file_kind(Path::new("scan.webp")), FileKind::Image);
        assert_eq!(detect_file_kind(Path::new("notes.txt")), FileKind::Text);
        assert_eq!(detect_file_kind(Path::new("data.bin")), FileKind::Unknown);
    }

    #[test]
    fn test_detect_file_kind_sniffs_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mislabeled.dat");
        std::fs::write(&path, b"%PDF-1.4 fake header content").unwrap();
        assert_eq!(detect_file_kind(&path), FileKind::Pdf);
    }

    #[test]
    fn test_supported_types() {
        assert!(supported_file_types().contains(&".pdf"));
        assert!(is_file_supported(Path::new("a.png")));
        assert!(!is_file_supported(Path::new("a.exe")));
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(ExtractionMethod::PdfText.as_str(), "pdf_text");
        assert_eq!(ExtractionMethod::PdfOcr.as_str(), "pdf_ocr");
        assert_eq!(ExtractionMethod::ImageOcr.as_str(), "image_ocr");
        assert_eq!(ExtractionMethod::TextFile.as_str(), "text_file");
    }
}
