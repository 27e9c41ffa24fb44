//! PDF text extraction and page rendering using Poppler tools.
//!
//! Reads the text layer page by page with pdftotext and rasterizes pages
//! that lack one with pdftoppm, so the orchestrator can route them through
//! OCR. A page whose trimmed text layer is 50 characters or shorter is
//! treated as image-only: very short text layers are usually just a stamped
//! page number on an otherwise-scanned page.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;

/// Errors from the PDF adapter.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("PDF read failed: {0}")]
    ReadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for a bounded read of a PDF's leading pages.
#[derive(Debug, Clone)]
pub struct PdfReadOptions {
    /// Maximum number of pages to process from the front of the document.
    pub max_pages: u32,
    /// Rasterize pages without a text layer for OCR.
    pub render_for_ocr: bool,
    /// Trimmed character count above which a page counts as having text.
    pub min_page_text_chars: usize,
    /// Render resolution for rasterized pages.
    pub render_dpi: u32,
}

impl Default for PdfReadOptions {
    fn default() -> Self {
        Self {
            max_pages: 5,
            render_for_ocr: true,
            min_page_text_chars: 50,
            render_dpi: 300,
        }
    }
}

/// One processed page.
#[derive(Debug)]
pub struct PdfPage {
    /// 1-based page number.
    pub page_number: u32,
    /// Trimmed text-layer content, possibly empty.
    pub text: String,
    /// Whether the text layer was long enough to count.
    pub has_text: bool,
    /// Rendered image for OCR, present only for pages without text that
    /// could be rasterized.
    pub image_path: Option<PathBuf>,
}

/// Result of reading a PDF's leading pages.
///
/// Owns the temporary directory holding any rendered page images; the image
/// paths in `pages` stay valid for this value's lifetime.
#[derive(Debug)]
pub struct PdfExtraction {
    /// Concatenated text-layer content of all processed pages.
    pub text: String,
    /// Total pages in the document (not just processed ones).
    pub page_count: u32,
    /// True if any processed page had a usable text layer.
    pub has_text_layer: bool,
    /// Per-page results, in document order.
    pub pages: Vec<PdfPage>,
    _image_dir: Option<TempDir>,
}

impl PdfExtraction {
    /// Build an extraction that owns no rendered images. Readers that
    /// rasterize pages attach the backing directory themselves.
    pub fn new(text: String, page_count: u32, has_text_layer: bool, pages: Vec<PdfPage>) -> Self {
        Self {
            text,
            page_count,
            has_text_layer,
            pages,
            _image_dir: None,
        }
    }
}

/// Collaborator contract for reading PDFs.
#[async_trait]
pub trait PdfReader: Send + Sync {
    /// Read up to `options.max_pages` pages, extracting text layers and
    /// rendering images for pages that lack one.
    async fn read_pages(
        &self,
        path: &Path,
        options: PdfReadOptions,
    ) -> Result<PdfExtraction, PdfError>;
}

/// PDF reader backed by Poppler's pdftotext / pdftoppm / pdfinfo.
#[derive(Debug, Default, Clone)]
pub struct PopplerReader;

impl PopplerReader {
    pub fn new() -> Self {
        Self
    }

    /// Total page count, if pdfinfo can read the document.
    pub fn page_count(&self, path: &Path) -> Option<u32> {
        let output = Command::new("pdfinfo").arg(path).output().ok()?;
        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if line.starts_with("Pages:") {
                return line.split_whitespace().nth(1).and_then(|s| s.parse().ok());
            }
        }
        None
    }

    /// Quick first-page probe: does this PDF likely need OCR?
    ///
    /// A first page with fewer than 100 characters of text layer, or any
    /// read error, is treated as needing OCR.
    pub fn needs_ocr(&self, path: &Path) -> bool {
        match extract_page_text(path, 1) {
            Ok(text) => text.trim().chars().count() < 100,
            Err(_) => true,
        }
    }
}

#[async_trait]
impl PdfReader for PopplerReader {
    async fn read_pages(
        &self,
        path: &Path,
        options: PdfReadOptions,
    ) -> Result<PdfExtraction, PdfError> {
        let path = path.to_path_buf();
        let reader = self.clone();
        tokio::task::spawn_blocking(move || reader.read_pages_blocking(&path, &options))
            .await
            .map_err(|e| PdfError::ReadFailed(format!("PDF read task failed: {}", e)))?
    }
}

impl PopplerReader {
    fn read_pages_blocking(
        &self,
        path: &Path,
        options: &PdfReadOptions,
    ) -> Result<PdfExtraction, PdfError> {
        let page_count = self.page_count(path).unwrap_or(1);
        let pages_to_process = page_count.min(options.max_pages);

        let mut image_dir: Option<TempDir> = None;
        let mut pages = Vec::with_capacity(pages_to_process as usize);
        let mut full_text = String::new();
        let mut has_any_text = false;

        for page_number in 1..=pages_to_process {
            let text = extract_page_text(path, page_number)?;
            let text = text.trim().to_string();
            let has_text = text.chars().count() > options.min_page_text_chars;
            if has_text {
                has_any_text = true;
            }

            let mut image_path = None;
            if !has_text && options.render_for_ocr {
                if image_dir.is_none() {
                    image_dir = Some(TempDir::new()?);
                }
                let dir = image_dir.as_ref().map(|d| d.path()).unwrap_or(path);
                match render_page(path, page_number, dir, options.render_dpi) {
                    Ok(rendered) => image_path = Some(rendered),
                    Err(e) => {
                        tracing::warn!("failed to render page {} for OCR: {}", page_number, e);
                    }
                }
            }

            if !full_text.is_empty() {
                full_text.push_str("\n\n");
            }
            full_text.push_str(&text);

            pages.push(PdfPage {
                page_number,
                text,
                has_text,
                image_path,
            });
        }

        Ok(PdfExtraction {
            text: full_text.trim().to_string(),
            page_count,
            has_text_layer: has_any_text,
            pages,
            _image_dir: image_dir,
        })
    }
}

/// Run pdftotext on a single page.
fn extract_page_text(path: &Path, page: u32) -> Result<String, PdfError> {
    let page_str = page.to_string();
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
        .arg(path)
        .arg("-")
        .output();

    match output {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PdfError::ReadFailed(format!(
                    "pdftotext failed on page {}: {}",
                    page, stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PdfError::ToolNotFound(
            "pdftotext (install poppler-utils)".to_string(),
        )),
        Err(e) => Err(PdfError::Io(e)),
    }
}

/// Rasterize a single page to PNG with pdftoppm.
fn render_page(path: &Path, page: u32, output_dir: &Path, dpi: u32) -> Result<PathBuf, PdfError> {
    let page_str = page.to_string();
    let dpi_str = dpi.to_string();
    let output_prefix = output_dir.join("page");

    let status = Command::new("pdftoppm")
        .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
        .arg(path)
        .arg(&output_prefix)
        .status();

    match status {
        Ok(s) if s.success() => find_page_image(output_dir, page).ok_or_else(|| {
            PdfError::ReadFailed(format!("no image generated for page {}", page))
        }),
        Ok(_) => Err(PdfError::ReadFailed(
            "pdftoppm failed to convert PDF page".to_string(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PdfError::ToolNotFound(
            "pdftoppm (install poppler-utils)".to_string(),
        )),
        Err(e) => Err(PdfError::Io(e)),
    }
}

/// Find the image pdftoppm generated for a page.
///
/// pdftoppm pads page numbers in output names (page-01.png, page-001.png)
/// depending on document size.
fn find_page_image(dir: &Path, page_num: u32) -> Option<PathBuf> {
    for digits in [1, 2, 3, 4] {
        let filename = format!("page-{:0width$}.png", page_num, width = digits);
        let path = dir.join(&filename);
        if path.exists() {
            return Some(path);
        }
    }
    None
}
