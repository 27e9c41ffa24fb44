//! OCR adapter with a lazily-created, reusable recognition worker.
//!
//! The adapter owns at most one engine instance per process. The worker is
//! created on first use, shared by every recognition call, and released only
//! by an explicit `terminate()` (natural after a batch). Concurrent callers
//! racing the first creation serialize on the worker lock, so exactly one
//! initialization ever runs.
//!
//! Before recognition every image goes through a fixed preprocessing step:
//! luminance-weighted grayscale conversion followed by a linear contrast
//! stretch around the midpoint.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from the OCR adapter and engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("OCR failed: {0}")]
    RecognitionFailed(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pixel-space bounding box of a recognized word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// One recognized word with its own confidence.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Result of recognizing one image.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    /// Full recognized text.
    pub text: String,
    /// Overall confidence on a 0-100 scale, if the engine reports one.
    pub confidence: Option<f32>,
    /// Per-word confidences and bounding boxes, when available.
    pub words: Vec<OcrWord>,
    /// Recognition time in milliseconds.
    pub processing_time_ms: u64,
}

/// A loaded recognition engine. Creation may be expensive (model load,
/// binary probe); recognition takes `&self` so one instance serves all calls.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recognize text in an already-preprocessed image.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError>;
}

/// Factory producing the engine on first use.
pub type EngineFactory = dyn Fn() -> Result<Arc<dyn OcrEngine>, OcrError> + Send + Sync;

/// Owns the singleton recognition worker.
///
/// Passed into the orchestrator explicitly; there is no ambient global
/// engine state.
pub struct OcrAdapter {
    factory: Arc<EngineFactory>,
    worker: Mutex<Option<Arc<dyn OcrEngine>>>,
}

impl OcrAdapter {
    pub fn new(factory: Arc<EngineFactory>) -> Self {
        Self {
            factory,
            worker: Mutex::new(None),
        }
    }

    /// Adapter backed by the system Tesseract binary.
    pub fn tesseract(language: &str) -> Self {
        let language = language.to_string();
        Self::new(Arc::new(move || {
            TesseractEngine::create(&language).map(|e| Arc::new(e) as Arc<dyn OcrEngine>)
        }))
    }

    /// Get the shared worker, creating it on first use.
    ///
    /// The slot lock is held across the creation await, so concurrent first
    /// callers wait for the single in-flight initialization instead of
    /// spawning duplicate workers.
    pub async fn acquire(&self) -> Result<Arc<dyn OcrEngine>, OcrError> {
        let mut slot = self.worker.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }

        let factory = self.factory.clone();
        let engine = tokio::task::spawn_blocking(move || factory())
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("engine init task failed: {}", e)))??;

        tracing::debug!("initialized OCR worker: {}", engine.name());
        *slot = Some(engine.clone());
        Ok(engine)
    }

    /// Recognize text in an image file.
    pub async fn recognize_file(&self, path: &Path) -> Result<OcrOutput, OcrError> {
        let path = path.to_path_buf();
        let image = tokio::task::spawn_blocking(move || {
            image::open(&path).map_err(|e| OcrError::ImageError(format!("failed to load image: {}", e)))
        })
        .await
        .map_err(|e| OcrError::ImageError(format!("image load task failed: {}", e)))??;

        self.recognize_image(image).await
    }

    /// Preprocess and recognize an in-memory image.
    pub async fn recognize_image(&self, image: DynamicImage) -> Result<OcrOutput, OcrError> {
        let engine = self.acquire().await?;
        tokio::task::spawn_blocking(move || {
            let processed = preprocess_for_ocr(&image);
            engine.recognize(&processed)
        })
        .await
        .map_err(|e| OcrError::RecognitionFailed(format!("recognition task failed: {}", e)))?
    }

    /// Release the worker. Safe to call when none was ever created.
    pub async fn terminate(&self) {
        let mut slot = self.worker.lock().await;
        if slot.take().is_some() {
            tracing::debug!("terminated OCR worker");
        }
    }

    /// Whether a worker currently exists (without creating one).
    pub async fn has_worker(&self) -> bool {
        self.worker.lock().await.is_some()
    }
}

/// Contrast stretch factor applied around the midpoint.
const CONTRAST_FACTOR: f32 = 1.3;

/// Grayscale + contrast enhancement applied before recognition.
///
/// Luminance weights 0.299/0.587/0.114; the stretch is fixed and
/// non-adaptive.
pub fn preprocess_for_ocr(image: &DynamicImage) -> DynamicImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut gray = image::GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luminance = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let stretched = (luminance - 128.0) * CONTRAST_FACTOR + 128.0;
        gray.put_pixel(x, y, image::Luma([stretched.clamp(0.0, 255.0) as u8]));
    }

    DynamicImage::ImageLuma8(gray)
}

/// Image subtypes accepted for OCR.
const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "webp"];

/// Minimum file size for an image worth running OCR on.
pub const MIN_IMAGE_BYTES: u64 = 10_000;

/// Quality pre-check run before investing in recognition.
///
/// Rejects files too small to OCR reliably and disallowed image subtypes,
/// so obviously unusable input fails fast with a specific reason.
pub fn check_image_quality(path: &Path, min_bytes: u64) -> Result<(), OcrError> {
    let size = std::fs::metadata(path)?.len();
    if size < min_bytes {
        return Err(OcrError::ImageError(
            "image file too small for reliable OCR".to_string(),
        ));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(OcrError::ImageError(format!(
            "unsupported image type: {}",
            if extension.is_empty() { "unknown" } else { &extension }
        )));
    }

    Ok(())
}

/// Check if a binary is available in PATH.
pub(crate) fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tesseract engine
// ---------------------------------------------------------------------------

/// OCR engine shelling out to the system Tesseract binary.
///
/// Uses TSV output so per-word confidences and bounding boxes come back in
/// the same pass as the text.
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    pub fn create(language: &str) -> Result<Self, OcrError> {
        if !check_binary("tesseract") {
            return Err(OcrError::EngineNotAvailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            ));
        }
        Ok(Self {
            language: language.to_string(),
        })
    }

    fn run_tesseract_tsv(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language, "tsv"])
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::RecognitionFailed(format!(
                        "tesseract failed: {}",
                        stderr
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::EngineNotAvailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();

        let temp_dir = tempfile::TempDir::new()?;
        let image_path = temp_dir.path().join("input.png");
        image
            .save(&image_path)
            .map_err(|e| OcrError::ImageError(format!("failed to write image: {}", e)))?;

        let tsv = self.run_tesseract_tsv(&image_path)?;
        let (text, confidence, words) = parse_tesseract_tsv(&tsv);

        Ok(OcrOutput {
            text,
            confidence,
            words,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Parse Tesseract TSV output into text, mean confidence, and words.
///
/// Level-5 rows are words; line breaks are reconstructed from the
/// block/paragraph/line grouping columns.
fn parse_tesseract_tsv(tsv: &str) -> (String, Option<f32>, Vec<OcrWord>) {
    let mut text = String::new();
    let mut words = Vec::new();
    let mut confidence_sum = 0.0f32;
    let mut current_group: Option<(u32, u32, u32)> = None;

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let parse =
            |s: &str| s.trim().parse::<u32>().ok();
        let (Some(block), Some(par), Some(line_num)) =
            (parse(cols[2]), parse(cols[3]), parse(cols[4]))
        else {
            continue;
        };
        let (Some(left), Some(top), Some(width), Some(height)) =
            (parse(cols[6]), parse(cols[7]), parse(cols[8]), parse(cols[9]))
        else {
            continue;
        };
        let Ok(conf) = cols[10].trim().parse::<f32>() else {
            continue;
        };
        let word_text = cols[11].trim();
        if word_text.is_empty() || conf < 0.0 {
            continue;
        }

        let group = (block, par, line_num);
        match current_group {
            Some(previous) if previous == group => text.push(' '),
            Some((prev_block, prev_par, _)) => {
                if prev_block != block || prev_par != par {
                    text.push_str("\n\n");
                } else {
                    text.push('\n');
                }
            }
            None => {}
        }
        current_group = Some(group);
        text.push_str(word_text);

        confidence_sum += conf;
        words.push(OcrWord {
            text: word_text.to_string(),
            confidence: conf,
            bbox: BoundingBox {
                x0: left,
                y0: top,
                x1: left + width,
                y1: top + height,
            },
        });
    }

    let confidence = if words.is_empty() {
        None
    } else {
        Some(confidence_sum / words.len() as f32)
    };
    (text, confidence, words)
}

// ---------------------------------------------------------------------------
// OCRS engine (optional, pure Rust)
// ---------------------------------------------------------------------------

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_engine::OcrsEngine;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_engine {
    use super::*;
    use std::path::PathBuf;

    /// Pure-Rust OCR engine using the ocrs crate.
    ///
    /// Models must be present on disk; download them from
    /// https://ocrs-models.s3-accelerate.amazonaws.com/ into the model
    /// directory. Reports no per-word confidences.
    pub struct OcrsEngine {
        engine: ocrs::OcrEngine,
    }

    impl OcrsEngine {
        pub fn load(model_dir: &Path) -> Result<Self, OcrError> {
            let detection_path = model_dir.join("text-detection.rten");
            let recognition_path = model_dir.join("text-recognition.rten");
            if !detection_path.exists() || !recognition_path.exists() {
                return Err(OcrError::EngineNotAvailable(format!(
                    "ocrs models not found in {:?} (expected text-detection.rten and text-recognition.rten)",
                    model_dir
                )));
            }

            let detection_model = rten::Model::load_file(&detection_path).map_err(|e| {
                OcrError::RecognitionFailed(format!("failed to load detection model: {}", e))
            })?;
            let recognition_model = rten::Model::load_file(&recognition_path).map_err(|e| {
                OcrError::RecognitionFailed(format!("failed to load recognition model: {}", e))
            })?;

            let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|e| OcrError::RecognitionFailed(format!("failed to create OCR engine: {}", e)))?;

            Ok(Self { engine })
        }

        /// Adapter factory loading models from `model_dir` on first use.
        pub fn adapter(model_dir: PathBuf) -> OcrAdapter {
            OcrAdapter::new(Arc::new(move || {
                OcrsEngine::load(&model_dir).map(|e| Arc::new(e) as Arc<dyn OcrEngine>)
            }))
        }
    }

    impl OcrEngine for OcrsEngine {
        fn name(&self) -> &'static str {
            "ocrs"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
            let start = Instant::now();

            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), (width, height))
                .map_err(|e| OcrError::ImageError(format!("failed to convert image: {}", e)))?;

            let input = self
                .engine
                .prepare_input(source)
                .map_err(|e| OcrError::RecognitionFailed(format!("failed to prepare input: {}", e)))?;
            let text = self
                .engine
                .get_text(&input)
                .map_err(|e| OcrError::RecognitionFailed(format!("failed to extract text: {}", e)))?;

            Ok(OcrOutput {
                text,
                confidence: None,
                words: Vec::new(),
                processing_time_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}
