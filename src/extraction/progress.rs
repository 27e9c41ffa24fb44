//! Progress reporting for extraction calls.
//!
//! Progress is observed through a best-effort callback: a panicking observer
//! must never abort the extraction, and reported values are clamped so
//! callers always see non-decreasing progress within a single call.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

/// Pipeline stage, in the order stages are passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Detecting,
    ExtractingText,
    RunningOcr,
    ParsingMetadata,
    Complete,
}

impl ExtractionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detecting => "detecting",
            Self::ExtractingText => "extracting_text",
            Self::RunningOcr => "running_ocr",
            Self::ParsingMetadata => "parsing_metadata",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single progress update, emitted zero or more times per extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionProgress {
    pub stage: ExtractionStage,
    /// 0-100, non-decreasing within a call.
    pub progress: u8,
    pub message: String,
}

/// Observer callback for extraction progress.
pub type ProgressFn = dyn Fn(ExtractionProgress) + Send + Sync;

/// Wraps an optional observer, enforcing monotonic progress and guarding
/// against panicking callbacks.
pub struct ProgressReporter<'a> {
    callback: Option<&'a ProgressFn>,
    last_progress: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: Option<&'a ProgressFn>) -> Self {
        Self {
            callback,
            last_progress: 0,
        }
    }

    /// Report a stage/progress/message update.
    ///
    /// Progress never goes backwards: a value below the last reported one is
    /// clamped up. Observer panics are swallowed.
    pub fn report(&mut self, stage: ExtractionStage, progress: u8, message: impl Into<String>) {
        let progress = progress.min(100).max(self.last_progress);
        self.last_progress = progress;

        if let Some(callback) = self.callback {
            let update = ExtractionProgress {
                stage,
                progress,
                message: message.into(),
            };
            if catch_unwind(AssertUnwindSafe(|| callback(update))).is_err() {
                tracing::debug!("progress observer panicked; continuing extraction");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_stage_ordering() {
        assert!(ExtractionStage::Detecting < ExtractionStage::ExtractingText);
        assert!(ExtractionStage::ExtractingText < ExtractionStage::RunningOcr);
        assert!(ExtractionStage::RunningOcr < ExtractionStage::ParsingMetadata);
        assert!(ExtractionStage::ParsingMetadata < ExtractionStage::Complete);
    }

    #[test]
    fn test_progress_is_clamped_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let callback = move |p: ExtractionProgress| {
            seen_cb.lock().unwrap().push(p.progress);
        };
        let mut reporter = ProgressReporter::new(Some(&callback));
        reporter.report(ExtractionStage::Detecting, 0, "a");
        reporter.report(ExtractionStage::ExtractingText, 50, "b");
        reporter.report(ExtractionStage::RunningOcr, 30, "c");
        reporter.report(ExtractionStage::Complete, 100, "d");

        assert_eq!(*seen.lock().unwrap(), vec![0, 50, 50, 100]);
    }

    #[test]
    fn test_panicking_observer_does_not_abort() {
        let callback = |_: ExtractionProgress| panic!("observer bug");
        let mut reporter = ProgressReporter::new(Some(&callback));
        reporter.report(ExtractionStage::Detecting, 0, "still fine");
        reporter.report(ExtractionStage::Complete, 100, "done");
    }

    #[test]
    fn test_no_observer_is_noop() {
        let mut reporter = ProgressReporter::new(None);
        reporter.report(ExtractionStage::Complete, 100, "done");
    }
}
