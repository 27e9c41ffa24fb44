//! docmeta - document metadata extraction for primary-source archives.
//!
//! Client-side pipeline that turns an uploaded file (PDF, image, or plain
//! text) into confidence-scored guesses for title, date, issuing agency,
//! and document number, with progress reporting and no external services.

// Model types use `from_str` methods that return Option<Self>,
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod config;
pub mod extraction;
pub mod models;
