//! Domain models shared across the extraction pipeline.

mod agency;

pub use agency::AgencyCode;
