//! The Phase-2 Enricher (C9): a bounded worker pool that deep-enriches
//! nodes already imported and Phase-1 classified. Never blocks import —
//! it drains `curation_queue::Queue`'s `phase2` jobs independently.

mod normalize;
mod prompt;
mod reclassify;
mod schema;
mod worker;

pub use normalize::normalize_metadata_codes;
pub use schema::{EnrichmentMetadataCode, EnrichmentOutput};
pub use worker::EnrichmentWorker;
