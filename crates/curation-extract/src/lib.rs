//! Content extraction: the Extractor Registry (C2) routes a canonical URL
//! to the best-matching per-source-type adapter (C3); if none applies, a
//! generic HTML extractor is used. The registry is deterministic — same
//! URL always yields the same extractor version.

mod error;
pub mod extractors;
pub mod fetcher;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::ExtractError;
pub use fetcher::Fetcher;
pub use registry::ExtractorRegistry;
pub use traits::Extractor;
pub use types::{Extracted, ExtractionContext, FetchedBody};
