use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::{Extracted, ExtractionContext, FetchedBody};

/// A per-source-type content adapter. Implementors are stateless and
/// cheap to construct; the registry owns them behind `Arc`.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn version(&self) -> &'static str;

    /// Higher wins when more than one extractor can handle a URL.
    fn priority(&self) -> i32;

    /// Whether this extractor applies to `canonical_url`. Must be a pure,
    /// deterministic function of the URL alone — the registry relies on
    /// that for stable routing.
    fn can_handle(&self, canonical_url: &str) -> bool;

    async fn extract(
        &self,
        ctx: &ExtractionContext,
        body: &FetchedBody,
    ) -> Result<Extracted, ExtractError>;
}
