//! The Extractor Registry (C2): picks the highest-priority extractor whose
//! `can_handle` is true, falling back to the generic HTML extractor when
//! none applies.

use std::sync::Arc;

use crate::error::ExtractError;
use crate::traits::Extractor;
use crate::types::{Extracted, ExtractionContext, FetchedBody};

pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
    generic: Arc<dyn Extractor>,
}

impl ExtractorRegistry {
    /// The default registry: the generic HTML extractor plus every
    /// per-source-type adapter this crate ships. `extractors` is kept
    /// sorted by descending priority so `select` is a simple linear scan.
    pub fn with_defaults() -> Self {
        let mut extractors: Vec<Arc<dyn Extractor>> = vec![
            Arc::new(crate::extractors::github::GitHubExtractor),
            Arc::new(crate::extractors::youtube::YouTubeExtractor),
            Arc::new(crate::extractors::twitter::TwitterExtractor),
        ];
        extractors.sort_by_key(|e| std::cmp::Reverse(e.priority()));
        Self {
            extractors,
            generic: Arc::new(crate::extractors::generic::GenericExtractor),
        }
    }

    /// Deterministic selection: the same canonical URL always returns the
    /// same extractor, since `can_handle` is required to be pure.
    pub fn select(&self, canonical_url: &str) -> Arc<dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(canonical_url))
            .cloned()
            .unwrap_or_else(|| self.generic.clone())
    }

    pub async fn extract(
        &self,
        ctx: &ExtractionContext,
        body: &FetchedBody,
    ) -> Result<Extracted, ExtractError> {
        let extractor = self.select(&ctx.canonical_url);
        extractor.extract(ctx, body).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_github_over_generic() {
        let registry = ExtractorRegistry::with_defaults();
        let extractor = registry.select("https://github.com/anthropics/claude-code");
        assert_eq!(extractor.name(), "github");
    }

    #[test]
    fn falls_back_to_generic_for_unmatched_urls() {
        let registry = ExtractorRegistry::with_defaults();
        let extractor = registry.select("https://example.com/article");
        assert_eq!(extractor.name(), "generic");
    }

    #[test]
    fn selection_is_deterministic() {
        let registry = ExtractorRegistry::with_defaults();
        let a = registry.select("https://youtube.com/watch?v=abc");
        let b = registry.select("https://youtube.com/watch?v=abc");
        assert_eq!(a.name(), b.name());
        assert_eq!(a.version(), b.version());
    }
}
