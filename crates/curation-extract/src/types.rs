use serde::{Deserialize, Serialize};

/// Context passed to an extractor: the canonical URL and any upstream
/// credentials it may need (opaque — the extractor decides what to do
/// with them).
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub canonical_url: String,
    pub firecrawl_api_key: Option<String>,
    pub apify_api_key: Option<String>,
}

/// The fetched body handed to `Extractor::extract` — raw bytes plus
/// whatever the fetcher already knows from response headers.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub html: String,
    pub content_type_header: Option<String>,
    pub final_url: String,
}

/// Content-type hint, one of the 12 letters from the spec's fixed set.
pub type ContentTypeHint = char;

/// Result of C3 content extraction — the universal currency handed to the
/// Phase-1 classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extracted {
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub favicon: Option<String>,
    pub image: Option<String>,
    pub main_content: String,
    pub word_count: usize,
    pub language: Option<String>,
    pub content_type_hint: ContentTypeHint,
    /// Type-specific payload: tweet metrics, repository stars, video
    /// duration, etc. Opaque to everything but the extractor that wrote
    /// it and whatever UI renders it later.
    pub type_specific: serde_json::Value,
}

impl Extracted {
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.main_content.chars().take(max_chars).collect()
    }
}
