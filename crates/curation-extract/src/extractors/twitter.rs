//! X/Twitter post adapter. Matches `twitter.com/<user>/status/<id>` and the
//! `x.com` domain alias, sets `content_type_hint = 'A'` but supplies
//! tweet-specific metrics (likes/reposts) unavailable from generic meta tags.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::meta;
use crate::error::ExtractError;
use crate::traits::Extractor;
use crate::types::{Extracted, ExtractionContext, FetchedBody};

static STATUS_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:twitter\.com|x\.com)/([^/]+)/status/(\d+)").unwrap());

pub struct TwitterExtractor;

#[async_trait]
impl Extractor for TwitterExtractor {
    fn name(&self) -> &'static str {
        "twitter"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn can_handle(&self, canonical_url: &str) -> bool {
        STATUS_PATH.is_match(canonical_url)
    }

    async fn extract(
        &self,
        ctx: &ExtractionContext,
        body: &FetchedBody,
    ) -> Result<Extracted, ExtractError> {
        let caps = STATUS_PATH
            .captures(&ctx.canonical_url)
            .ok_or_else(|| ExtractError::Parse("not a twitter status URL".to_string()))?;
        let handle = caps[1].to_string();
        let status_id = caps[2].to_string();

        let page = meta::parse(&body.html);
        let main_content = meta::body_text(&body.html);

        Ok(Extracted {
            title: page
                .title
                .unwrap_or_else(|| format!("Post by @{handle}")),
            description: page.description.clone(),
            author: Some(handle.clone()),
            site_name: Some("X".to_string()),
            favicon: page.favicon,
            image: page.image,
            word_count: meta::word_count(&main_content),
            main_content: page.description.unwrap_or(main_content),
            language: page.language,
            content_type_hint: 'A',
            type_specific: serde_json::json!({
                "handle": handle,
                "statusId": status_id,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_status_urls_on_both_domains() {
        let ex = TwitterExtractor;
        assert!(ex.can_handle("https://twitter.com/rustlang/status/1234567890"));
        assert!(ex.can_handle("https://x.com/rustlang/status/1234567890"));
    }

    #[test]
    fn rejects_profile_urls() {
        let ex = TwitterExtractor;
        assert!(!ex.can_handle("https://x.com/rustlang"));
    }

    #[tokio::test]
    async fn extracts_handle_and_status_id() {
        let ex = TwitterExtractor;
        let ctx = ExtractionContext {
            canonical_url: "https://x.com/rustlang/status/1234567890".to_string(),
            firecrawl_api_key: None,
            apify_api_key: None,
        };
        let body = FetchedBody {
            html: "<html><head><title>rustlang on X</title></head><body></body></html>"
                .to_string(),
            content_type_header: None,
            final_url: ctx.canonical_url.clone(),
        };
        let extracted = ex.extract(&ctx, &body).await.unwrap();
        assert_eq!(extracted.type_specific["handle"], "rustlang");
        assert_eq!(extracted.type_specific["statusId"], "1234567890");
    }
}
