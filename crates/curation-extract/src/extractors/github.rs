//! GitHub repository adapter. Parses the repo's rendered HTML page for the
//! fields the generic extractor would miss (stars, primary language) and
//! sets `content_type_hint = 'R'` (repository), matching the classifier's
//! URL-pattern fallback for `github.com` (spec §4.3).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::meta;
use crate::error::ExtractError;
use crate::traits::Extractor;
use crate::types::{Extracted, ExtractionContext, FetchedBody};

static REPO_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^github\.com/([^/]+)/([^/?#]+)").unwrap());
static STAR_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"aria-label="([\d,]+) users? starred this repository""#).unwrap());

pub struct GitHubExtractor;

#[async_trait]
impl Extractor for GitHubExtractor {
    fn name(&self) -> &'static str {
        "github"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn can_handle(&self, canonical_url: &str) -> bool {
        let stripped = canonical_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        REPO_PATH.is_match(stripped)
    }

    async fn extract(
        &self,
        ctx: &ExtractionContext,
        body: &FetchedBody,
    ) -> Result<Extracted, ExtractError> {
        let stripped = ctx
            .canonical_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let caps = REPO_PATH
            .captures(stripped)
            .ok_or_else(|| ExtractError::Parse("not a github repo URL".to_string()))?;
        let owner = &caps[1];
        let repo = &caps[2];

        let page = meta::parse(&body.html);
        let main_content = meta::body_text(&body.html);
        let stars: Option<u64> = STAR_COUNT
            .captures(&body.html)
            .and_then(|c| c[1].replace(',', "").parse().ok());

        Ok(Extracted {
            title: page.title.unwrap_or_else(|| format!("{owner}/{repo}")),
            description: page.description,
            author: Some(owner.to_string()),
            site_name: Some("GitHub".to_string()),
            favicon: page.favicon,
            image: page.image,
            word_count: meta::word_count(&main_content),
            main_content,
            language: page.language,
            content_type_hint: 'R',
            type_specific: serde_json::json!({
                "owner": owner,
                "repo": repo,
                "stars": stars,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_repo_urls() {
        let ex = GitHubExtractor;
        assert!(ex.can_handle("https://github.com/anthropics/claude-code"));
        assert!(ex.can_handle("https://github.com/rust-lang/rust/issues/1"));
    }

    #[test]
    fn rejects_non_github_urls() {
        let ex = GitHubExtractor;
        assert!(!ex.can_handle("https://gitlab.com/foo/bar"));
        assert!(!ex.can_handle("https://github.com"));
    }

    #[tokio::test]
    async fn extracts_owner_and_repo() {
        let ex = GitHubExtractor;
        let ctx = ExtractionContext {
            canonical_url: "https://github.com/anthropics/claude-code".to_string(),
            firecrawl_api_key: None,
            apify_api_key: None,
        };
        let body = FetchedBody {
            html: "<html><head><title>anthropics/claude-code</title></head><body></body></html>"
                .to_string(),
            content_type_header: None,
            final_url: ctx.canonical_url.clone(),
        };
        let extracted = ex.extract(&ctx, &body).await.unwrap();
        assert_eq!(extracted.content_type_hint, 'R');
        assert_eq!(extracted.type_specific["owner"], "anthropics");
        assert_eq!(extracted.type_specific["repo"], "claude-code");
    }
}
