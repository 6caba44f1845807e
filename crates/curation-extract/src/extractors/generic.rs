//! The fallback extractor used when no per-source-type adapter claims a
//! URL. Parses standard `<meta>`/OpenGraph tags and renders the body to
//! plain text for the classifier's excerpt.

use async_trait::async_trait;

use super::meta;
use crate::error::ExtractError;
use crate::traits::Extractor;
use crate::types::{Extracted, ExtractionContext, FetchedBody};

pub struct GenericExtractor;

#[async_trait]
impl Extractor for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn can_handle(&self, _canonical_url: &str) -> bool {
        true
    }

    async fn extract(
        &self,
        ctx: &ExtractionContext,
        body: &FetchedBody,
    ) -> Result<Extracted, ExtractError> {
        if body.html.trim().is_empty() {
            return Err(ExtractError::Parse("empty response body".to_string()));
        }

        let page = meta::parse(&body.html);
        let main_content = meta::body_text(&body.html);
        let title = page
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| ctx.canonical_url.clone());

        Ok(Extracted {
            title,
            description: page.description,
            author: page.author,
            site_name: page.site_name,
            favicon: page.favicon,
            image: page.image,
            word_count: meta::word_count(&main_content),
            main_content,
            language: page.language,
            content_type_hint: 'A',
            type_specific: serde_json::Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExtractionContext {
        ExtractionContext {
            canonical_url: "https://example.com/article".to_string(),
            firecrawl_api_key: None,
            apify_api_key: None,
        }
    }

    fn body(html: &str) -> FetchedBody {
        FetchedBody {
            html: html.to_string(),
            content_type_header: Some("text/html".to_string()),
            final_url: "https://example.com/article".to_string(),
        }
    }

    #[tokio::test]
    async fn extracts_title_and_description() {
        let html = r#"<html lang="en"><head><title>Hello World</title>
            <meta name="description" content="A test page"></head>
            <body><p>Some body text here.</p></body></html>"#;
        let extracted = GenericExtractor.extract(&ctx(), &body(html)).await.unwrap();
        assert_eq!(extracted.title, "Hello World");
        assert_eq!(extracted.description.as_deref(), Some("A test page"));
        assert_eq!(extracted.language.as_deref(), Some("en"));
        assert!(extracted.word_count > 0);
    }

    #[tokio::test]
    async fn falls_back_to_url_when_no_title() {
        let html = "<html><body><p>no title here</p></body></html>";
        let extracted = GenericExtractor.extract(&ctx(), &body(html)).await.unwrap();
        assert_eq!(extracted.title, "https://example.com/article");
    }

    #[tokio::test]
    async fn rejects_empty_body() {
        let result = GenericExtractor.extract(&ctx(), &body("")).await;
        assert!(result.is_err());
    }

    #[test]
    fn always_can_handle() {
        assert!(GenericExtractor.can_handle("https://anything.example/"));
    }
}
