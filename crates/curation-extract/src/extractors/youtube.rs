//! YouTube video adapter. Matches `youtube.com/watch`, `youtu.be/...` and
//! `youtube.com/shorts/...`, sets `content_type_hint = 'V'` (video).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::meta;
use crate::error::ExtractError;
use crate::traits::Extractor;
use crate::types::{Extracted, ExtractionContext, FetchedBody};

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?v=|shorts/)|youtu\.be/)([A-Za-z0-9_-]{6,})").unwrap()
});
static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""lengthSeconds":"(\d+)""#).unwrap());
static VIEW_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""viewCount":"(\d+)""#).unwrap());

pub struct YouTubeExtractor;

#[async_trait]
impl Extractor for YouTubeExtractor {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn can_handle(&self, canonical_url: &str) -> bool {
        VIDEO_ID.is_match(canonical_url)
    }

    async fn extract(
        &self,
        ctx: &ExtractionContext,
        body: &FetchedBody,
    ) -> Result<Extracted, ExtractError> {
        let video_id = VIDEO_ID
            .captures(&ctx.canonical_url)
            .map(|c| c[1].to_string())
            .ok_or_else(|| ExtractError::Parse("not a youtube video URL".to_string()))?;

        let page = meta::parse(&body.html);
        let main_content = meta::body_text(&body.html);
        let duration_seconds: Option<u64> = DURATION
            .captures(&body.html)
            .and_then(|c| c[1].parse().ok());
        let view_count: Option<u64> = VIEW_COUNT
            .captures(&body.html)
            .and_then(|c| c[1].parse().ok());

        Ok(Extracted {
            title: page.title.unwrap_or_else(|| ctx.canonical_url.clone()),
            description: page.description,
            author: page.author.or_else(|| page.site_name.clone()),
            site_name: Some("YouTube".to_string()),
            favicon: page.favicon,
            image: page.image,
            word_count: meta::word_count(&main_content),
            main_content,
            language: page.language,
            content_type_hint: 'V',
            type_specific: serde_json::json!({
                "videoId": video_id,
                "durationSeconds": duration_seconds,
                "viewCount": view_count,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_watch_and_short_urls() {
        let ex = YouTubeExtractor;
        assert!(ex.can_handle("https://www.youtube.com/watch?v=abcdefghijk"));
        assert!(ex.can_handle("https://youtu.be/abcdefghijk"));
        assert!(ex.can_handle("https://youtube.com/shorts/abcdefghijk"));
    }

    #[test]
    fn rejects_channel_urls() {
        let ex = YouTubeExtractor;
        assert!(!ex.can_handle("https://www.youtube.com/c/SomeChannel"));
    }

    #[tokio::test]
    async fn extracts_video_id_and_duration() {
        let ex = YouTubeExtractor;
        let ctx = ExtractionContext {
            canonical_url: "https://www.youtube.com/watch?v=abc12345678".to_string(),
            firecrawl_api_key: None,
            apify_api_key: None,
        };
        let body = FetchedBody {
            html: r#"<html><head><title>A Video</title></head><body>
                "lengthSeconds":"245","viewCount":"1000"
            </body></html>"#
                .to_string(),
            content_type_header: None,
            final_url: ctx.canonical_url.clone(),
        };
        let extracted = ex.extract(&ctx, &body).await.unwrap();
        assert_eq!(extracted.content_type_hint, 'V');
        assert_eq!(extracted.type_specific["videoId"], "abc12345678");
        assert_eq!(extracted.type_specific["durationSeconds"], 245);
    }
}
