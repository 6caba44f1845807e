//! `classify(extracted) -> Classification` (§4.3): cache lookup, LLM call
//! with a strict schema, output validation/clamping, and a URL-pattern
//! fallback whenever the LLM call itself fails. Classification is never
//! fatal to an import.

use std::sync::Arc;
use std::time::Duration;

use curation_ai::{complete_structured, LlmProvider};
use curation_core::taxonomy::{
    category_belongs_to_segment, is_valid_content_type, is_valid_organization, is_valid_segment,
    DEFAULT_CATEGORY, DEFAULT_CONTENT_TYPE, DEFAULT_ORGANIZATION, DEFAULT_SEGMENT,
};
use curation_core::Classification;
use curation_extract::Extracted;

use crate::cache::ClassifierCache;
use crate::fallback::fallback_classification;
use crate::prompt::{system_prompt, user_prompt};
use crate::schema::ClassificationOutput;

const REASONING_MAX_CHARS: usize = 200;

pub struct Classifier {
    provider: Arc<dyn LlmProvider>,
    cache: ClassifierCache,
}

impl Classifier {
    pub fn new(provider: Arc<dyn LlmProvider>, cache_ttl: Duration) -> Self {
        Self {
            provider,
            cache: ClassifierCache::new(cache_ttl),
        }
    }

    /// `canonical_url` doubles as the cache key and, on fallback, the
    /// source of the URL-pattern hints.
    pub async fn classify(
        &self,
        canonical_url: &str,
        domain: &str,
        extracted: &Extracted,
        force_refresh: bool,
    ) -> Classification {
        if !force_refresh {
            if let Some(cached) = self.cache.get(canonical_url) {
                return cached;
            }
        }

        match self.classify_via_llm(canonical_url, domain, extracted).await {
            Ok(classification) => {
                self.cache
                    .insert(canonical_url.to_string(), classification.clone());
                classification
            }
            Err(error) => {
                tracing::warn!(url = canonical_url, %error, "classifier LLM call failed, using fallback");
                fallback_classification(canonical_url, extracted)
            }
        }
    }

    async fn classify_via_llm(
        &self,
        canonical_url: &str,
        domain: &str,
        extracted: &Extracted,
    ) -> curation_core::CurationResult<Classification> {
        let system = system_prompt();
        let user = user_prompt(canonical_url, domain, extracted);
        let (output, _usage) =
            complete_structured::<ClassificationOutput>(self.provider.as_ref(), &system, &user)
                .await?;
        Ok(validate(output))
    }
}

/// Clamp/replace every field per the validation policy in §4.3: anything
/// outside its allowed set is replaced by the safe default rather than
/// rejected outright.
fn validate(output: ClassificationOutput) -> Classification {
    let segment = output
        .segment
        .chars()
        .next()
        .filter(|c| is_valid_segment(*c))
        .unwrap_or(DEFAULT_SEGMENT);

    let category = if category_belongs_to_segment(segment, &output.category) {
        output.category
    } else {
        DEFAULT_CATEGORY.to_string()
    };

    let content_type = output
        .content_type
        .chars()
        .next()
        .filter(|c| is_valid_content_type(*c))
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let organization = if is_valid_organization(&output.organization) {
        output.organization
    } else {
        DEFAULT_ORGANIZATION.to_string()
    };

    let confidence = output.confidence.clamp(0.0, 1.0);
    let reasoning = output
        .reasoning
        .map(|r| r.chars().take(REASONING_MAX_CHARS).collect());

    Classification {
        segment,
        category,
        content_type,
        organization,
        confidence,
        reasoning,
        from_cache: false,
        fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curation_ai::TokenUsage;

    struct StubProvider {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete(&self, _system: &str, _user: &str) -> curation_core::CurationResult<String> {
            Ok(self.response.clone())
        }

        async fn complete_json_schema(
            &self,
            _system: &str,
            _user: &str,
            _schema_name: &str,
            _schema: serde_json::Value,
        ) -> curation_core::CurationResult<(String, TokenUsage)> {
            Ok((self.response.clone(), TokenUsage::default()))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn complete(&self, _system: &str, _user: &str) -> curation_core::CurationResult<String> {
            Err(curation_core::CurationError::new(
                curation_core::ErrorKind::LlmTimeout,
                "timed out",
            ))
        }

        async fn complete_json_schema(
            &self,
            _system: &str,
            _user: &str,
            _schema_name: &str,
            _schema: serde_json::Value,
        ) -> curation_core::CurationResult<(String, TokenUsage)> {
            Err(curation_core::CurationError::new(
                curation_core::ErrorKind::LlmTimeout,
                "timed out",
            ))
        }
    }

    fn extracted() -> Extracted {
        Extracted {
            title: "Rust async book".to_string(),
            description: Some("Learn async Rust".to_string()),
            author: None,
            site_name: None,
            favicon: None,
            image: None,
            main_content: "async await futures tokio".to_string(),
            word_count: 4,
            language: Some("en".to_string()),
            content_type_hint: 'A',
            type_specific: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn classifies_via_llm_and_caches() {
        let response = serde_json::json!({
            "segment": "T",
            "category": "DEV",
            "contentType": "A",
            "organization": "UNKN",
            "confidence": 0.92,
            "reasoning": "rust async guide"
        })
        .to_string();
        let classifier = Classifier::new(
            Arc::new(StubProvider { response }),
            Duration::from_secs(3600),
        );
        let result = classifier
            .classify("https://a.example.com", "a.example.com", &extracted(), false)
            .await;
        assert_eq!(result.segment, 'T');
        assert_eq!(result.category, "DEV");
        assert!(!result.from_cache);

        let cached = classifier
            .classify("https://a.example.com", "a.example.com", &extracted(), false)
            .await;
        assert!(cached.from_cache);
    }

    #[tokio::test]
    async fn invalid_category_is_coerced_to_other() {
        let response = serde_json::json!({
            "segment": "T",
            "category": "FIN",
            "contentType": "A",
            "organization": "UNKN",
            "confidence": 0.5,
            "reasoning": null
        })
        .to_string();
        let classifier = Classifier::new(
            Arc::new(StubProvider { response }),
            Duration::from_secs(3600),
        );
        let result = classifier
            .classify("https://b.example.com", "b.example.com", &extracted(), false)
            .await;
        assert_eq!(result.category, "OTH");
    }

    #[tokio::test]
    async fn llm_failure_falls_back() {
        let classifier = Classifier::new(Arc::new(FailingProvider), Duration::from_secs(3600));
        let result = classifier
            .classify("https://github.com/foo/bar", "github.com", &extracted(), false)
            .await;
        assert!(result.fallback);
        assert!(result.confidence <= 0.3);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let response = serde_json::json!({
            "segment": "T",
            "category": "DEV",
            "contentType": "A",
            "organization": "UNKN",
            "confidence": 0.7,
            "reasoning": null
        })
        .to_string();
        let classifier = Classifier::new(
            Arc::new(StubProvider { response }),
            Duration::from_secs(3600),
        );
        let _ = classifier
            .classify("https://c.example.com", "c.example.com", &extracted(), false)
            .await;
        let forced = classifier
            .classify("https://c.example.com", "c.example.com", &extracted(), true)
            .await;
        assert!(!forced.from_cache);
    }
}
