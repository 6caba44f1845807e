use async_trait::async_trait;
use serde::de::DeserializeOwned;

use curation_core::CurationResult;

use crate::client::OpenAiClient;
use crate::schema::StructuredOutput;
use crate::types::{ChatRequest, JsonSchemaFormat, ResponseFormat, StructuredRequest, WireMessage};

/// Token usage reported on a cache miss — the spec requires usage only be
/// surfaced when the classifier actually called the LLM.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// The provider-agnostic contract the classifier (C4) and enricher (C9)
/// depend on. The spec treats the concrete wire protocol as an external
/// collaborator; this trait is the seam. Kept object-safe (no generics) so
/// callers hold an `Arc<dyn LlmProvider>`; the generic, schema-typed
/// convenience wrapper lives in `complete_structured` below.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// A plain chat completion — used for fallback reasoning strings and
    /// anywhere a schema isn't needed.
    async fn complete(&self, system: &str, user: &str) -> CurationResult<String>;

    /// A strict-JSON-schema completion. Returns the raw JSON text plus
    /// token usage; callers deserialize via [`complete_structured`].
    async fn complete_json_schema(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> CurationResult<(String, TokenUsage)>;
}

/// Generic convenience wrapper: generates `T`'s schema, calls the provider,
/// and deserializes the result. Free function rather than a trait method
/// so `LlmProvider` itself stays object-safe.
pub async fn complete_structured<T: StructuredOutput>(
    provider: &dyn LlmProvider,
    system: &str,
    user: &str,
) -> CurationResult<(T, TokenUsage)> {
    let schema = T::openai_schema();
    let (raw, usage) = provider
        .complete_json_schema(system, user, &T::type_name(), schema)
        .await?;
    let parsed = parse_structured(&raw)?;
    Ok((parsed, usage))
}

/// OpenAI-wire-compatible implementation. `base_url` can point at any
/// provider that speaks the same `/chat/completions` protocol.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAiClient::new(&api_key.into(), None),
            model: model.into(),
        }
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            client: OpenAiClient::new(&api_key.into(), Some(&base_url)),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, system: &str, user: &str) -> CurationResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: Some(0.0),
        };
        let response = self.client.chat(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| crate::error::invalid_response("LLM returned no message content"))
    }

    async fn complete_json_schema(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> CurationResult<(String, TokenUsage)> {
        let request = StructuredRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: Some(0.0),
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema_name.to_string(),
                    strict: true,
                    schema,
                },
            },
        };

        let (content, usage) = self.client.structured(&request).await?;
        Ok((
            content,
            TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
        ))
    }
}

/// Deserialize helper for callers that already have a schema-shaped string
/// (e.g. from a cache) and just need the parse step without a network call.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> CurationResult<T> {
    let cleaned = crate::util::strip_code_blocks(raw);
    serde_json::from_str(cleaned)
        .map_err(|e| crate::error::parsing_error(format!("failed to parse cached JSON: {e}")))
}
