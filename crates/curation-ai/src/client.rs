use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use curation_core::CurationResult;

use crate::error;
use crate::types::*;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Thin wrapper over the OpenAI-compatible chat completions endpoint.
/// `base_url` is swappable so the same client speaks to any
/// OpenAI-wire-compatible provider (OpenRouter, a local proxy, ...).
pub(crate) struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: base_url.unwrap_or(DEFAULT_API_URL).to_string(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("Bearer invalid")),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    pub async fn chat(&self, request: &ChatRequest) -> CurationResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, "LLM chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(request)
            .send()
            .await
            .map_err(|e| error::from_transport(&e))?;

        self.decode(response).await
    }

    pub async fn structured(&self, request: &StructuredRequest) -> CurationResult<(String, Usage)> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, "LLM structured output request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(request)
            .send()
            .await
            .map_err(|e| error::from_transport(&e))?;

        let chat_response = self.decode(response).await?;
        let usage = chat_response.usage.clone();
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| error::invalid_response("LLM returned no message content"))?;

        Ok((content, usage))
    }

    async fn decode(&self, response: reqwest::Response) -> CurationResult<ChatResponse> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error::from_status(status, &body));
        }
        response
            .json()
            .await
            .map_err(|e| error::parsing_error(format!("failed to decode LLM response: {e}")))
    }
}
