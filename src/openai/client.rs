use reqwest::Client;
use tracing::{debug, warn};

use super::prompt;
use super::types::{ApiError, CompletionRequest, CompletionResponse, ErrorBody};

const API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
const MAX_TOKENS: u32 = 256;

/// Every variant means the completion endpoint could not produce a translation.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("OpenAI rate limit exceeded")]
    RateLimited,

    #[error("OpenAI rejected the API key: {0}")]
    Unauthorized(String),

    #[error("OpenAI API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("OpenAI returned no completion")]
    EmptyCompletion,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Turns a natural-language question into a query fragment for the search engine.
///
/// The fragment is the model's output as-is. Implementations do not check that it
/// parses; a bad fragment surfaces when the engine rejects the request.
pub trait QueryTranslator {
    async fn translate(&self, question: &str) -> Result<String, TranslateError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(http: Client, api_key: String, model: &str) -> Self {
        Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model: model.to_string(),
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<CompletionResponse, TranslateError> {
        let url = format!("{}/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
        };

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| {
                    let end = text.floor_char_boundary(200);
                    format!("HTTP {status}: {}", &text[..end])
                });
            let err = match status.as_u16() {
                429 => TranslateError::RateLimited,
                401 | 403 => TranslateError::Unauthorized(message),
                code => TranslateError::Api { code, message },
            };
            warn!(error = %err, "OpenAI completion failed");
            return Err(err);
        }

        let body: CompletionResponse = response.json().await?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "OpenAI error in 200 response");
            return Err(classified);
        }
        Ok(body)
    }
}

impl QueryTranslator for OpenAiClient {
    async fn translate(&self, question: &str) -> Result<String, TranslateError> {
        let response = self.complete(prompt::build(question)).await?;
        let choice = response
            .choices
            .and_then(|choices| choices.into_iter().next())
            .ok_or(TranslateError::EmptyCompletion)?;
        debug!(
            model = %self.model,
            finish_reason = choice.finish_reason.as_deref().unwrap_or("-"),
            fragment = %choice.text,
            "question translated"
        );
        Ok(choice.text)
    }
}

fn classify_api_error(err: &ApiError) -> TranslateError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());
    match err.kind.as_deref() {
        Some("rate_limit_exceeded") => TranslateError::RateLimited,
        Some("invalid_api_key") | Some("authentication_error") => {
            TranslateError::Unauthorized(message)
        }
        _ => TranslateError::Api { code: 200, message },
    }
}
