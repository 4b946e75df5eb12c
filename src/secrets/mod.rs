pub mod types;

use std::env;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};

use types::GetSecretValueResponse;

const DEFAULT_EXTENSION_PORT: u16 = 2773;
const TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Access denied to secret {0}")]
    AccessDenied(String),

    #[error("Secret {0} has no string value")]
    NotAString(String),

    #[error("Secrets extension error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Source of a single credential string.
pub trait SecretProvider {
    async fn get_value(&self) -> Result<String, SecretError>;
}

#[derive(Clone)]
struct SessionToken(String);

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A secret read through the AWS Parameters and Secrets Lambda Extension.
///
/// The extension listens on `localhost:$PARAMETERS_SECRETS_EXTENSION_HTTP_PORT`
/// (default 2773) and authenticates callers with the function's session token.
/// Values are not cached here; every `get_value` call reaches the extension.
#[derive(Clone, Debug)]
pub struct SecretsManagerSecret {
    http: Client,
    secret_id: String,
    token: Option<SessionToken>,
    base_url: String,
}

impl SecretsManagerSecret {
    pub fn from_env(http: Client, secret_id: &str) -> Self {
        let port = env::var("PARAMETERS_SECRETS_EXTENSION_HTTP_PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_EXTENSION_PORT);
        let token = env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SessionToken);
        if token.is_none() {
            warn!("AWS_SESSION_TOKEN not set; the secrets extension will likely refuse the request");
        }
        Self {
            http,
            secret_id: secret_id.to_string(),
            token,
            base_url: format!("http://localhost:{port}"),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str, secret_id: &str) -> Self {
        Self {
            http,
            secret_id: secret_id.to_string(),
            token: Some(SessionToken("test-token".to_string())),
            base_url: base_url.to_string(),
        }
    }

    fn classify(&self, code: u16, body: &str) -> SecretError {
        if code == 404 || body.contains("ResourceNotFoundException") {
            SecretError::NotFound(self.secret_id.clone())
        } else if matches!(code, 401 | 403) || body.contains("AccessDeniedException") {
            SecretError::AccessDenied(self.secret_id.clone())
        } else {
            let snippet = if body.len() > 200 {
                &body[..body.floor_char_boundary(200)]
            } else {
                body
            };
            SecretError::Api {
                code,
                message: snippet.to_string(),
            }
        }
    }
}

impl SecretProvider for SecretsManagerSecret {
    async fn get_value(&self) -> Result<String, SecretError> {
        let id = utf8_percent_encode(&self.secret_id, NON_ALPHANUMERIC);
        let url = format!("{}/secretsmanager/get?secretId={id}", self.base_url);

        let mut req = self.http.get(&url).header("User-Agent", crate::USER_AGENT);
        if let Some(ref token) = self.token {
            req = req.header(TOKEN_HEADER, &token.0);
        }
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = self.classify(status.as_u16(), &body);
            warn!(secret_id = %self.secret_id, error = %err, "secret retrieval failed");
            return Err(err);
        }

        let body: GetSecretValueResponse = response.json().await?;
        debug!(
            secret_id = %self.secret_id,
            version = body.version_id.as_deref().unwrap_or("-"),
            "secret retrieved"
        );
        body.secret_string
            .ok_or_else(|| SecretError::NotAString(self.secret_id.clone()))
    }
}
