use serde::Deserialize;

/// Body of `GET /secretsmanager/get`, mirroring `GetSecretValue`.
/// Binary secrets carry `SecretBinary` instead of `SecretString`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetSecretValueResponse {
    pub secret_string: Option<String>,
    pub version_id: Option<String>,
}
