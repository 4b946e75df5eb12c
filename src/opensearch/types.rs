use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Free-form document: field name to string value. Serialized as a flat JSON object.
pub type Document = BTreeMap<String, String>;

/// Build a [`Document`] from `(field, value)` pairs.
pub fn document<const N: usize>(fields: [(&str, &str); N]) -> Document {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Wrap a query fragment into a complete request body: `{"size": <size>,<fragment>}`.
///
/// The fragment is spliced in as text, so whatever the caller hands over reaches
/// the engine unchanged.
pub fn envelope(size: u32, fragment: &str) -> String {
    format!("{{\"size\": {size},{fragment}}}")
}

/// The engine's `_search` response, passed through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SearchResponse(pub Value);

impl SearchResponse {
    /// `_source` of each hit, in the order the engine ranked them.
    pub fn hits(&self) -> impl Iterator<Item = &Value> {
        self.0["hits"]["hits"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|hit| hit.get("_source"))
    }

    /// Total match count. Accepts both `{"value": n}` and the legacy bare integer.
    pub fn total(&self) -> Option<u64> {
        let total = &self.0["hits"]["total"];
        total.as_u64().or_else(|| total["value"].as_u64())
    }
}

impl fmt::Display for SearchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error object returned by the engine for non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: EngineError,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EngineError {
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        reason: Option<String>,
    },
    Message(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Detailed {
                kind,
                reason: Some(reason),
            } => write!(f, "{kind}: {reason}"),
            EngineError::Detailed { kind, reason: None } => f.write_str(kind),
            EngineError::Message(message) => f.write_str(message),
        }
    }
}
