//! Natural-language to OpenSearch query translation via the OpenAI completions API.

pub mod client;
pub mod prompt;
pub mod types;

pub use client::{DEFAULT_MODEL, OpenAiClient, QueryTranslator, TranslateError};
