use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::openai::DEFAULT_MODEL;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Populate an OpenSearch index with sample movies and query it in plain English.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// OpenSearch cluster endpoint (URL or bare domain)
    #[arg(long, env = "OS_CLUSTER_ENDPOINT")]
    pub cluster_endpoint: String,

    /// Secrets Manager id or ARN holding the OpenAI API key
    #[arg(long, env = "OPEN_AI_API_KEY_SECRET")]
    pub api_key_secret: String,

    /// Index the sample documents are written to and queried from
    #[arg(long, env = "OS_INDEX", default_value = "docs")]
    pub index: String,

    /// OpenAI completions model used for query translation
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    /// JSON file holding the invocation event (ignored by the handler)
    #[arg(long)]
    pub event: Option<PathBuf>,

    /// Request id attached to every log record of this invocation
    #[arg(long, default_value = "local")]
    pub request_id: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}
