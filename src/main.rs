mod config;
mod handler;
mod openai;
mod opensearch;
mod secrets;

pub const USER_AGENT: &str = concat!("natural-search/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, LogFormat};
use handler::{Context, Invocation};
use secrets::SecretsManagerSecret;

/// TCP connection establishment timeout. Request deadlines belong to the host.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let filter = EnvFilter::from_default_env().add_directive("natural_search=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    match config.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().with_current_span(true).init(),
    }

    let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

    let secret = SecretsManagerSecret::from_env(http.clone(), &config.api_key_secret);
    let ctx = Context::init(
        &secret,
        http,
        &config.cluster_endpoint,
        &config.index,
        &config.openai_model,
    )
    .await
    .inspect_err(|e| tracing::error!("initialization failed: {e}"))?;

    let event: Value = match &config.event {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => Value::Object(Default::default()),
    };
    let invocation = Invocation {
        request_id: config.request_id.clone(),
    };

    handler::handle(&ctx, event, &invocation)
        .await
        .inspect_err(|e| tracing::error!(request_id = %invocation.request_id, "invocation failed: {e}"))?;

    info!("invocation complete");
    Ok(())
}
