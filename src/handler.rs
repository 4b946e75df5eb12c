//! One invocation: seed the index, run the static query, then two translated ones.

use reqwest::Client;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

use crate::openai::{OpenAiClient, QueryTranslator, TranslateError};
use crate::opensearch::{
    Document, OpenSearchClient, SearchBackend, SearchError, SearchResponse, document, envelope,
};
use crate::secrets::{SecretError, SecretProvider};

pub const SERVICE: &str = "natural_search";
pub const RESULT_SIZE: u32 = 5;

pub const STATIC_QUERY: &str = r#"{"size": 5,"query": {"multi_match": {"query": "miller", "fields": ["title^2", "director"]}}}"#;

pub const QUESTIONS: [&str; 2] = [
    "Find all movies that were made after 2010",
    "Find all movies that were directed by George Lucas with Star Wars in the title",
];

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("secret retrieval failed: {0}")]
    Secret(#[from] SecretError),

    #[error("translation unavailable: {0}")]
    TranslationUnavailable(#[from] TranslateError),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),
}

/// Per-invocation metadata supplied by the host.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
}

pub fn seed_documents() -> Vec<Document> {
    vec![
        document([
            ("title", "Moneyball"),
            ("director", "Bennett Miller"),
            ("year", "2011"),
        ]),
        document([
            ("title", "Star Wars: Episode I - The Phantom Menace"),
            ("director", "George Lucas"),
            ("year", "1999"),
        ]),
        document([
            ("title", "28 Days Later"),
            ("director", "Danny Boyle"),
            ("year", "2002"),
        ]),
        document([
            ("title", "Shaun of the Dead"),
            ("director", "Edgar Wright"),
            ("year", "2004"),
        ]),
        document([
            ("title", "The Grand Budapest Hotel"),
            ("director", "Wes Anderson"),
            ("year", "2014"),
        ]),
    ]
}

/// Collaborators shared by every invocation in the process.
#[derive(Debug)]
pub struct Context<S, T> {
    pub search: S,
    pub translator: T,
}

impl<S, T> Context<S, T> {
    pub fn new(search: S, translator: T) -> Self {
        Self { search, translator }
    }
}

impl Context<OpenSearchClient, OpenAiClient> {
    /// Resolve the OpenAI key first, so a secret failure aborts before the
    /// search client exists or any request reaches the cluster.
    pub async fn init(
        secret: &impl SecretProvider,
        http: Client,
        cluster_endpoint: &str,
        index: &str,
        model: &str,
    ) -> Result<Self, HandlerError> {
        let api_key = secret.get_value().await?;
        let translator = OpenAiClient::new(http.clone(), api_key, model);
        let search = OpenSearchClient::new(http, cluster_endpoint, index)?;
        info!(index, model, "context initialized");
        Ok(Self::new(search, translator))
    }
}

/// Run the four steps in order. The event is accepted for the host's calling
/// convention and not inspected. Any error ends the invocation.
pub async fn handle<S, T>(
    ctx: &Context<S, T>,
    _event: Value,
    invocation: &Invocation,
) -> Result<(), HandlerError>
where
    S: SearchBackend,
    T: QueryTranslator,
{
    let span = info_span!("invocation", service = SERVICE, request_id = %invocation.request_id);
    run(ctx).instrument(span).await
}

async fn run<S, T>(ctx: &Context<S, T>) -> Result<(), HandlerError>
where
    S: SearchBackend,
    T: QueryTranslator,
{
    let docs = seed_documents();
    ctx.search.index_docs(&docs).await?;
    info!(count = docs.len(), "sample documents indexed");

    let response = ctx.search.query(STATIC_QUERY).await?;
    log_response("Static search results", &response);

    for (i, question) in QUESTIONS.iter().enumerate() {
        let fragment = ctx.translator.translate(question).await?;
        let body = envelope(RESULT_SIZE, &fragment);
        if serde_json::from_str::<Value>(&body).is_err() {
            warn!(question, %body, "translated query is not valid JSON; sending unchanged");
        }
        let response = ctx.search.query(&body).await?;
        log_response(&format!("Natural #{} search results", i + 1), &response);
    }

    Ok(())
}

fn log_response(label: &str, response: &SearchResponse) {
    info!(
        hits = response.hits().count(),
        total = response.total(),
        %response,
        "{label}"
    );
}
