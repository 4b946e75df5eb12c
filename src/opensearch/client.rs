use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::types::{Document, ErrorResponse, SearchResponse};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid cluster endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Index unavailable ({code}): {message}")]
    IndexUnavailable { code: u16, message: String },

    #[error("Query rejected ({code}): {message}")]
    QueryRejected { code: u16, message: String },

    #[error("Unreadable search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Indexing and retrieval against one search index.
pub trait SearchBackend {
    /// Submit each document once, in order, without ids. Stops at the first
    /// failure; documents sent before it stay indexed.
    async fn index_docs(&self, docs: &[Document]) -> Result<(), SearchError>;

    /// Run a raw `_search` body and return the engine's answer as-is.
    async fn query(&self, body: &str) -> Result<SearchResponse, SearchError>;
}

/// OpenSearch REST client bound to a single index.
#[derive(Clone, Debug)]
pub struct OpenSearchClient {
    http: Client,
    base_url: String,
    index: String,
}

impl OpenSearchClient {
    /// `endpoint` may be a full URL or a bare domain (`search-x.es.amazonaws.com`),
    /// which is treated as HTTPS.
    pub fn new(http: Client, endpoint: &str, index: &str) -> Result<Self, SearchError> {
        let endpoint = endpoint.trim();
        let with_scheme = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };
        let parsed = Url::parse(&with_scheme)
            .map_err(|e| SearchError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
            return Err(SearchError::InvalidEndpoint(endpoint.to_string()));
        }
        if index.is_empty() {
            return Err(SearchError::InvalidEndpoint("index name is empty".into()));
        }
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            index: utf8_percent_encode(index, NON_ALPHANUMERIC).to_string(),
        })
    }

    fn post(&self, action: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{action}", self.base_url, self.index);
        self.http
            .post(url)
            .header("User-Agent", crate::USER_AGENT)
            .header("Content-Type", "application/json")
    }

    async fn refresh(&self) -> Result<(), SearchError> {
        let response = self.post("_refresh").send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(SearchError::IndexUnavailable {
                code: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

impl SearchBackend for OpenSearchClient {
    async fn index_docs(&self, docs: &[Document]) -> Result<(), SearchError> {
        for (i, doc) in docs.iter().enumerate() {
            let response = self.post("_doc").json(doc).send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = error_message(response).await;
                warn!(
                    index = %self.index,
                    submitted = i,
                    total = docs.len(),
                    status = %status,
                    "document indexing failed"
                );
                return Err(SearchError::IndexUnavailable {
                    code: status.as_u16(),
                    message,
                });
            }
        }
        self.refresh().await?;
        debug!(index = %self.index, count = docs.len(), "documents indexed");
        Ok(())
    }

    async fn query(&self, body: &str) -> Result<SearchResponse, SearchError> {
        let response = self.post("_search").body(body.to_string()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let message = error_message(response).await;
            warn!(index = %self.index, status = %status, %message, "search failed");
            return Err(match code {
                404 | 500..=599 => SearchError::IndexUnavailable { code, message },
                _ => SearchError::QueryRejected { code, message },
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => body.error.to_string(),
        Err(_) => {
            let end = text.floor_char_boundary(200);
            format!("HTTP {status}: {}", &text[..end])
        }
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::opensearch::types::document;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenSearchClient {
        OpenSearchClient::new(Client::new(), &server.uri(), "docs").unwrap()
    }

    async fn mount_indexing(server: &MockServer, expected_docs: u64) {
        Mock::given(method("POST"))
            .and(path("/docs/_doc"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "_index": "docs", "_id": "generated", "result": "created"
            })))
            .expect(expected_docs)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/docs/_refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_shards": {"total": 2, "successful": 1, "failed": 0}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn index_docs_posts_each_document_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/docs/_doc"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({
                "title": "Moneyball", "director": "Bennett Miller", "year": "2011"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/docs/_refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let docs = [document([
            ("title", "Moneyball"),
            ("director", "Bennett Miller"),
            ("year", "2011"),
        ])];
        client(&server).index_docs(&docs).await.unwrap();
    }

    #[tokio::test]
    async fn index_docs_twice_does_not_error() {
        let server = MockServer::start().await;
        mount_indexing(&server, 4).await;

        let docs = [
            document([("title", "A")]),
            document([("title", "B")]),
        ];
        let client = client(&server);
        client.index_docs(&docs).await.unwrap();
        client.index_docs(&docs).await.unwrap();
    }

    #[tokio::test]
    async fn index_docs_stops_at_first_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/docs/_doc"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"type": "cluster_block_exception", "reason": "index read-only"},
                "status": 503
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/docs/_refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let docs = [document([("title", "A")]), document([("title", "B")])];
        match client(&server).index_docs(&docs).await {
            Err(SearchError::IndexUnavailable { code: 503, message }) => {
                assert_eq!(message, "cluster_block_exception: index read-only");
            }
            other => panic!("expected IndexUnavailable, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_sends_raw_body_and_returns_response_unmodified() {
        let server = MockServer::start().await;
        let response = serde_json::json!({
            "took": 2,
            "timed_out": false,
            "hits": {
                "total": {"value": 1, "relation": "eq"},
                "max_score": 1.3,
                "hits": [{
                    "_index": "docs", "_id": "x", "_score": 1.3,
                    "_source": {"title": "Moneyball", "director": "Bennett Miller", "year": "2011"}
                }]
            }
        });
        let body = r#"{"size": 5,"query": {"match_all": {}}}"#;
        Mock::given(method("POST"))
            .and(path("/docs/_search"))
            .and(body_json(serde_json::json!({"size": 5, "query": {"match_all": {}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(response.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).query(body).await.unwrap();
        assert_eq!(result.0, response);
    }

    #[tokio::test]
    async fn query_400_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/docs/_search"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "parsing_exception", "reason": "Unknown key for a START_OBJECT"},
                "status": 400
            })))
            .mount(&server)
            .await;

        match client(&server).query("{\"size\": 5,oops}").await {
            Err(SearchError::QueryRejected { code: 400, message }) => {
                assert!(message.starts_with("parsing_exception"), "got: {message}");
            }
            other => panic!("expected QueryRejected, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_missing_index_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/docs/_search"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such index"))
            .mount(&server)
            .await;

        match client(&server).query("{}").await {
            Err(SearchError::IndexUnavailable { code: 404, message }) => {
                assert!(message.contains("no such index"));
            }
            other => panic!("expected IndexUnavailable, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_non_json_success_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/docs/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).query("{}").await,
            Err(SearchError::Decode(_))
        ));
    }
}
