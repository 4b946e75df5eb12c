//! Thin OpenSearch REST client: document indexing and raw `_search` queries.

pub mod client;
pub mod types;

pub use client::{OpenSearchClient, SearchBackend, SearchError};
pub use types::{Document, SearchResponse, document, envelope};
