//! Error types for Elasticsearch rules.

use nosqlunit_core::NoSqlUnitError;
use thiserror::Error;

/// Elasticsearch error type.
#[derive(Error, Debug)]
pub enum ElasticsearchError {
    /// The probe could not reach the server.
    #[error("Couldn't connect to Elasticsearch at [{address}]")]
    ConnectionRefused {
        /// Scheme-qualified `host:port`.
        address: String,
    },

    /// A server address could not be parsed or used.
    #[error("Invalid Elasticsearch address: {0}")]
    InvalidAddress(String),

    /// The dataset file is malformed.
    #[error("Invalid dataset: {0}")]
    DataSet(String),

    /// The cluster content differs from the expected dataset.
    #[error("{0}")]
    ExpectationFailed(String),

    /// The cluster rejected a request.
    #[error("Elasticsearch returned {status}: {reason}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the cluster.
        reason: String,
    },

    /// A success reply lacked a field the request always returns.
    #[error("Unexpected Elasticsearch response: {0}")]
    UnexpectedResponse(String),

    /// Bulk indexing partially failed.
    #[error("Bulk operation failed: {succeeded} succeeded, {failed} failed")]
    Bulk {
        /// Number of successful operations.
        succeeded: usize,
        /// Number of failed operations.
        failed: usize,
        /// Error details.
        errors: Vec<String>,
    },

    /// The client has already been closed.
    #[error("Elasticsearch client is closed")]
    Closed,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport error from the REST client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport error from the high-level client.
    #[error("Client error: {0}")]
    Client(#[from] opensearch::Error),
}

impl ElasticsearchError {
    /// Build a server error from a status code and an error body.
    pub(crate) fn server(status: u16, body: &serde_json::Value) -> Self {
        let reason = body["error"]["reason"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .unwrap_or("Unknown error")
            .to_string();

        ElasticsearchError::Server { status, reason }
    }
}

impl From<ElasticsearchError> for NoSqlUnitError {
    fn from(err: ElasticsearchError) -> Self {
        NoSqlUnitError::operation(err)
    }
}

/// Result type alias for Elasticsearch operations.
pub type Result<T> = std::result::Result<T, ElasticsearchError>;
