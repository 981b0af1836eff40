//! Cluster capabilities a rule needs, independent of the client library.

use crate::address::HttpHost;
use crate::config::ClientSettings;
use crate::dataset::IndexRequest;
use crate::error::{ElasticsearchError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Client handle used by [`ElasticsearchOperation`](crate::ElasticsearchOperation).
///
/// Adapters exist for a raw REST client ([`crate::http::HttpClient`]) and
/// for the high-level client ([`crate::high_level::HighLevelClient`]). After
/// [`close`](Self::close), every call fails with [`ElasticsearchError::Closed`].
#[async_trait]
pub trait ElasticsearchClient: Send + Sync + Sized {
    /// Build a client for the given nodes. No request is sent.
    fn connect(servers: &[HttpHost], settings: &ClientSettings) -> Result<Self>;

    /// Check that the cluster answers.
    async fn ping(&self) -> Result<()>;

    /// Whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create an index with a settings document.
    async fn create_index(&self, index: &str, settings: &Value) -> Result<()>;

    /// Names of every index, hidden ones included.
    async fn list_indices(&self) -> Result<Vec<String>>;

    /// Delete an index. Missing indices are ignored.
    async fn delete_index(&self, index: &str) -> Result<()>;

    /// Delete every user index on the cluster. System indices (leading `.`)
    /// cannot be removed and are skipped.
    async fn delete_all_indices(&self) -> Result<()> {
        let indices = self.list_indices().await?;
        for index in indices.iter().filter(|name| !name.starts_with('.')) {
            info!("Deleting index {}", index);
            self.delete_index(index).await?;
        }
        Ok(())
    }

    /// Whether a legacy index template exists.
    async fn template_exists(&self, name: &str) -> Result<bool>;

    /// Install a legacy index template.
    async fn put_template(&self, name: &str, template: &Value) -> Result<()>;

    /// Index documents in one bulk request.
    async fn bulk(&self, requests: &[IndexRequest]) -> Result<()>;

    /// Make recent writes visible to searches.
    async fn refresh(&self) -> Result<()>;

    /// Delete every document of every index, keeping the indices.
    async fn delete_all_documents(&self) -> Result<()>;

    /// Count documents in the given indices; all indices when empty.
    /// Missing indices count as empty.
    async fn count(&self, indices: &[&str]) -> Result<u64>;

    /// Source of a document, if it exists.
    async fn get_source(&self, index: &str, id: &str) -> Result<Option<Value>>;

    /// Release the connection.
    async fn close(&self) -> Result<()>;

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Turn a `_bulk` reply into an error when any item failed.
pub(crate) fn check_bulk_response(result: &Value, total: usize) -> Result<()> {
    if !result["errors"].as_bool().unwrap_or(false) {
        return Ok(());
    }

    let errors: Vec<String> = result["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["index"]["error"].as_object())
                .map(|error| {
                    error
                        .get("reason")
                        .and_then(|r| r.as_str())
                        .unwrap_or("Unknown error")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    let failed = errors.len();
    Err(ElasticsearchError::Bulk {
        succeeded: total.saturating_sub(failed),
        failed,
        errors,
    })
}

/// Document count from a `_count` reply.
pub(crate) fn count_of(reply: &Value) -> Result<u64> {
    reply["count"].as_u64().ok_or_else(|| {
        ElasticsearchError::UnexpectedResponse(format!("no document count in {}", reply))
    })
}

/// Index names from a `_cat/indices?format=json` reply.
pub(crate) fn index_names(cat: &Value) -> Vec<String> {
    cat.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row["index"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
