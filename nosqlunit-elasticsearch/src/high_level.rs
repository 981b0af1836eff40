//! Adapter over the high-level `opensearch` client.
//!
//! The transport is bound to the first configured node.

use crate::address::HttpHost;
use crate::client::{ElasticsearchClient, check_bulk_response, count_of, index_names};
use crate::config::{ClientSettings, DEFAULT_CONNECT_TIMEOUT};
use crate::dataset::IndexRequest;
use crate::error::{ElasticsearchError, Result};
use async_trait::async_trait;
use opensearch::{
    BulkParts, CountParts, DeleteByQueryParts, GetParts, OpenSearch,
    cat::CatIndicesParts,
    http::{
        StatusCode,
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesExistsTemplateParts,
        IndicesPutTemplateParts, IndicesRefreshParts,
    },
    params::{Conflicts, ExpandWildcards},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Rule bound to the high-level client.
pub type ElasticsearchRule = crate::rule::ElasticsearchRule<HighLevelClient>;

/// Configuration bound to the high-level client.
pub type ElasticsearchConfiguration = crate::config::ElasticsearchConfiguration<HighLevelClient>;

/// Client backed by [`opensearch::OpenSearch`].
pub struct HighLevelClient {
    client: OpenSearch,
    node: HttpHost,
    closed: AtomicBool,
}

impl HighLevelClient {
    /// Get the underlying client.
    pub fn inner(&self) -> &OpenSearch {
        &self.client
    }

    /// Node the transport talks to.
    pub fn node(&self) -> &HttpHost {
        &self.node
    }

    fn ensure_open(&self) -> Result<&OpenSearch> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ElasticsearchError::Closed);
        }
        Ok(&self.client)
    }
}

async fn success_json(response: Response) -> Result<Value> {
    let status = response.status_code();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        return Err(ElasticsearchError::server(status.as_u16(), &body));
    }

    Ok(response.json::<Value>().await?)
}

fn exists_status(status: StatusCode) -> Result<bool> {
    match status {
        StatusCode::NOT_FOUND => Ok(false),
        status if status.is_success() => Ok(true),
        status => Err(ElasticsearchError::server(status.as_u16(), &Value::Null)),
    }
}

#[async_trait]
impl ElasticsearchClient for HighLevelClient {
    fn connect(servers: &[HttpHost], settings: &ClientSettings) -> Result<Self> {
        let node = servers
            .first()
            .cloned()
            .ok_or_else(|| ElasticsearchError::InvalidAddress("No URLs provided".to_string()))?;

        if servers.len() > 1 {
            warn!(
                "High-level client uses a single node; ignoring {} other server(s)",
                servers.len() - 1
            );
        }
        info!("Initializing high-level client for: {}", node);
        if settings.connect_timeout != DEFAULT_CONNECT_TIMEOUT {
            debug!(
                "High-level transport has no connect timeout; {:?} is not applied",
                settings.connect_timeout
            );
        }

        let url = opensearch::http::Url::parse(&node.to_string())
            .map_err(|e| ElasticsearchError::InvalidAddress(format!("{}: {}", node, e)))?;

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .timeout(settings.request_timeout)
            .disable_proxy();

        if let Some((user, pass)) = settings.credentials() {
            builder = builder.auth(opensearch::auth::Credentials::Basic(
                user.to_string(),
                pass.to_string(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| ElasticsearchError::InvalidAddress(e.to_string()))?;

        Ok(Self {
            client: OpenSearch::new(transport),
            node,
            closed: AtomicBool::new(false),
        })
    }

    async fn ping(&self) -> Result<()> {
        let response = self.ensure_open()?.ping().send().await?;
        success_json(response).await.map(|_| ())
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .ensure_open()?
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;
        exists_status(response.status_code())
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<()> {
        let response = self
            .ensure_open()?
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings.clone())
            .send()
            .await?;

        let status = response.status_code();
        if status == StatusCode::BAD_REQUEST {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            if body["error"]["type"] == "resource_already_exists_exception" {
                debug!("Index {} already exists", index);
                return Ok(());
            }
            return Err(ElasticsearchError::server(status.as_u16(), &body));
        }

        success_json(response).await.map(|_| ())
    }

    async fn list_indices(&self) -> Result<Vec<String>> {
        let response = self
            .ensure_open()?
            .cat()
            .indices(CatIndicesParts::None)
            .format("json")
            .expand_wildcards(&[ExpandWildcards::All])
            .send()
            .await?;
        Ok(index_names(&success_json(response).await?))
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self
            .ensure_open()?
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        success_json(response).await.map(|_| ())
    }

    async fn template_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .ensure_open()?
            .indices()
            .exists_template(IndicesExistsTemplateParts::Name(&[name]))
            .send()
            .await?;
        exists_status(response.status_code())
    }

    async fn put_template(&self, name: &str, template: &Value) -> Result<()> {
        let response = self
            .ensure_open()?
            .indices()
            .put_template(IndicesPutTemplateParts::Name(name))
            .body(template.clone())
            .send()
            .await?;
        success_json(response).await.map(|_| ())
    }

    async fn bulk(&self, requests: &[IndexRequest]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let client = self.ensure_open()?;
        debug!("Bulk indexing {} documents", requests.len());

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(requests.len() * 2);
        for request in requests {
            body.push(request.action().into());
            body.push(request.source.clone().into());
        }

        let response = client.bulk(BulkParts::None).body(body).send().await?;
        let result = success_json(response).await?;
        check_bulk_response(&result, requests.len())
    }

    async fn refresh(&self) -> Result<()> {
        let response = self
            .ensure_open()?
            .indices()
            .refresh(IndicesRefreshParts::None)
            .send()
            .await?;
        success_json(response).await.map(|_| ())
    }

    async fn delete_all_documents(&self) -> Result<()> {
        let response = self
            .ensure_open()?
            .delete_by_query(DeleteByQueryParts::Index(&["*"]))
            .conflicts(Conflicts::Proceed)
            .refresh(true)
            .body(json!({ "query": { "match_all": {} } }))
            .send()
            .await?;
        success_json(response).await.map(|_| ())
    }

    async fn count(&self, indices: &[&str]) -> Result<u64> {
        let targets: &[&str] = if indices.is_empty() { &["*"] } else { indices };

        let response = self
            .ensure_open()?
            .count(CountParts::Index(targets))
            .ignore_unavailable(true)
            .allow_no_indices(true)
            .send()
            .await?;
        let body = success_json(response).await?;
        count_of(&body)
    }

    async fn get_source(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let response = self
            .ensure_open()?
            .get(GetParts::IndexId(index, id))
            .send()
            .await?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = success_json(response).await?;
        if !body["found"].as_bool().unwrap_or(false) {
            return Ok(None);
        }
        Ok(body.get("_source").cloned())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ElasticsearchError::Closed);
        }
        debug!("High-level client closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for HighLevelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighLevelClient")
            .field("node", &self.node)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> HighLevelClient {
        let host: HttpHost = server.uri().parse().unwrap();
        HighLevelClient::connect(&[host], &ClientSettings::default()).unwrap()
    }

    #[test]
    fn test_connect_uses_first_node() {
        let client = HighLevelClient::connect(
            &[HttpHost::new("es1", 9200), HttpHost::new("es2", 9200)],
            &ClientSettings::default(),
        )
        .unwrap();
        assert_eq!(client.node().host(), "es1");
    }

    #[test]
    fn test_connect_requires_a_node() {
        let result = HighLevelClient::connect(&[], &ClientSettings::default());
        assert!(matches!(result, Err(ElasticsearchError::InvalidAddress(_))));
    }

    #[test]
    fn test_connect_with_custom_connect_timeout() {
        let settings = ClientSettings::default().with_connect_timeout(Duration::from_secs(1));
        let client = HighLevelClient::connect(&[HttpHost::new("es1", 9200)], &settings).unwrap();
        assert_eq!(client.node().host(), "es1");
    }

    #[tokio::test]
    async fn test_create_index_sends_settings() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/tweets"))
            .and(body_string_contains("number_of_shards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .create_index("tweets", &json!({ "settings": { "number_of_shards": 1 } }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_existing_index_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/tweets"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "type": "resource_already_exists_exception", "reason": "exists" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.create_index("tweets", &json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_put_template_rejection_carries_reason() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/_template/logs"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "type": "illegal_argument_exception", "reason": "bad template" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.put_template("logs", &json!({})).await {
            Err(ElasticsearchError::Server { status, reason }) => {
                assert_eq!(status, 400);
                assert_eq!(reason, "bad template");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_all_indices_skips_system_indices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cat/indices"))
            .and(query_param("format", "json"))
            .and(query_param("expand_wildcards", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "index": "tweets" },
                { "index": ".security" }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/.security"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.delete_all_indices().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_index_delete_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "type": "index_not_found_exception", "reason": "no such index" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.delete_index("gone").await.unwrap();
    }

    fn alice() -> Vec<IndexRequest> {
        vec![IndexRequest {
            index: "tweets".to_string(),
            id: Some("1".to_string()),
            source: json!({ "author": "alice" }),
        }]
    }

    #[tokio::test]
    async fn test_bulk_sends_action_and_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(body_string_contains(r#""_index":"tweets""#))
            .and(body_string_contains(r#""author":"alice""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 1, "errors": false, "items": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.bulk(&alice()).await.unwrap();
        client.bulk(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_item_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": true,
                "items": [ { "index": { "_index": "tweets", "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "bad field" } } } ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.bulk(&alice()).await {
            Err(ElasticsearchError::Bulk { failed, errors, .. }) => {
                assert_eq!(failed, 1);
                assert_eq!(errors, vec!["bad field"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_count_tolerates_missing_indices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tweets/_count"))
            .and(query_param("ignore_unavailable", "true"))
            .and(query_param("allow_no_indices", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 3 })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.count(&["tweets"]).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_count_rejects_non_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tweets/_count"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>proxy</html>"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.count(&["tweets"]).await,
            Err(ElasticsearchError::Client(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_all_documents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/_delete_by_query$"))
            .and(query_param("conflicts", "proceed"))
            .and(query_param("refresh", "true"))
            .and(body_string_contains("match_all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": 2, "failures": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.delete_all_documents().await.unwrap();
    }

    #[tokio::test]
    async fn test_template_exists() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/_template/logs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/_template/metrics"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.template_exists("logs").await.unwrap());
        assert!(!client.template_exists("metrics").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tweets/_doc/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "tweets", "_id": "1", "found": true, "_source": { "author": "alice" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.get_source("tweets", "1").await.unwrap(),
            Some(json!({ "author": "alice" }))
        );
    }

    #[tokio::test]
    async fn test_closed_client_refuses_requests() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        client.close().await.unwrap();

        assert!(client.is_closed());
        assert!(matches!(
            client.index_exists("tweets").await,
            Err(ElasticsearchError::Closed)
        ));
    }
}
