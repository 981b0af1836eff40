//! Raw REST adapter over reqwest.
//!
//! Requests go to the configured nodes in order; when a node cannot be
//! reached the next one is tried. Timed out requests move on to the next
//! node only for idempotent methods.

use crate::address::HttpHost;
use crate::client::{ElasticsearchClient, check_bulk_response, count_of, index_names};
use crate::config::ClientSettings;
use crate::dataset::IndexRequest;
use crate::error::{ElasticsearchError, Result};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode, header};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use url::Url;

/// Rule bound to the REST adapter.
pub type ElasticsearchRule = crate::rule::ElasticsearchRule<HttpClient>;

/// Configuration bound to the REST adapter.
pub type ElasticsearchConfiguration = crate::config::ElasticsearchConfiguration<HttpClient>;

enum Body {
    Json(Value),
    NdJson(String),
}

/// REST client talking to Elasticsearch over plain HTTP requests.
pub struct HttpClient {
    http: reqwest::Client,
    servers: Vec<Url>,
    credentials: Option<(String, String)>,
    closed: AtomicBool,
}

impl HttpClient {
    /// Node base URLs.
    pub fn servers(&self) -> &[Url] {
        &self.servers
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ElasticsearchError::Closed);
        }
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<Response> {
        self.ensure_open()?;

        let mut last_error = None;

        for base in &self.servers {
            let mut url = base.clone();
            if !segments.is_empty() {
                url.path_segments_mut()
                    .map_err(|_| ElasticsearchError::InvalidAddress(base.to_string()))?
                    .pop_if_empty()
                    .extend(segments);
            }

            debug!("{} {}", method, url);

            let mut request = self.http.request(method.clone(), url).query(query);
            if let Some((user, pass)) = &self.credentials {
                request = request.basic_auth(user, Some(pass));
            }
            request = match &body {
                Some(Body::Json(value)) => request.json(value),
                Some(Body::NdJson(lines)) => request
                    .header(header::CONTENT_TYPE, "application/x-ndjson")
                    .body(lines.clone()),
                None => request,
            };

            match request.send().await {
                Ok(response) => return Ok(response),
                // A timed out POST may have been applied; only retry it elsewhere
                // when the node never saw it.
                Err(e) if e.is_connect() || (e.is_timeout() && method.is_idempotent()) => {
                    warn!("Node {} unavailable: {}", base, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(match last_error {
            Some(e) => e.into(),
            None => ElasticsearchError::InvalidAddress("no Elasticsearch server configured".to_string()),
        })
    }

    async fn json(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<Value> {
        let response = self.send(method, segments, query, body).await?;
        success_json(response).await
    }

    async fn exists(&self, segments: &[&str]) -> Result<bool> {
        let response = self.send(Method::HEAD, segments, &[], None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(ElasticsearchError::server(status.as_u16(), &Value::Null)),
        }
    }
}

async fn success_json(response: Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        return Err(ElasticsearchError::server(status.as_u16(), &body));
    }

    Ok(response.json::<Value>().await?)
}

#[async_trait]
impl ElasticsearchClient for HttpClient {
    fn connect(servers: &[HttpHost], settings: &ClientSettings) -> Result<Self> {
        debug!("Building REST client for {:?}", servers);

        let servers = servers
            .iter()
            .map(HttpHost::url)
            .collect::<Result<Vec<_>>>()?;

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http,
            servers,
            credentials: settings
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
            closed: AtomicBool::new(false),
        })
    }

    async fn ping(&self) -> Result<()> {
        self.json(Method::GET, &[], &[], None).await.map(|_| ())
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.exists(&[index]).await
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<()> {
        let response = self
            .send(Method::PUT, &[index], &[], Some(Body::Json(settings.clone())))
            .await?;

        let status = response.status();
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
        let cat = self
            .json(
                Method::GET,
                &["_cat", "indices"],
                &[("format", "json"), ("expand_wildcards", "all")],
                None,
            )
            .await?;
        Ok(index_names(&cat))
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self.send(Method::DELETE, &[index], &[], None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        success_json(response).await.map(|_| ())
    }

    async fn template_exists(&self, name: &str) -> Result<bool> {
        self.exists(&["_template", name]).await
    }

    async fn put_template(&self, name: &str, template: &Value) -> Result<()> {
        self.json(
            Method::PUT,
            &["_template", name],
            &[],
            Some(Body::Json(template.clone())),
        )
        .await
        .map(|_| ())
    }

    async fn bulk(&self, requests: &[IndexRequest]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let mut lines = String::new();
        for request in requests {
            lines.push_str(&serde_json::to_string(&request.action())?);
            lines.push('\n');
            lines.push_str(&serde_json::to_string(&request.source)?);
            lines.push('\n');
        }

        let result = self
            .json(Method::POST, &["_bulk"], &[], Some(Body::NdJson(lines)))
            .await?;
        check_bulk_response(&result, requests.len())
    }

    async fn refresh(&self) -> Result<()> {
        self.json(Method::POST, &["_refresh"], &[], None)
            .await
            .map(|_| ())
    }

    async fn delete_all_documents(&self) -> Result<()> {
        self.json(
            Method::POST,
            &["*", "_delete_by_query"],
            &[("conflicts", "proceed"), ("refresh", "true")],
            Some(Body::Json(json!({ "query": { "match_all": {} } }))),
        )
        .await
        .map(|_| ())
    }

    async fn count(&self, indices: &[&str]) -> Result<u64> {
        let target = if indices.is_empty() {
            "*".to_string()
        } else {
            indices.join(",")
        };

        let body = self
            .json(
                Method::GET,
                &[target.as_str(), "_count"],
                &[("ignore_unavailable", "true"), ("allow_no_indices", "true")],
                None,
            )
            .await?;
        count_of(&body)
    }

    async fn get_source(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let response = self.send(Method::GET, &[index, "_doc", id], &[], None).await?;
        if response.status() == StatusCode::NOT_FOUND {
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
        debug!("REST client closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("servers", &self.servers)
            .field("closed", &self.is_closed())
            .finish()
    }
}
