//! In-memory cluster used by unit tests.

use crate::address::HttpHost;
use crate::client::ElasticsearchClient;
use crate::config::ClientSettings;
use crate::dataset::IndexRequest;
use crate::error::{ElasticsearchError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Index {
    settings: Value,
    documents: BTreeMap<String, Value>,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, Index>,
    templates: BTreeMap<String, Value>,
    calls: Vec<String>,
    rejections: HashMap<String, (u16, String)>,
    next_id: u64,
}

/// Shared state behind a [`MemoryClient`]; tests keep it to inspect and seed.
#[derive(Default)]
pub(crate) struct MemoryCluster {
    state: Mutex<State>,
    closed: AtomicBool,
    fail_close: AtomicBool,
}

impl MemoryCluster {
    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().unwrap().indices.keys().cloned().collect()
    }

    pub fn template_names(&self) -> Vec<String> {
        self.state.lock().unwrap().templates.keys().cloned().collect()
    }

    pub fn index_settings(&self, index: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map(|i| i.settings.clone())
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map_or(0, |i| i.documents.len())
    }

    pub fn add_index(&self, index: &str) {
        self.state
            .lock()
            .unwrap()
            .indices
            .entry(index.to_string())
            .or_default();
    }

    pub fn add_document(&self, index: &str, id: &str, source: Value) {
        self.state
            .lock()
            .unwrap()
            .indices
            .entry(index.to_string())
            .or_default()
            .documents
            .insert(id.to_string(), source);
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    /// Fail the next call to `operation` with a server error.
    pub fn reject_next(&self, operation: &str, status: u16, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(operation.to_string(), (status, reason.to_string()));
    }

    /// Make `close` fail.
    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn enter(&self, operation: &str) -> Result<std::sync::MutexGuard<'_, State>> {
        if self.is_closed() {
            return Err(ElasticsearchError::Closed);
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        if let Some((status, reason)) = state.rejections.remove(operation) {
            return Err(ElasticsearchError::Server { status, reason });
        }
        Ok(state)
    }
}

/// Client whose cluster lives in memory.
#[derive(Clone, Default)]
pub(crate) struct MemoryClient {
    cluster: Arc<MemoryCluster>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster(&self) -> Arc<MemoryCluster> {
        Arc::clone(&self.cluster)
    }
}

#[async_trait]
impl ElasticsearchClient for MemoryClient {
    fn connect(_servers: &[HttpHost], _settings: &ClientSettings) -> Result<Self> {
        Ok(Self::new())
    }

    async fn ping(&self) -> Result<()> {
        self.cluster.enter("ping").map(|_| ())
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let state = self.cluster.enter("index_exists")?;
        Ok(state.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<()> {
        let mut state = self.cluster.enter("create_index")?;
        state.indices.entry(index.to_string()).or_insert_with(|| Index {
            settings: settings.clone(),
            documents: BTreeMap::new(),
        });
        Ok(())
    }

    async fn list_indices(&self) -> Result<Vec<String>> {
        let state = self.cluster.enter("list_indices")?;
        Ok(state.indices.keys().cloned().collect())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let mut state = self.cluster.enter("delete_index")?;
        state.indices.remove(index);
        Ok(())
    }

    async fn template_exists(&self, name: &str) -> Result<bool> {
        let state = self.cluster.enter("template_exists")?;
        Ok(state.templates.contains_key(name))
    }

    async fn put_template(&self, name: &str, template: &Value) -> Result<()> {
        let mut state = self.cluster.enter("put_template")?;
        state.templates.insert(name.to_string(), template.clone());
        Ok(())
    }

    async fn bulk(&self, requests: &[IndexRequest]) -> Result<()> {
        let mut state = self.cluster.enter("bulk")?;
        for request in requests {
            let id = match &request.id {
                Some(id) => id.clone(),
                None => {
                    state.next_id += 1;
                    format!("generated-{}", state.next_id)
                }
            };
            state
                .indices
                .entry(request.index.clone())
                .or_default()
                .documents
                .insert(id, request.source.clone());
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.cluster.enter("refresh").map(|_| ())
    }

    async fn delete_all_documents(&self) -> Result<()> {
        let mut state = self.cluster.enter("delete_all_documents")?;
        for index in state.indices.values_mut() {
            index.documents.clear();
        }
        Ok(())
    }

    async fn count(&self, indices: &[&str]) -> Result<u64> {
        let state = self.cluster.enter("count")?;
        let total = state
            .indices
            .iter()
            .filter(|(name, _)| indices.is_empty() || indices.contains(&name.as_str()))
            .map(|(_, index)| index.documents.len() as u64)
            .sum();
        Ok(total)
    }

    async fn get_source(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let state = self.cluster.enter("get_source")?;
        Ok(state
            .indices
            .get(index)
            .and_then(|i| i.documents.get(id))
            .cloned())
    }

    async fn close(&self) -> Result<()> {
        if self.cluster.fail_close.load(Ordering::SeqCst) {
            return Err(ElasticsearchError::Server {
                status: 500,
                reason: "close failed".to_string(),
            });
        }
        if self.cluster.closed.swap(true, Ordering::SeqCst) {
            return Err(ElasticsearchError::Closed);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.cluster.is_closed()
    }
}
