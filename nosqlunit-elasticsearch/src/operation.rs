//! Index lifecycle operation.

use crate::client::ElasticsearchClient;
use crate::config::ElasticsearchConfiguration;
use crate::dataset::DataSet;
use crate::error::{ElasticsearchError, Result};
use async_trait::async_trait;
use nosqlunit_core::DatabaseOperation;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Keeps the cluster's indices in the configured state and loads datasets.
///
/// Owns the client handle; it is released by [`close`](DatabaseOperation::close).
pub struct ElasticsearchOperation<C> {
    client: C,
    create_indices: bool,
    delete_all_indices: bool,
    index_settings: BTreeMap<String, Value>,
    index_templates: BTreeMap<String, Value>,
}

impl<C: ElasticsearchClient> ElasticsearchOperation<C> {
    /// Build the operation from a configuration, taking its client.
    pub fn new(configuration: ElasticsearchConfiguration<C>) -> Self {
        let parts = configuration.into_parts();
        Self {
            client: parts.client,
            create_indices: parts.create_indices,
            delete_all_indices: parts.delete_all_indices,
            index_settings: parts.index_settings,
            index_templates: parts.index_templates,
        }
    }

    /// Bring the cluster to the configured index state.
    ///
    /// Deletes every index when configured to, then creates the configured
    /// indices and templates that are missing. Running it twice leaves the
    /// same indices and templates.
    pub async fn setup(&self) -> Result<()> {
        if self.delete_all_indices {
            info!("Deleting all indices");
            self.client.delete_all_indices().await?;
        }

        if !self.create_indices {
            return Ok(());
        }

        for (index, settings) in &self.index_settings {
            if self.client.index_exists(index).await? {
                debug!("Index {} already exists", index);
            } else {
                info!("Creating index {}", index);
                self.client.create_index(index, settings).await?;
            }
        }

        for (name, template) in &self.index_templates {
            if self.client.template_exists(name).await? {
                debug!("Template {} already exists", name);
            } else {
                info!("Installing template {}", name);
                self.client.put_template(name, template).await?;
            }
        }

        Ok(())
    }

    /// Write the documents of a dataset and make them searchable.
    pub async fn insert(&self, dataset: &str) -> Result<()> {
        let dataset = DataSet::parse(dataset)?;
        let requests = dataset.index_requests();
        debug!("Inserting {} documents", requests.len());

        self.client.bulk(&requests).await?;
        self.client.refresh().await
    }

    /// Delete every document of every index.
    pub async fn delete_all(&self) -> Result<()> {
        info!("Deleting all documents");
        self.client.delete_all_documents().await
    }

    /// Check that the cluster holds exactly the documents of `expected`.
    ///
    /// The indices named by the dataset must hold as many documents as the
    /// dataset writes, and each expected document must be found by id with
    /// an equal source. Expected documents therefore need an `indexId`.
    pub async fn database_is(&self, expected: &str) -> Result<()> {
        let expected = DataSet::parse(expected)?;
        let requests = expected.index_requests();
        let indices: Vec<&str> = expected.index_names().into_iter().collect();

        self.client.refresh().await?;

        let actual = self.client.count(&indices).await?;
        if actual != requests.len() as u64 {
            return Err(ElasticsearchError::ExpectationFailed(format!(
                "Expected number of documents is {} but {} were found",
                requests.len(),
                actual
            )));
        }

        for request in &requests {
            let id = request.id.as_deref().ok_or_else(|| {
                ElasticsearchError::DataSet(format!(
                    "expected documents of index {} need an indexId",
                    request.index
                ))
            })?;

            match self.client.get_source(&request.index, id).await? {
                None => {
                    return Err(ElasticsearchError::ExpectationFailed(format!(
                        "Document with index: {} - id: {} is not found",
                        request.index, id
                    )));
                }
                Some(source) if source != request.source => {
                    return Err(ElasticsearchError::ExpectationFailed(format!(
                        "Expected document for index: {} - id: {} is {}, but {} was found",
                        request.index, id, request.source, source
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Whether the configured indices hold no documents. With no index
    /// configured, every index is counted.
    pub async fn database_is_empty(&self) -> Result<bool> {
        let indices: Vec<&str> = self.index_settings.keys().map(String::as_str).collect();
        Ok(self.client.count(&indices).await? == 0)
    }

    /// The held client.
    pub fn connection_manager(&self) -> &C {
        &self.client
    }

    /// Whether configured indices are created on setup.
    pub fn is_create_indices(&self) -> bool {
        self.create_indices
    }

    /// Whether every index is deleted on setup.
    pub fn is_delete_all_indices(&self) -> bool {
        self.delete_all_indices
    }
}

#[async_trait]
impl<C: ElasticsearchClient> DatabaseOperation for ElasticsearchOperation<C> {
    type Connection = C;
    type Error = ElasticsearchError;

    async fn setup(&self) -> Result<()> {
        ElasticsearchOperation::setup(self).await
    }

    async fn insert(&self, dataset: &str) -> Result<()> {
        ElasticsearchOperation::insert(self, dataset).await
    }

    async fn delete_all(&self) -> Result<()> {
        ElasticsearchOperation::delete_all(self).await
    }

    async fn database_is(&self, expected: &str) -> Result<()> {
        ElasticsearchOperation::database_is(self, expected).await
    }

    fn connection_manager(&self) -> &C {
        &self.client
    }

    async fn close(&self) -> Result<()> {
        self.client.close().await
    }
}
