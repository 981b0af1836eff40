//! Elasticsearch test rule and its builder.

use crate::address::HttpHost;
use crate::client::ElasticsearchClient;
use crate::config::ElasticsearchConfiguration;
use crate::operation::ElasticsearchOperation;
use nosqlunit_core::{NoSqlTestRule, NoSqlUnitError, Result, TestCase};
use std::future::Future;
use std::path::{Path, PathBuf};

/// File extension of Elasticsearch datasets.
pub const EXTENSION: &str = "json";

const CLOSE_CONTEXT: &str = "Error while closing Elasticsearch client";

/// Runs an [`ElasticsearchOperation`] around tests.
///
/// Created by [`ElasticsearchRuleBuilder`]. `close` consumes the rule and
/// releases the client.
pub struct ElasticsearchRule<C: ElasticsearchClient> {
    inner: NoSqlTestRule<ElasticsearchOperation<C>>,
}

impl<C: ElasticsearchClient> ElasticsearchRule<C> {
    /// Start building a rule.
    pub fn new_elasticsearch_rule() -> ElasticsearchRuleBuilder<C> {
        ElasticsearchRuleBuilder::default()
    }

    /// Rule for a configuration, with datasets under `tests/datasets`.
    pub fn new(configuration: ElasticsearchConfiguration<C>) -> Self {
        let identifier = configuration.connection_identifier().to_string();
        let operation = ElasticsearchOperation::new(configuration);
        Self {
            inner: NoSqlTestRule::new(identifier, operation, EXTENSION)
                .with_close_context(CLOSE_CONTEXT),
        }
    }

    /// The lifecycle operation.
    pub fn database_operation(&self) -> &ElasticsearchOperation<C> {
        self.inner.database_operation()
    }

    /// Always [`EXTENSION`].
    pub fn working_extension(&self) -> &str {
        self.inner.working_extension()
    }

    /// Identifier used to pick selective dataset locations.
    pub fn connection_identifier(&self) -> &str {
        self.inner.identifier()
    }

    /// Directory datasets are resolved against.
    pub fn dataset_root(&self) -> &Path {
        self.inner.dataset_root()
    }

    /// Bring the indices to their configured state without loading data.
    pub async fn setup(&self) -> Result<()> {
        self.database_operation()
            .setup()
            .await
            .map_err(NoSqlUnitError::from)
    }

    /// Prepare indices, then load the test's initial dataset if it names one.
    pub async fn before(&self, test: &TestCase) -> Result<()> {
        self.inner.before(test).await
    }

    /// Compare the cluster with the test's expected dataset if it names one.
    pub async fn after(&self, test: &TestCase) -> Result<()> {
        self.inner.after(test).await
    }

    /// Run `test_fn` between [`before`](Self::before) and [`after`](Self::after).
    pub async fn run<F, Fut, T>(&self, test: &TestCase, test_fn: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.inner.run(test, test_fn).await
    }

    /// Release the client.
    ///
    /// # Errors
    ///
    /// [`NoSqlUnitError::Close`] when the client fails to shut down; the
    /// client's error is kept as the source.
    pub async fn close(self) -> Result<()> {
        self.inner.close().await
    }
}

impl<C: ElasticsearchClient> std::fmt::Debug for ElasticsearchRule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchRule")
            .field("connection_identifier", &self.connection_identifier())
            .field("dataset_root", &self.dataset_root())
            .finish()
    }
}

/// Builder for [`ElasticsearchRule`].
pub struct ElasticsearchRuleBuilder<C> {
    configuration: Option<ElasticsearchConfiguration<C>>,
    unit_instance: Option<String>,
    dataset_root: Option<PathBuf>,
}

impl<C> Default for ElasticsearchRuleBuilder<C> {
    fn default() -> Self {
        Self {
            configuration: None,
            unit_instance: None,
            dataset_root: None,
        }
    }
}

impl<C: ElasticsearchClient> ElasticsearchRuleBuilder<C> {
    /// Use this configuration.
    pub fn configure(mut self, configuration: ElasticsearchConfiguration<C>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Test class used for conventional dataset names.
    pub fn unit_instance(mut self, class: impl Into<String>) -> Self {
        self.unit_instance = Some(class.into());
        self
    }

    /// Resolve datasets under `root` instead of `tests/datasets`.
    pub fn dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.dataset_root = Some(root.into());
        self
    }

    /// Build the rule.
    ///
    /// # Errors
    ///
    /// [`NoSqlUnitError::MissingConfiguration`] when no configuration was given.
    pub fn build(self) -> Result<ElasticsearchRule<C>> {
        let configuration = self
            .configuration
            .ok_or(NoSqlUnitError::MissingConfiguration)?;

        let mut inner = ElasticsearchRule::new(configuration).inner;
        if let Some(class) = self.unit_instance {
            inner = inner.with_unit_instance(class);
        }
        if let Some(root) = self.dataset_root {
            inner = inner.with_dataset_root(root);
        }

        Ok(ElasticsearchRule { inner })
    }

    /// Build a rule for `http://localhost:9200` with default settings.
    pub fn remote_elasticsearch(self) -> Result<ElasticsearchRule<C>> {
        self.remote_elasticsearch_with(HttpHost::default())
    }

    /// Build a rule for one node with default settings.
    pub fn remote_elasticsearch_with(self, server: HttpHost) -> Result<ElasticsearchRule<C>> {
        self.remote_elasticsearch_with_all([server])
    }

    /// Build a rule for a set of nodes with default settings.
    pub fn remote_elasticsearch_with_all<I>(self, servers: I) -> Result<ElasticsearchRule<C>>
    where
        I: IntoIterator<Item = HttpHost>,
    {
        let configuration =
            ElasticsearchConfiguration::<C>::remote_elasticsearch_with_all(servers).build()?;
        self.configure(configuration).build()
    }
}
