//! Generic test rule: runs a [`DatabaseOperation`] around each test.

use crate::dataset::{DataSetLocator, TestCase};
use crate::error::{NoSqlUnitError, Result};
use crate::operation::DatabaseOperation;
use crate::strategy::LoadStrategy;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Drives a database operation through a test's lifecycle.
///
/// `before` prepares the store and loads initial data, `after` verifies
/// expected data, and `close` releases the connection. `close` consumes the
/// rule, so nothing can run against a released connection.
pub struct NoSqlTestRule<O: DatabaseOperation> {
    identifier: String,
    operation: O,
    locator: DataSetLocator,
    unit_instance: Option<String>,
    close_context: String,
}

/// Message of [`NoSqlUnitError::Close`] unless the rule names its own.
pub const DEFAULT_CLOSE_CONTEXT: &str = "Error while closing database connection";

impl<O: DatabaseOperation> NoSqlTestRule<O> {
    /// Create a rule for the given connection identifier and working
    /// extension. Datasets resolve under `tests/datasets`.
    pub fn new(identifier: impl Into<String>, operation: O, extension: &str) -> Self {
        Self {
            identifier: identifier.into(),
            operation,
            locator: DataSetLocator::default_root(extension),
            unit_instance: None,
            close_context: DEFAULT_CLOSE_CONTEXT.to_string(),
        }
    }

    /// Resolve datasets under another directory.
    pub fn with_dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.locator = DataSetLocator::new(root, self.locator.extension().to_string());
        self
    }

    /// Message reported when closing the connection fails.
    pub fn with_close_context(mut self, context: impl Into<String>) -> Self {
        self.close_context = context.into();
        self
    }

    /// Name the test class used for conventional dataset names.
    pub fn with_unit_instance(mut self, class: impl Into<String>) -> Self {
        self.unit_instance = Some(class.into());
        self
    }

    /// Connection identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The wrapped operation.
    pub fn database_operation(&self) -> &O {
        &self.operation
    }

    /// Working file extension of datasets.
    pub fn working_extension(&self) -> &str {
        self.locator.extension()
    }

    /// Dataset root directory.
    pub fn dataset_root(&self) -> &Path {
        self.locator.root()
    }

    /// Prepare the store and apply the test's initial data.
    pub async fn before(&self, test: &TestCase) -> Result<()> {
        debug!("Setting up store for {}", test.method_name());
        self.operation
            .setup()
            .await
            .map_err(NoSqlUnitError::operation)?;

        let Some(using) = test.initial_data() else {
            return Ok(());
        };

        let strategy = using.load_strategy();
        let datasets = if strategy.loads_data() {
            let explicit = using.locations_for(&self.identifier);
            if explicit.is_empty() {
                vec![self.locator.initial(self.class_of(test)?, test.method_name())?]
            } else {
                self.locator.resolve(&explicit)?
            }
        } else {
            Vec::new()
        };

        if strategy.clears_store() {
            self.operation
                .delete_all()
                .await
                .map_err(NoSqlUnitError::operation)?;
        }

        for path in &datasets {
            let contents = self.locator.read(path).await?;
            info!("Loading dataset {} ({:?})", path.display(), strategy);
            let loaded = match strategy {
                LoadStrategy::Insert | LoadStrategy::CleanInsert => {
                    self.operation.insert(&contents).await
                }
                LoadStrategy::Refresh => self.operation.refresh(&contents).await,
                LoadStrategy::DeleteAll => Ok(()),
            };
            loaded.map_err(NoSqlUnitError::operation)?;
        }

        Ok(())
    }

    /// Compare the store with the test's expected data, if any.
    pub async fn after(&self, test: &TestCase) -> Result<()> {
        let Some(expected) = test.expected_data() else {
            return Ok(());
        };

        let path = match expected.location_for(&self.identifier) {
            Some(location) => self
                .locator
                .resolve(&[location])?
                .into_iter()
                .next()
                .ok_or_else(|| NoSqlUnitError::DataSetNotFound {
                    tried: vec![self.locator.root().join(location)],
                })?,
            None => self
                .locator
                .expected(self.class_of(test)?, test.method_name())?,
        };

        let contents = self.locator.read(&path).await?;
        debug!("Comparing store with {}", path.display());
        self.operation
            .database_is(&contents)
            .await
            .map_err(NoSqlUnitError::operation)
    }

    /// Run `test_fn` between `before` and `after`.
    ///
    /// Expected data is only checked when the test body succeeded.
    pub async fn run<F, Fut, T>(&self, test: &TestCase, test_fn: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.before(test).await?;
        let value = test_fn().await?;
        self.after(test).await?;
        Ok(value)
    }

    /// Take the operation out of the rule without closing it.
    pub fn into_operation(self) -> O {
        self.operation
    }

    /// Release the connection held by the operation.
    ///
    /// A failure becomes [`NoSqlUnitError::Close`] with the rule's close
    /// context as message and the store error as source.
    pub async fn close(self) -> Result<()> {
        info!("Closing connection {}", self.identifier);
        let context = self.close_context;
        self.operation
            .close()
            .await
            .map_err(|e| NoSqlUnitError::close(context, e))
    }

    fn class_of<'a>(&'a self, test: &'a TestCase) -> Result<&'a str> {
        test.class_name()
            .or(self.unit_instance.as_deref())
            .ok_or_else(|| NoSqlUnitError::UnnamedTestClass {
                method: test.method_name().to_string(),
            })
    }
}
