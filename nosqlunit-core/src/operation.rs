//! The store-side half of a test rule.

use async_trait::async_trait;

/// Database operation driven by a [`NoSqlTestRule`](crate::NoSqlTestRule).
///
/// Implement this trait once per store binding. Datasets are handed over as
/// raw text in the store's working format; parsing is the binding's job.
#[async_trait]
pub trait DatabaseOperation: Send + Sync {
    /// Connection handle held by the operation.
    type Connection: Send + Sync;

    /// Store-level error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prepare the store before each test (create schemas, indices, ...).
    async fn setup(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Write the contents of a dataset into the store.
    async fn insert(&self, dataset: &str) -> Result<(), Self::Error>;

    /// Remove every record from the store.
    async fn delete_all(&self) -> Result<(), Self::Error>;

    /// Insert a dataset, overwriting records that already exist.
    async fn refresh(&self, dataset: &str) -> Result<(), Self::Error> {
        self.insert(dataset).await
    }

    /// Check that the store holds exactly the expected dataset.
    async fn database_is(&self, expected: &str) -> Result<(), Self::Error>;

    /// The held connection.
    fn connection_manager(&self) -> &Self::Connection;

    /// Release the held connection.
    async fn close(&self) -> Result<(), Self::Error>;
}
