//! Test lifecycle rules for NoSQL stores.
//!
//! A rule wraps a store-specific [`DatabaseOperation`] and runs it around
//! each test: the store is prepared and seeded before the test, compared
//! with expected data afterwards, and the connection is released when the
//! rule is closed.
//!
//! ```rust,ignore
//! let rule = NoSqlTestRule::new("default", operation, "json");
//!
//! let test = TestCase::new("TweetTest", "finds_by_author")
//!     .using_data_set(UsingDataSet::new().strategy(LoadStrategy::CleanInsert))
//!     .should_match_data_set(ShouldMatchDataSet::new());
//!
//! rule.run(&test, || async {
//!     // exercise the code under test
//!     Ok(())
//! })
//! .await?;
//!
//! rule.close().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dataset;
mod error;
mod operation;
mod rule;
mod strategy;

pub use dataset::{
    DEFAULT_DATASET_DIR, DataSetLocator, SelectiveLocation, ShouldMatchDataSet, TestCase,
    UsingDataSet,
};
pub use error::{BoxError, NoSqlUnitError, Result};
pub use operation::DatabaseOperation;
pub use rule::{DEFAULT_CLOSE_CONTEXT, NoSqlTestRule};
pub use strategy::LoadStrategy;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        DatabaseOperation, LoadStrategy, NoSqlTestRule, NoSqlUnitError, Result,
        ShouldMatchDataSet, TestCase, UsingDataSet,
    };
}
