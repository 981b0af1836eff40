//! Elasticsearch test rules.
//!
//! A rule keeps a cluster's indices in a known state around each test:
//! - configured indices and templates are created when missing
//! - every index can be dropped first for a clean slate
//! - datasets are bulk loaded before the test and compared after it
//! - the client is released when the rule is closed
//!
//! Two client adapters are provided: [`http`] talks to the REST API
//! directly and fails over between nodes, [`high_level`] wraps the
//! `opensearch` client.
//!
//! # Example
//!
//! ```rust,no_run
//! use nosqlunit_elasticsearch::http::{ElasticsearchConfiguration, ElasticsearchRule};
//! use nosqlunit_elasticsearch::{HttpHost, assert_connection_possible};
//! use nosqlunit_core::{TestCase, UsingDataSet};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = HttpHost::new("localhost", 9200);
//!     assert_connection_possible(&node).await?;
//!
//!     let configuration = ElasticsearchConfiguration::remote_elasticsearch_with(node)
//!         .index_settings("tweets", json!({ "settings": { "number_of_shards": 1 } }))
//!         .build()?;
//!
//!     let rule = ElasticsearchRule::new_elasticsearch_rule()
//!         .configure(configuration)
//!         .unit_instance("TweetTest")
//!         .build()?;
//!
//!     let test = TestCase::method("finds_by_author").using_data_set(UsingDataSet::new());
//!     rule.run(&test, || async {
//!         // query the cluster
//!         Ok(())
//!     })
//!     .await?;
//!
//!     rule.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod client;
mod config;
mod dataset;
mod error;
mod operation;
mod probe;
mod rule;

pub mod high_level;
pub mod http;

#[cfg(test)]
mod testing;

pub use address::{DEFAULT_PORT, DEFAULT_SCHEME, ELASTICSEARCH_URL_ENV, HttpHost};
pub use client::ElasticsearchClient;
pub use config::{
    ClientSettings, DEFAULT_CONNECT_TIMEOUT, ElasticsearchConfiguration,
    RemoteElasticsearchConfigurationBuilder,
};
pub use dataset::{DataSet, Document, IndexRequest, IndexTarget};
pub use error::{ElasticsearchError, Result};
pub use operation::ElasticsearchOperation;
pub use probe::{DEFAULT_MAX_ATTEMPTS, assert_connection_possible, assert_connection_possible_with};
pub use rule::{EXTENSION, ElasticsearchRule, ElasticsearchRuleBuilder};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ClientSettings, ElasticsearchClient, ElasticsearchConfiguration, ElasticsearchError,
        ElasticsearchOperation, ElasticsearchRule, HttpHost, assert_connection_possible,
    };
}
