//! Integration tests for the Elasticsearch rules.
//!
//! Tests marked `#[ignore]` need a running node at `ELASTICSEARCH_URL`
//! (default `http://localhost:9200`). They remove documents from every
//! index, so point them at a throwaway cluster:
//! `cargo test --test elasticsearch_it -- --ignored`

use nosqlunit::elasticsearch::{
    ElasticsearchClient, ElasticsearchError, HttpHost, assert_connection_possible_with, high_level,
    http,
};
use nosqlunit::{LoadStrategy, NoSqlUnitError, ShouldMatchDataSet, TestCase, UsingDataSet};
use serde_json::json;

const CLASS: &str = "ElasticsearchIT";

const CAROL: &str = r#"{ "documents": [ { "document": [
    { "index": { "indexName": "nosqlunit-tweets", "indexId": "3" } },
    { "data": { "author": "carol", "text": "late reply", "likes": 1 } }
] } ] }"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node() -> HttpHost {
    HttpHost::from_env().unwrap()
}

#[test]
fn test_rule_requires_configuration() {
    let result = http::ElasticsearchRule::new_elasticsearch_rule()
        .unit_instance(CLASS)
        .build();

    let err = result.unwrap_err();
    assert!(matches!(err, NoSqlUnitError::MissingConfiguration));
    assert_eq!(err.to_string(), "Configuration object should be provided.");
}

#[test]
fn test_default_rule_without_cluster() {
    // Building a rule never talks to the cluster.
    let rule = http::ElasticsearchRule::new_elasticsearch_rule()
        .remote_elasticsearch_with(HttpHost::new("localhost", 0))
        .unwrap();

    assert_eq!(rule.working_extension(), "json");
    assert!(rule.dataset_root().ends_with("tests/datasets"));
    assert!(!rule.database_operation().connection_manager().is_closed());
}

#[tokio::test]
async fn test_probe_reports_unreachable_node() {
    let err = assert_connection_possible_with(&HttpHost::new("localhost", 0), 2)
        .await
        .unwrap_err();

    assert!(matches!(err, ElasticsearchError::ConnectionRefused { .. }));
    assert_eq!(
        err.to_string(),
        "Couldn't connect to Elasticsearch at [http://localhost:0]"
    );
}

#[tokio::test]
#[ignore]
async fn test_rest_rule_loads_and_verifies() {
    init_tracing();
    assert_connection_possible_with(&node(), 10).await.unwrap();

    let configuration = http::ElasticsearchConfiguration::remote_elasticsearch_with(node())
        .index_settings(
            "nosqlunit-tweets",
            json!({ "settings": { "number_of_shards": 1, "number_of_replicas": 0 } }),
        )
        .build()
        .unwrap();
    let rule = http::ElasticsearchRule::new_elasticsearch_rule()
        .configure(configuration)
        .unit_instance(CLASS)
        .build()
        .unwrap();

    let test = TestCase::method("loads_tweets")
        .using_data_set(UsingDataSet::new().strategy(LoadStrategy::CleanInsert))
        .should_match_data_set(ShouldMatchDataSet::new());

    rule.run(&test, || async {
        let operation = rule.database_operation();
        assert_eq!(
            operation.connection_manager().count(&["nosqlunit-tweets"]).await?,
            2
        );
        operation.insert(CAROL).await?;
        Ok::<_, NoSqlUnitError>(())
    })
    .await
    .unwrap();

    rule.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_high_level_rule_with_class_dataset() {
    init_tracing();
    assert_connection_possible_with(&node(), 10).await.unwrap();

    let configuration = high_level::ElasticsearchConfiguration::remote_elasticsearch_with(node())
        .index_settings("nosqlunit-tweets", json!({}))
        .index_settings("nosqlunit-archive", json!({}))
        .index_template(
            "nosqlunit-logs",
            json!({ "index_patterns": ["nosqlunit-logs-*"], "settings": { "number_of_shards": 1 } }),
        )
        .build()
        .unwrap();
    let rule = high_level::ElasticsearchRule::new_elasticsearch_rule()
        .configure(configuration)
        .unit_instance(CLASS)
        .build()
        .unwrap();

    let test = TestCase::method("without_own_dataset").using_data_set(UsingDataSet::new());
    rule.before(&test).await.unwrap();

    let operation = rule.database_operation();
    let client = operation.connection_manager();
    assert!(client.template_exists("nosqlunit-logs").await.unwrap());
    assert_eq!(
        client.count(&["nosqlunit-tweets", "nosqlunit-archive"]).await.unwrap(),
        2
    );
    assert_eq!(
        client.get_source("nosqlunit-archive", "100").await.unwrap(),
        Some(json!({ "author": "dave", "text": "archived", "likes": 7 }))
    );

    operation.delete_all().await.unwrap();
    assert!(operation.database_is_empty().await.unwrap());

    rule.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_delete_all_indices_on_setup() {
    init_tracing();
    assert_connection_possible_with(&node(), 10).await.unwrap();

    let scratch = http::ElasticsearchConfiguration::remote_elasticsearch_with(node())
        .index_settings("nosqlunit-scratch", json!({}))
        .build()
        .unwrap();
    let scratch = http::ElasticsearchRule::new(scratch);
    scratch.setup().await.unwrap();
    scratch.close().await.unwrap();

    let configuration = http::ElasticsearchConfiguration::remote_elasticsearch_with(node())
        .index_settings("nosqlunit-tweets", json!({}))
        .delete_all_indices(true)
        .build()
        .unwrap();
    let rule = http::ElasticsearchRule::new(configuration);
    rule.setup().await.unwrap();

    let client = rule.database_operation().connection_manager();
    assert!(!client.index_exists("nosqlunit-scratch").await.unwrap());
    assert!(client.index_exists("nosqlunit-tweets").await.unwrap());

    rule.close().await.unwrap();
}
