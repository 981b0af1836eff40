//! Dataset file format.
//!
//! ```json
//! {
//!   "documents": [
//!     {
//!       "document": [
//!         { "index": { "indexName": "tweets", "indexId": "1" } },
//!         { "data": { "author": "alice", "text": "hello" } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A document lists one or more `index` entries and a single `data` entry;
//! the data is written into every listed index. `indexType` is accepted for
//! older fixtures but is not sent to the cluster.

use crate::error::{ElasticsearchError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Where a document goes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexTarget {
    /// Index name.
    pub index_name: String,
    /// Legacy mapping type.
    #[serde(default)]
    pub index_type: Option<String>,
    /// Document id; server-assigned when absent.
    #[serde(default, deserialize_with = "string_or_number")]
    pub index_id: Option<String>,
}

/// A document and the indices it is written to.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    targets: Vec<IndexTarget>,
    data: Value,
}

impl Document {
    /// Target indices.
    pub fn targets(&self) -> &[IndexTarget] {
        &self.targets
    }

    /// Document source.
    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// A parsed dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    documents: Vec<Document>,
}

/// One document write: index, optional id and source.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    /// Index name.
    pub index: String,
    /// Document id.
    pub id: Option<String>,
    /// Document source.
    pub source: Value,
}

impl IndexRequest {
    /// Bulk action line for this request.
    pub fn action(&self) -> Value {
        match &self.id {
            Some(id) => json!({ "index": { "_index": self.index, "_id": id } }),
            None => json!({ "index": { "_index": self.index } }),
        }
    }
}

#[derive(Deserialize)]
struct RawDataSet {
    documents: Vec<RawDocument>,
}

#[derive(Deserialize)]
struct RawDocument {
    document: Vec<RawPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawPart {
    Index(IndexTarget),
    Data(Value),
}

impl DataSet {
    /// Parse a dataset from JSON text.
    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawDataSet = serde_json::from_str(contents)
            .map_err(|e| ElasticsearchError::DataSet(e.to_string()))?;

        let documents = raw
            .documents
            .into_iter()
            .enumerate()
            .map(|(position, raw)| Self::document(position, raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { documents })
    }

    fn document(position: usize, raw: RawDocument) -> Result<Document> {
        let mut targets = Vec::new();
        let mut data = None;

        for part in raw.document {
            match part {
                RawPart::Index(target) => targets.push(target),
                RawPart::Data(value) if data.is_none() => data = Some(value),
                RawPart::Data(_) => {
                    return Err(ElasticsearchError::DataSet(format!(
                        "document {} has more than one data entry",
                        position
                    )));
                }
            }
        }

        if targets.is_empty() {
            return Err(ElasticsearchError::DataSet(format!(
                "document {} has no index entry",
                position
            )));
        }

        match data {
            Some(data @ Value::Object(_)) => Ok(Document { targets, data }),
            Some(_) => Err(ElasticsearchError::DataSet(format!(
                "data of document {} is not a JSON object",
                position
            ))),
            None => Err(ElasticsearchError::DataSet(format!(
                "document {} has no data entry",
                position
            ))),
        }
    }

    /// Documents in file order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Whether the dataset has no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Names of every index the dataset writes to.
    pub fn index_names(&self) -> BTreeSet<&str> {
        self.documents
            .iter()
            .flat_map(|d| d.targets.iter().map(|t| t.index_name.as_str()))
            .collect()
    }

    /// One request per (document, target index) pair.
    pub fn index_requests(&self) -> Vec<IndexRequest> {
        self.documents
            .iter()
            .flat_map(|document| {
                document.targets.iter().map(|target| IndexRequest {
                    index: target.index_name.clone(),
                    id: target.index_id.clone(),
                    source: document.data.clone(),
                })
            })
            .collect()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "indexId must be a string or a number, got {}",
            other
        ))),
    }
}
