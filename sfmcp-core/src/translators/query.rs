//! SOQL and SOSL pass-through
//!
//! Query text is sent to the org unmodified; the org is the authority on
//! query correctness. SOQL pages are fetched sequentially by following
//! `nextRecordsUrl` until the org reports `done` or the record cap is hit.

use serde::Serialize;
use serde_json::Value;

use crate::backend::BackendClient;
use crate::error::{BridgeError, BridgeResult};
use crate::validator::ValidatedParams;

/// A raw SOQL or SOSL string plus an optional record cap
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub text: String,
    pub max_records: Option<usize>,
}

impl QueryRequest {
    /// Read the query text from `param` and the optional `max_records`
    pub fn from_params(params: &ValidatedParams, param: &str) -> BridgeResult<Self> {
        let text = params.require_string(param)?.to_string();

        let max_records = match params.number("max_records") {
            None => None,
            Some(n) if n >= 1.0 && n.fract() == 0.0 => Some(n as usize),
            Some(n) => {
                return Err(BridgeError::validation(
                    "max_records",
                    format!("must be a positive integer, got {n}"),
                ));
            }
        };

        Ok(Self { text, max_records })
    }
}

/// Accumulated SOQL result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecords {
    /// Total matches as reported by the org
    pub total_size: u64,
    /// Whether the org had no more pages
    pub done: bool,
    /// Whether the record cap cut the stream
    pub truncated: bool,
    pub records: Vec<Value>,
}

/// SOSL result grouped by object type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchGroups {
    pub total: usize,
    pub groups: Vec<SearchGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchGroup {
    pub object_type: String,
    pub records: Vec<Value>,
}

pub struct QueryTranslator<'a> {
    backend: &'a BackendClient,
    record_cap: usize,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(backend: &'a BackendClient, record_cap: usize) -> Self {
        Self { backend, record_cap }
    }

    /// Run a SOQL query, following continuation pages
    pub async fn run_soql(&self, request: &QueryRequest) -> BridgeResult<QueryRecords> {
        let cap = request
            .max_records
            .map_or(self.record_cap, |m| m.min(self.record_cap));

        let mut path = format!(
            "{}/query?q={}",
            self.backend.data_path(),
            urlencoding::encode(&request.text)
        );
        let mut total_size = None;
        let mut records: Vec<Value> = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = self.backend.get(&path).await?;
            pages += 1;

            if total_size.is_none() {
                total_size = page.get("totalSize").and_then(Value::as_u64);
            }
            let done = page.get("done").and_then(Value::as_bool).unwrap_or(true);
            let next = page
                .get("nextRecordsUrl")
                .and_then(Value::as_str)
                .map(String::from);

            if let Some(Value::Array(batch)) = page.get("records") {
                records.extend(batch.iter().cloned());
            }

            if records.len() >= cap {
                let truncated = records.len() > cap || !done;
                records.truncate(cap);
                tracing::debug!(pages, records = records.len(), truncated, "SOQL stopped at record cap");
                return Ok(QueryRecords {
                    total_size: total_size.unwrap_or(records.len() as u64),
                    done,
                    truncated,
                    records,
                });
            }

            match next {
                Some(next) if !done => path = next,
                _ => {
                    tracing::debug!(pages, records = records.len(), "SOQL complete");
                    return Ok(QueryRecords {
                        total_size: total_size.unwrap_or(records.len() as u64),
                        done,
                        truncated: false,
                        records,
                    });
                }
            }
        }
    }

    /// Run a SOSL search and group the hits by object type
    pub async fn run_sosl(&self, request: &QueryRequest) -> BridgeResult<SearchGroups> {
        let path = format!(
            "{}/search?q={}",
            self.backend.data_path(),
            urlencoding::encode(&request.text)
        );
        let response = self.backend.get(&path).await?;

        let hits = match &response {
            Value::Array(items) => items.clone(),
            Value::Object(map) => match map.get("searchRecords") {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        Ok(group_by_type(hits))
    }
}

/// Group hits by `attributes.type`, keeping first-appearance order
pub fn group_by_type(hits: Vec<Value>) -> SearchGroups {
    let total = hits.len();
    let mut groups: Vec<SearchGroup> = Vec::new();

    for hit in hits {
        let object_type = hit
            .pointer("/attributes/type")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        match groups.iter_mut().find(|g| g.object_type == object_type) {
            Some(group) => group.records.push(hit),
            None => groups.push(SearchGroup {
                object_type,
                records: vec![hit],
            }),
        }
    }

    SearchGroups { total, groups }
}
