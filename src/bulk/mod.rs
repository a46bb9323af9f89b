//! Batch driver: replays a CSV of test queries against a running chat endpoint
//! and records every reply, or the error that replaced it, in a results CSV.

use chrono::{ DateTime, Local };
use futures::{ future, stream, StreamExt };
use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::fs;
use std::path::{ Path, PathBuf };
use thiserror::Error;

use crate::models::chat::ChatRequest;

pub const RESULT_COLUMNS: [&str; 4] = ["id", "query", "response", "timestamp"];

/// Marks a `response` cell that holds a failure instead of a reply.
pub const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Failed to read queries from '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("'{path}' has no '{column}' column")]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },
    #[error("Failed to write results to '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to create results directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Endpoint {
        status: u16,
        message: String,
    },
    #[error("response carried neither a reply nor an error")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryRecord {
    pub id: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub id: String,
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

impl ResultRecord {
    pub fn is_error(&self) -> bool {
        self.response.starts_with(ERROR_PREFIX)
    }
}

#[derive(Deserialize)]
struct EndpointResponse {
    reply: Option<String>,
    error: Option<String>,
}

/// A row with no `query` cell still loads, with an empty query, so its id
/// reaches the results file.
pub fn load_queries(path: &Path) -> Result<Vec<QueryRecord>, BulkError> {
    let read_err = |source| BulkError::ReadInput { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let headers = reader.headers().map_err(read_err)?;
    if !headers.iter().any(|h| h == "query") {
        return Err(BulkError::MissingColumn { path: path.to_path_buf(), column: "query" });
    }

    reader
        .deserialize::<QueryRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)
}

/// `<dir>/results_YYYYMMDD_HHMMSS.csv`
pub fn results_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("results_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

/// Writes the header even when `records` is empty, so every run leaves a file.
pub fn write_results(path: &Path, records: &[ResultRecord]) -> Result<(), BulkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| BulkError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source| BulkError::WriteOutput { path: path.to_path_buf(), source };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_err)?;
    writer.write_record(RESULT_COLUMNS).map_err(write_err)?;
    for record in records {
        writer.serialize(record).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;
    Ok(())
}

pub struct BulkRunner {
    http: reqwest::Client,
    endpoint: String,
    max_concurrency: Option<usize>,
}

impl BulkRunner {
    pub fn new(endpoint: impl Into<String>, max_concurrency: Option<usize>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            max_concurrency: max_concurrency.filter(|n| *n > 0),
        }
    }

    /// One result per query, in input order. Failed rows carry `ERROR: ...`.
    pub async fn run(&self, queries: &[QueryRecord]) -> Vec<ResultRecord> {
        info!("Sending {} queries to {}", queries.len(), self.endpoint);
        let tasks = queries.iter().map(|q| self.process(q));

        match self.max_concurrency {
            Some(limit) => stream::iter(tasks).buffered(limit).collect().await,
            None => future::join_all(tasks).await,
        }
    }

    async fn process(&self, record: &QueryRecord) -> ResultRecord {
        let response = match self.ask(&record.query).await {
            Ok(reply) => {
                info!("[{}] ok ({} chars)", record.id, reply.len());
                reply
            }
            Err(e) => {
                warn!("[{}] failed: {}", record.id, e);
                format!("{}{}", ERROR_PREFIX, e)
            }
        };

        ResultRecord {
            id: record.id.clone(),
            query: record.query.clone(),
            response,
            timestamp: Local::now().to_rfc3339(),
        }
    }

    async fn ask(&self, query: &str) -> Result<String, BulkError> {
        let body = ChatRequest {
            messages: Vec::new(),
            message: Some(query.to_string()),
        };
        let resp = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let parsed: Option<EndpointResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|p| p.error)
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(BulkError::Endpoint { status: status.as_u16(), message });
        }

        match parsed {
            Some(EndpointResponse { reply: Some(reply), .. }) => Ok(reply),
            Some(EndpointResponse { error: Some(message), .. }) =>
                Err(BulkError::Endpoint { status: status.as_u16(), message }),
            _ => Err(BulkError::EmptyResponse),
        }
    }
}
