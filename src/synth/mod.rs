//! Synthetic test-query generation.
//!
//! The model first proposes user scenarios ("dimension tuples"), then writes
//! several queries per scenario. Ambiguous and adversarial queries are added
//! without a scenario so the batch driver also exercises the edges of the
//! persona.

mod prompts;

use chrono::{ DateTime, Local };
use futures::{ stream, StreamExt };
use log::{ error, info, warn };
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::{ Deserialize, Serialize };
use std::collections::HashSet;
use std::error::Error as StdError;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::llm::chat::{ ChatClient, CompletionOptions };
use crate::models::chat::ChatMessage;

const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("LLM call failed: {0}")]
    Llm(#[source] Box<dyn StdError + Send + Sync>),
    #[error("LLM returned malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No dimension tuples were generated")]
    NoTuples,
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write queries to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DimensionTuple {
    pub dietary_needs_or_restrictions: String,
    pub available_ingredients_focus: String,
    pub cuisine_preference: String,
    pub skill_level_effort: String,
    pub time_availability: String,
    pub query_style_and_detail: String,
    pub user_context_or_scenario: String,
    pub user_ability_or_accessibility: String,
}

#[derive(Deserialize)]
struct DimensionTuplesList {
    tuples: Vec<DimensionTuple>,
}

#[derive(Deserialize)]
struct QueriesList {
    queries: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Regular,
    Ambiguous,
    Adversarial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticQuery {
    pub id: String,
    pub query: String,
    pub dimension_tuple: Option<DimensionTuple>,
    pub query_type: QueryType,
    pub is_realistic_and_kept: u8,
    pub notes_for_filtering: String,
}

impl SyntheticQuery {
    fn new(id: String, query: String, dimension_tuple: Option<DimensionTuple>, query_type: QueryType) -> Self {
        Self {
            id,
            query,
            dimension_tuple,
            query_type,
            is_realistic_and_kept: 1,
            notes_for_filtering: String::new(),
        }
    }
}

#[derive(Serialize)]
struct SyntheticQueryRow<'a> {
    id: &'a str,
    query: &'a str,
    dimension_tuple_json: Option<String>,
    query_type: QueryType,
    is_realistic_and_kept: u8,
    notes_for_filtering: &'a str,
}

#[derive(Debug, Clone)]
pub struct SynthSettings {
    pub num_tuples: usize,
    pub queries_per_tuple: usize,
    pub num_ambiguous: usize,
    pub num_adversarial: usize,
    pub max_workers: usize,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            num_tuples: 10,
            queries_per_tuple: 5,
            num_ambiguous: 15,
            num_adversarial: 3,
            max_workers: 5,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerationCounts {
    pub regular: usize,
    pub ambiguous: usize,
    pub adversarial: usize,
}

impl GenerationCounts {
    pub fn total(&self) -> usize {
        self.regular + self.ambiguous + self.adversarial
    }
}

pub struct QueryGenerator {
    client: Arc<dyn ChatClient>,
    settings: SynthSettings,
    options: CompletionOptions,
    retry_delay: Duration,
}

impl QueryGenerator {
    pub fn new(client: Arc<dyn ChatClient>, settings: SynthSettings, options: CompletionOptions) -> Self {
        Self {
            client,
            settings,
            options: CompletionOptions { json_response: true, ..options },
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sends one prompt in JSON mode and decodes the reply, retrying on any failure.
    async fn call_llm<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, SynthError> {
        let messages = [ChatMessage::user(prompt)];
        let mut attempt = 1;
        loop {
            let result = match self.client.chat(&messages, &self.options).await {
                Ok(resp) => serde_json::from_str::<T>(extract_json(&resp.response)).map_err(SynthError::from),
                Err(e) => Err(SynthError::Llm(e)),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= MAX_ATTEMPTS => return Err(e),
                Err(e) => {
                    warn!("LLM attempt {}/{} failed: {}", attempt, MAX_ATTEMPTS, e);
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Unique tuples in the order the model returned them.
    pub async fn generate_dimension_tuples(&self) -> Result<Vec<DimensionTuple>, SynthError> {
        let prompt = prompts::dimension_tuples(self.settings.num_tuples);
        let list: DimensionTuplesList = self.call_llm(&prompt).await?;

        let mut seen = HashSet::new();
        Ok(list.tuples.into_iter().filter(|t| seen.insert(t.clone())).collect())
    }

    pub async fn generate_queries_for_tuple(&self, tuple: &DimensionTuple) -> Result<Vec<String>, SynthError> {
        let tuple_json = serde_json::to_string_pretty(tuple)?;
        let prompt = prompts::queries_for_tuple(self.settings.queries_per_tuple, &tuple_json);
        let list: QueriesList = self.call_llm(&prompt).await?;
        Ok(clean_queries(list.queries))
    }

    /// Expands every tuple, at most `max_workers` at a time. Ids are handed
    /// out in completion order.
    pub async fn generate_queries_parallel(&self, tuples: &[DimensionTuple]) -> Vec<SyntheticQuery> {
        info!(
            "Generating {} queries each for {} dimension tuples...",
            self.settings.queries_per_tuple,
            tuples.len()
        );
        let workers = self.settings.max_workers.max(1);
        let mut pending = stream::iter(tuples.iter().enumerate())
            .map(|(idx, tuple)| async move { (idx, self.generate_queries_for_tuple(tuple).await) })
            .buffer_unordered(workers);

        let mut queries = Vec::new();
        let mut done = 0;
        while let Some((idx, result)) = pending.next().await {
            done += 1;
            match result {
                Ok(generated) => {
                    for query in generated {
                        let id = format!("SYN{:03}", queries.len() + 1);
                        queries.push(
                            SyntheticQuery::new(id, query, Some(tuples[idx].clone()), QueryType::Regular)
                        );
                    }
                }
                Err(e) => error!("Tuple {} generated an error: {}", idx + 1, e),
            }
            info!("Regular queries: {}/{} tuples done", done, tuples.len());
        }
        queries
    }

    pub async fn generate_ambiguous_queries(&self) -> Vec<SyntheticQuery> {
        let prompt = prompts::ambiguous(self.settings.num_ambiguous);
        match self.call_llm::<QueriesList>(&prompt).await {
            Ok(list) => untupled(clean_queries(list.queries), "AMB", QueryType::Ambiguous),
            Err(e) => {
                error!("Error generating ambiguous queries: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn generate_adversarial_queries(&self) -> Vec<SyntheticQuery> {
        let prompt = prompts::adversarial(self.settings.num_adversarial);
        match self.call_llm::<QueriesList>(&prompt).await {
            Ok(list) => untupled(clean_queries(list.queries), "ADV", QueryType::Adversarial),
            Err(e) => {
                error!("Error generating adversarial queries: {}", e);
                Vec::new()
            }
        }
    }

    /// Runs every step and returns the shuffled set. Fails only when no
    /// dimension tuple could be produced.
    pub async fn generate_all(&self) -> Result<(Vec<SyntheticQuery>, GenerationCounts), SynthError> {
        info!("Step 1: Generating dimension tuples...");
        let tuples = match self.generate_dimension_tuples().await {
            Ok(tuples) if !tuples.is_empty() => tuples,
            Ok(_) => return Err(SynthError::NoTuples),
            Err(e) => {
                error!("Error generating dimension tuples: {}", e);
                return Err(SynthError::NoTuples);
            }
        };
        info!("Generated {} dimension tuples.", tuples.len());

        info!("Step 2: Generating regular queries...");
        let regular = self.generate_queries_parallel(&tuples).await;

        info!("Step 3: Generating ambiguous queries...");
        let ambiguous = self.generate_ambiguous_queries().await;

        info!("Step 4: Generating adversarial queries...");
        let adversarial = self.generate_adversarial_queries().await;

        let counts = GenerationCounts {
            regular: regular.len(),
            ambiguous: ambiguous.len(),
            adversarial: adversarial.len(),
        };

        let mut all: Vec<SyntheticQuery> = regular
            .into_iter()
            .chain(ambiguous)
            .chain(adversarial)
            .collect();
        all.shuffle(&mut rand::thread_rng());
        Ok((all, counts))
    }
}

fn clean_queries(queries: Vec<String>) -> Vec<String> {
    queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect()
}

fn untupled(queries: Vec<String>, prefix: &str, query_type: QueryType) -> Vec<SyntheticQuery> {
    queries
        .into_iter()
        .enumerate()
        .map(|(i, q)| SyntheticQuery::new(format!("{}{:03}", prefix, i + 1), q, None, query_type))
        .collect()
}

/// Strips markdown code fences and surrounding chatter from a JSON reply.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// `<dir>/synthetic_queries_for_analysis_YYYYMMDD_HHMMSS.csv`
pub fn output_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("synthetic_queries_for_analysis_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

/// Returns `false` without touching the filesystem when there is nothing to save.
pub fn save_queries(path: &Path, queries: &[SyntheticQuery]) -> Result<bool, SynthError> {
    if queries.is_empty() {
        warn!("No queries to save.");
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SynthError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source| SynthError::Write { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    for q in queries {
        let dimension_tuple_json = match &q.dimension_tuple {
            Some(t) => Some(serde_json::to_string(t)?),
            None => None,
        };
        writer
            .serialize(SyntheticQueryRow {
                id: &q.id,
                query: &q.query,
                dimension_tuple_json,
                query_type: q.query_type,
                is_realistic_and_kept: q.is_realistic_and_kept,
                notes_for_filtering: &q.notes_for_filtering,
            })
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;
    info!("Saved {} queries to {}", queries.len(), path.display());
    Ok(true)
}
