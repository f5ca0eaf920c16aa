//! services/api/src/adapters/llama_extract.rs
//!
//! This module contains the adapter for the LlamaCloud extraction service.
//! It implements the `ExtractionService` port from the `core` crate.

use async_trait::async_trait;
use doc_parser_core::ports::{ExtractionService, PortError, PortResult};
use doc_parser_core::schema::ResumeFields;
use reqwest::{multipart, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Per-request deadline for individual calls to the extraction API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResultResponse {
    #[serde(default)]
    data: Value,
}

/// Where a job stands after one status poll.
#[derive(Debug, PartialEq, Eq)]
enum JobState {
    Running,
    Finished,
    Failed(String),
}

fn job_state(status: &JobStatusResponse) -> JobState {
    match status.status.to_ascii_uppercase().as_str() {
        "SUCCESS" | "PARTIAL_SUCCESS" => JobState::Finished,
        "ERROR" | "CANCELLED" | "FAILED" => JobState::Failed(
            status
                .error
                .clone()
                .unwrap_or_else(|| format!("extraction job ended with status {}", status.status)),
        ),
        _ => JobState::Running,
    }
}

fn into_field_map(data: Value) -> PortResult<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(PortError::Unexpected(format!(
            "Extraction result was not an object: {}",
            other
        ))),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ExtractionService` against the LlamaCloud REST API.
#[derive(Clone)]
pub struct LlamaExtractAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    agent_id: String,
    poll_interval: Duration,
}

impl LlamaExtractAdapter {
    /// Resolves the named extraction agent, creating it with the resume schema when
    /// it does not exist yet.
    pub async fn connect(
        base_url: &str,
        api_key: &str,
        agent_name: &str,
        poll_interval: Duration,
    ) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        let mut adapter = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent_id: String::new(),
            poll_interval,
        };
        adapter.agent_id = adapter.resolve_agent(agent_name).await?;
        Ok(adapter)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// The by-name lookup URL, with `agent_name` percent-encoded as one path segment.
    fn agent_lookup_url(&self, agent_name: &str) -> PortResult<Url> {
        let mut url = Url::parse(&self.url("/extraction/extraction-agents/by-name"))
            .map_err(|e| PortError::Unexpected(format!("Invalid extraction API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("Extraction API URL cannot take a path".to_string()))?
            .push(agent_name);
        Ok(url)
    }

    async fn resolve_agent(&self, agent_name: &str) -> PortResult<String> {
        let response = self
            .client
            .get(self.agent_lookup_url(agent_name)?)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to look up extraction agent: {}", e)))?;

        if response.status() != StatusCode::NOT_FOUND {
            let agent: IdResponse = read_json(response, "extraction agent lookup").await?;
            info!(agent_id = %agent.id, "Using existing extraction agent '{}'", agent_name);
            return Ok(agent.id);
        }

        let response = self
            .client
            .post(self.url("/extraction/extraction-agents"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "name": agent_name,
                "data_schema": ResumeFields::json_schema(),
                "config": { "extraction_mode": "BALANCED" }
            }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create extraction agent: {}", e)))?;
        let agent: IdResponse = read_json(response, "extraction agent creation").await?;
        info!(agent_id = %agent.id, "Created extraction agent '{}'", agent_name);
        Ok(agent.id)
    }

    async fn upload_file(&self, path: &Path) -> PortResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = multipart::Form::new()
            .part("upload_file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.url("/files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to upload file: {}", e)))?;
        let file: IdResponse = read_json(response, "file upload").await?;
        Ok(file.id)
    }

    async fn start_job(&self, file_id: &str) -> PortResult<String> {
        let response = self
            .client
            .post(self.url("/extraction/jobs"))
            .bearer_auth(&self.api_key)
            .json(&json!({ "extraction_agent_id": self.agent_id, "file_id": file_id }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to start extraction job: {}", e)))?;
        let job: IdResponse = read_json(response, "extraction job creation").await?;
        Ok(job.id)
    }

    async fn wait_for_job(&self, job_id: &str) -> PortResult<()> {
        loop {
            let response = self
                .client
                .get(self.url(&format!("/extraction/jobs/{}", job_id)))
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| PortError::Unexpected(format!("Failed to poll extraction job: {}", e)))?;
            let status: JobStatusResponse = read_json(response, "extraction job status").await?;

            match job_state(&status) {
                JobState::Finished => return Ok(()),
                JobState::Failed(reason) => return Err(PortError::Unexpected(reason)),
                JobState::Running => {
                    debug!(job_id = %job_id, status = %status.status, "Extraction job still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn fetch_result(&self, job_id: &str) -> PortResult<Map<String, Value>> {
        let response = self
            .client
            .get(self.url(&format!("/extraction/jobs/{}/result", job_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to fetch extraction result: {}", e)))?;
        let result: JobResultResponse = read_json(response, "extraction result").await?;
        into_field_map(result.data)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> PortResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PortError::Unexpected(format!(
            "Extraction API error during {} ({}): {}",
            what, status, body
        )));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to parse {} response: {}", what, e)))
}

//=========================================================================================
// `ExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExtractionService for LlamaExtractAdapter {
    async fn extract(&self, path: &Path) -> PortResult<Map<String, Value>> {
        let file_id = self.upload_file(path).await?;
        let job_id = self.start_job(&file_id).await?;
        debug!(file_id = %file_id, job_id = %job_id, "Extraction job started");
        self.wait_for_job(&job_id).await?;
        self.fetch_result(&job_id).await
    }
}
