//! HTTP client for the preparation platform's stage endpoints
//!
//! Every operation is a JSON `POST` below `base_url`:
//!
//! | operation            | path                               |
//! |----------------------|------------------------------------|
//! | include metadata     | `/api/v1/assignments/metadata`     |
//! | include copy target  | `/api/v1/assignments/copy-targets` |
//! | delete datasets      | `/api/v1/datasets/delete`          |
//! | copy preparations    | `/api/v1/preparations/copy`        |
//! | execute actions      | `/api/v1/preparations/actions`     |
//! | cleanup              | `/api/v1/cleanup`                  |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::error::{PreparationError, PreparationResult};
use super::{CleanupScope, PreparationService};
use crate::model::{ActionBatch, ProcessingRecord};

/// Connection settings for the preparation platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationConfig {
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout; long-running copies get the wait hint added per
    /// record on top of this
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_token: None,
            timeout: default_timeout(),
        }
    }
}

/// Wait hint in whole milliseconds, saturating at `u64::MAX`
fn wait_millis(wait_hint: Duration) -> u64 {
    u64::try_from(wait_hint.as_millis()).unwrap_or(u64::MAX)
}

pub struct HttpPreparationService {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpPreparationService {
    pub fn new(config: &PreparationConfig) -> PreparationResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PreparationError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            timeout: config.timeout,
        })
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let builder = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Timeout for calls whose duration scales with the number of items
    fn scaled_timeout(&self, wait_hint: Duration, items: usize) -> Duration {
        let items = u32::try_from(items).unwrap_or(u32::MAX);
        self.timeout.saturating_add(wait_hint.saturating_mul(items))
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> PreparationResult<reqwest::Response> {
        debug!("POST {}{}", self.base_url, path);
        let response = builder.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(PreparationError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> PreparationResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(self.request(path).json(body), path).await?;
        response
            .json()
            .await
            .map_err(|e| PreparationError::invalid_response(path, e))
    }

    async fn post_unit<B>(&self, builder: RequestBuilder, path: &str, body: &B) -> PreparationResult<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(builder.json(body), path).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        // Body is informational only
        let _ = response.bytes().await;
        Ok(())
    }

    /// Enrichment and copy calls return the same records, in order
    fn expect_same_len(
        path: &str,
        sent: usize,
        received: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        if received.len() != sent {
            return Err(PreparationError::invalid_response(
                path,
                format!("sent {} records, received {}", sent, received.len()),
            ));
        }
        Ok(received)
    }
}

#[async_trait]
impl PreparationService for HttpPreparationService {
    async fn include_metadata(
        &self,
        records: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        const PATH: &str = "/api/v1/assignments/metadata";
        let received = self.post_json(PATH, &records).await?;
        Self::expect_same_len(PATH, records.len(), received)
    }

    async fn include_copy_target(
        &self,
        records: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        const PATH: &str = "/api/v1/assignments/copy-targets";
        let received = self.post_json(PATH, &records).await?;
        Self::expect_same_len(PATH, records.len(), received)
    }

    async fn delete_datasets(
        &self,
        dataset_ids: &[String],
        wait_hint: Duration,
    ) -> PreparationResult<()> {
        const PATH: &str = "/api/v1/datasets/delete";
        let builder = self
            .request(PATH)
            .timeout(self.scaled_timeout(wait_hint, dataset_ids.len()));
        let body = json!({
            "datasetIds": dataset_ids,
            "waitMs": wait_millis(wait_hint),
        });
        self.post_unit(builder, PATH, &body).await
    }

    async fn copy_preparations(
        &self,
        records: Vec<ProcessingRecord>,
        wait_hint: Duration,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        const PATH: &str = "/api/v1/preparations/copy";
        let sent = records.len();
        let body = json!({
            "records": records,
            "waitMs": wait_millis(wait_hint),
        });
        let builder = self
            .request(PATH)
            .timeout(self.scaled_timeout(wait_hint, sent))
            .json(&body);
        let response = self.send(builder, PATH).await?;
        let received: Vec<ProcessingRecord> = response
            .json()
            .await
            .map_err(|e| PreparationError::invalid_response(PATH, e))?;
        Self::expect_same_len(PATH, sent, received)
    }

    async fn execute_actions(
        &self,
        preparation_ids: &[String],
        batch: &ActionBatch,
    ) -> PreparationResult<()> {
        const PATH: &str = "/api/v1/preparations/actions";
        let body = json!({
            "preparationIds": preparation_ids,
            "actions": batch.actions,
        });
        self.post_unit(self.request(PATH), PATH, &body).await
    }

    async fn cleanup(&self, scope: CleanupScope) -> PreparationResult<()> {
        const PATH: &str = "/api/v1/cleanup";
        let body = json!({ "node": scope.as_wire() });
        self.post_unit(self.request(PATH), PATH, &body).await
    }
}
