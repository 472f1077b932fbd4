//! NLU boundary
//!
//! `IntentDetector` is the seam; `DialogflowClient` talks to the Dialogflow ES REST API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::core::Config;
use crate::features::intents::result::IntentResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Utterance sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default)]
    pub language_code: String,
    pub query_text: String,
    #[serde(default)]
    pub session_id: String,
}

#[async_trait]
pub trait IntentDetector: Send + Sync {
    async fn detect(&self, request: &DetectRequest) -> Result<IntentResult>;
}

pub struct DialogflowClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    query_result: QueryResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QueryResult {
    query_text: String,
    fulfillment_text: String,
    parameters: Map<String, Value>,
    intent: Option<IntentInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IntentInfo {
    display_name: String,
}

impl QueryResult {
    fn into_intent_result(self) -> IntentResult {
        IntentResult {
            response_text: self.fulfillment_text,
            parameters: self.parameters,
            query_text: self.query_text,
            intent: self
                .intent
                .map(|i| i.display_name)
                .filter(|name| !name.is_empty()),
        }
    }
}

impl DialogflowClient {
    pub fn new(endpoint: &str, project_id: &str, access_token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(DialogflowClient {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.dialogflow_endpoint,
            &config.dialogflow_project_id,
            &config.dialogflow_access_token,
        )
    }

    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/projects/{}/agent/sessions/{}:detectIntent",
            self.endpoint, self.project_id, session_id
        )
    }
}

#[async_trait]
impl IntentDetector for DialogflowClient {
    async fn detect(&self, request: &DetectRequest) -> Result<IntentResult> {
        let session_id = if request.session_id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            request.session_id.trim().to_string()
        };
        let language_code = if request.language_code.trim().is_empty() {
            "en"
        } else {
            request.language_code.trim()
        };

        let body = json!({
            "queryInput": {
                "text": {
                    "text": request.query_text,
                    "languageCode": language_code,
                }
            }
        });

        let response = self
            .http
            .post(self.session_url(&session_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("NLU request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("NLU returned {}: {}", status, detail));
        }

        let parsed: DetectIntentResponse = response
            .json()
            .await
            .context("failed to decode NLU response")?;
        debug!("NLU response: {:?}", parsed.query_result);

        Ok(parsed.query_result.into_intent_result())
    }
}
