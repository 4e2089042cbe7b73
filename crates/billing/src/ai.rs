//! Report generation through an OpenAI-compatible chat-completions API

use std::time::Duration;

use async_trait::async_trait;
use billtrack_shared::{Invoice, TrackerError};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};

/// Turns a set of invoices into a structured report body
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Returns the model output, guaranteed to be a JSON object
    async fn generate(&self, invoices: &[Invoice]) -> BillingResult<serde_json::Value>;
}

/// Connection settings for the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL without the trailing `/chat/completions`
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// ===== Wire Types =====

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// ===== Generator =====

pub struct OpenAiReportGenerator {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiReportGenerator {
    pub fn new(config: OpenAiConfig) -> BillingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BillingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReportGenerator for OpenAiReportGenerator {
    async fn generate(&self, invoices: &[Invoice]) -> BillingResult<serde_json::Value> {
        if !self.config.is_configured() {
            return Err(BillingError::Config("OPENAI_API_KEY is not set".to_string()));
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![Message {
                role: "user",
                content: build_prompt(invoices)?,
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Provider(format!("{}: {}", status, body)));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BillingError::InvalidModelOutput("empty response".to_string()))?;

        parse_report(&content)
    }
}

fn build_prompt(invoices: &[Invoice]) -> BillingResult<String> {
    let data = serde_json::to_string(invoices).map_err(TrackerError::from)?;

    Ok(format!(
        r#"Analyze the following financial data (invoices) and generate a comprehensive monthly report.
Data: {data}

Respond with a JSON object in exactly this shape:
{{
    "summary": "Executive summary of the financial status",
    "recommendations": ["Recommendation 1", "Recommendation 2"],
    "totalSpent": 1234.56,
    "remainingDue": 567.89,
    "upcomingBills": [the next 3 bills that are due]
}}"#
    ))
}

/// Model output must be a JSON object; anything else is rejected
fn parse_report(content: &str) -> BillingResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| BillingError::InvalidModelOutput(format!("not JSON: {}", e)))?;

    if !value.is_object() {
        return Err(BillingError::InvalidModelOutput(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(value)
}
