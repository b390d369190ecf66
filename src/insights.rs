use crate::{
    config::insight::InsightConfig,
    data::leave_request::{LeaveRequest, LeaveType, RequestStatus},
    error::{
        GateResult, InsightRequestSnafu, InsightStatusSnafu, MissingInsightKeySnafu,
        SerdeJsonSnafu,
    },
};
use jiff::Timestamp;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use snafu::{OptionExt, ResultExt};
use std::{sync::Arc, time::Duration};

pub const NO_RECORDS: &str = "No records found to analyze for today.";
pub const NOTHING_NOTABLE: &str =
    "Strategic analysis complete. No critical anomalies detected in current leave patterns.";
pub const UNAVAILABLE: &str =
    "Unable to generate AI insights at this moment due to a connection error.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestSummary<'a> {
    student: &'a str,
    reason: &'a str,
    status: RequestStatus,
    #[serde(rename = "type")]
    leave_type: LeaveType,
    requested_at: Timestamp,
    exited_at: Option<Timestamp>,
    returned_at: Option<Timestamp>,
}

impl<'a> From<&'a LeaveRequest> for RequestSummary<'a> {
    fn from(request: &'a LeaveRequest) -> Self {
        Self {
            student: &request.student_name,
            reason: &request.reason,
            status: request.status,
            leave_type: request.leave_type,
            requested_at: request.requested_at,
            exited_at: request.exited_at,
            returned_at: request.returned_at,
        }
    }
}

fn build_prompt(requests: &[LeaveRequest]) -> GateResult<String> {
    let summaries: Vec<RequestSummary> = requests.iter().map(RequestSummary::from).collect();
    let data = serde_json::to_string(&summaries).context(SerdeJsonSnafu)?;

    Ok(format!(
        "Analyze the following school leave records and provide a professional executive summary.

Specifically, please analyze and report on:
1. The average duration of completed leaves (from exit to return).
2. Peak times of the day when students are requesting to leave.
3. Common themes or recurring reasons specifically for EMERGENCY leaves.
4. Any unusual patterns or potential policy misuse.

Be concise but insightful. Limit to 200 words.

Data: {data}"
    ))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Asks the language model for an executive summary of the leave records.
#[derive(Clone, Debug)]
pub struct InsightGenerator {
    client: Client,
    config: Arc<InsightConfig>,
}

impl InsightGenerator {
    pub fn new(config: Arc<InsightConfig>) -> GateResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("secureleave/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(InsightRequestSnafu)?;

        Ok(Self { client, config })
    }

    /// Never fails: problems are logged and the canned text is returned instead.
    pub async fn summarise(&self, requests: &[LeaveRequest]) -> String {
        if requests.is_empty() {
            return NO_RECORDS.to_string();
        }

        match self.generate(requests).await {
            Ok(text) if text.trim().is_empty() => NOTHING_NOTABLE.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(?e, "Unable to generate insights");
                UNAVAILABLE.to_string()
            }
        }
    }

    async fn generate(&self, requests: &[LeaveRequest]) -> GateResult<String> {
        let api_key = self.config.api_key.as_ref().context(MissingInsightKeySnafu)?;
        let prompt = build_prompt(requests)?;

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
            },
        });

        let response = self
            .client
            .post(self.config.endpoint())
            .query(&[("key", api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .context(InsightRequestSnafu)?;

        let status = response.status();
        snafu::ensure!(status.is_success(), InsightStatusSnafu { status });

        let parsed: GenerateResponse = response.json().await.context(InsightRequestSnafu)?;
        info!(records = requests.len(), "insights generated");
        Ok(parsed.text())
    }
}
