//! HTTP adapter for the expense endpoint (a spreadsheet web app).
//!
//! One JSON `POST` per record; the endpoint answers `{ "ok": bool, "error"?: string }`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use etr_core::{
    config::Config,
    domain::ExpenseRecord,
    errors::Error,
    ports::{ExpenseRecorder, RecordError},
    Result,
};

/// Shown when the endpoint refuses a record without saying why.
const UNKNOWN_REMOTE_ERROR: &str = "unknown error";

#[derive(Serialize)]
struct RecordPayload<'a> {
    secret: &'a str,
    category: &'a str,
    description: &'a str,
    amount: u64,
    method: &'a str,
    note: &'a str,
}

#[derive(Clone, Debug)]
pub struct HttpRecorder {
    endpoint: reqwest::Url,
    secret: String,
    http: reqwest::Client,
}

impl HttpRecorder {
    pub fn new(endpoint: &str, secret: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("SCRIPT_URL is not a valid URL: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "SCRIPT_URL must be http(s), got {}",
                endpoint.scheme()
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

        Ok(Self {
            endpoint,
            secret: secret.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.script_url, cfg.secret.clone(), cfg.request_timeout)
    }
}

#[async_trait]
impl ExpenseRecorder for HttpRecorder {
    async fn record(&self, record: &ExpenseRecord) -> std::result::Result<(), RecordError> {
        let payload = RecordPayload {
            secret: &self.secret,
            category: &record.category,
            description: &record.description,
            amount: record.amount,
            method: &record.method,
            note: &record.note,
        };

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| RecordError::TransportFault(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RecordError::TransportFault(format!("failed to read response: {e}")))?;

        interpret_response(status, &body)
    }
}

fn interpret_response(
    status: reqwest::StatusCode,
    body: &str,
) -> std::result::Result<(), RecordError> {
    let parsed = serde_json::from_str::<Value>(body)
        .ok()
        .filter(Value::is_object);

    let Some(v) = parsed else {
        if !status.is_success() {
            return Err(RecordError::TransportFault(format!(
                "request failed with status {status}"
            )));
        }
        return Err(RecordError::TransportFault(format!(
            "invalid response body: {}",
            body.chars().take(200).collect::<String>()
        )));
    };

    if !is_truthy(&v["ok"]) {
        let reason = match &v["error"] {
            Value::Null => UNKNOWN_REMOTE_ERROR.to_string(),
            Value::String(s) if s.trim().is_empty() => UNKNOWN_REMOTE_ERROR.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(RecordError::RemoteRejected(reason));
    }

    if !status.is_success() {
        return Err(RecordError::TransportFault(format!(
            "request failed with status {status}"
        )));
    }

    Ok(())
}

/// Loose truthiness, so `"ok": 1` or `"ok": "true"` count as success.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
