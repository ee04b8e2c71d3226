use super::fallback::fallback;
use super::{SuggestionRequest, SuggestionResult};
use anyhow::{Context, Result};
use log::warn;
use reqwest::blocking::Client;
use std::time::Duration;

/// Ask a running server for a suggestion. Any failure is swallowed and
/// answered with the local fallback, so callers always get a usable result.
pub fn request_suggestion(
    server_url: &str,
    request: &SuggestionRequest,
    timeout: Duration,
) -> SuggestionResult {
    match try_request(server_url, request, timeout) {
        Ok(result) => result,
        Err(e) => {
            warn!("AI suggestion failed: {:#}", e);
            fallback(request)
        }
    }
}

fn try_request(
    server_url: &str,
    request: &SuggestionRequest,
    timeout: Duration,
) -> Result<SuggestionResult> {
    let endpoint = format!("{}/api/ai-suggest", server_url.trim_end_matches('/'));

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .post(&endpoint)
        .json(request)
        .send()
        .with_context(|| format!("Failed to reach {}", endpoint))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("API error: {}", status);
    }

    let body: serde_json::Value = response.json().context("Failed to read suggestion body")?;

    if let Some(error) = body.get("error").filter(|e| reports_error(e)) {
        anyhow::bail!("Server reported error: {}", error);
    }

    let result: SuggestionResult =
        serde_json::from_value(body).context("Suggestion body missing title or description")?;

    if !result.is_complete() {
        anyhow::bail!("Suggestion has an empty title or description");
    }

    Ok(result)
}

// Only a set error counts: null, false, 0 and "" are ignored.
fn reports_error(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}
