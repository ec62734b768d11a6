//! Translation backends.

use std::time::Duration;

use async_trait::async_trait;
use recipefeed_shared::{RecipeFeedError, Result};
use tracing::debug;

/// A best-effort text translator.
///
/// Implementations may return text that is partially translated, reordered
/// or garbled. Callers must never treat the output as authoritative.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Translate `text` into `dest_language`.
    async fn translate(&self, text: &str, dest_language: &str) -> Result<String>;
}

/// Translator that returns its input unchanged. Used when translation is off.
#[derive(Debug, Default)]
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    fn name(&self) -> &str {
        "noop"
    }

    async fn translate(&self, text: &str, _dest_language: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Google free endpoint
// ---------------------------------------------------------------------------

/// Client for the keyless `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    max_chars: usize,
}

impl GoogleTranslator {
    /// `endpoint` is the scheme and host, e.g. `https://translate.googleapis.com`.
    pub fn new(endpoint: &str, timeout: Duration, max_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecipeFeedError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_chars,
        })
    }
}

/// Concatenate the translated segments of a `translate_a/single` response.
///
/// The payload is a nested array whose first element lists
/// `[translated, original, ...]` segments.
fn join_segments(body: &serde_json::Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let joined: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(|s| s.as_str()))
        .collect();
    Some(joined)
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, dest_language: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        if text.chars().all(|c| c.is_ascii_digit()) {
            return Ok(text.to_string());
        }

        let input: String = text.chars().take(self.max_chars).collect();
        debug!(chars = input.chars().count(), dest = dest_language, "translation request");

        let url = format!("{}/translate_a/single", self.endpoint);
        let response = self
            .client
            .post(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", dest_language),
                ("dt", "t"),
            ])
            .form(&[("q", input.as_str())])
            .send()
            .await
            .map_err(|e| RecipeFeedError::Translation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecipeFeedError::Translation(format!(
                "translator returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RecipeFeedError::Translation(format!("invalid response: {e}")))?;

        match join_segments(&body) {
            Some(joined) if !joined.trim().is_empty() => Ok(joined),
            _ => Err(RecipeFeedError::Translation("empty translation".into())),
        }
    }
}
