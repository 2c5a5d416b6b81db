//! Classification collaborator
//!
//! The worker depends on the `Classifier` trait, constructed once at
//! process start and passed in by handle. The production implementation
//! talks to a local Ollama instance; tests substitute their own.

use async_trait::async_trait;
use revd_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model used for tone/sentiment labels
pub const DEFAULT_MODEL: &str = "llama3.2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed instruction prefix sent with every classification request
const INSTRUCTIONS: &str = "You will be asked to generate either sentiment or tone \
(positive, negative or neutral) for a review. Use the text provided to you and the \
stars (stars are equivalent to the rating, 1 being the lowest and 10 being the \
highest) to determine the sentiment or tone. Answer with the label only.";

/// Which derived label to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Tone,
    Sentiment,
}

impl LabelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKind::Tone => "tone",
            LabelKind::Sentiment => "sentiment",
        }
    }
}

/// Build the deterministic instruction for one label request
pub fn build_prompt(kind: LabelKind, text: Option<&str>, stars: i64) -> String {
    format!(
        "{INSTRUCTIONS}\n\nGenerate the {} for this review. The text of the review is '{}' \
         and the rating given is {}.",
        kind.as_str(),
        text.unwrap_or(""),
        stars
    )
}

/// Text classification collaborator
///
/// May be slow, rate-limited, or unavailable; errors surface as
/// `Error::Classification` and are retried by the queue's policy, not
/// here.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, kind: LabelKind, text: Option<&str>, stars: i64) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama-backed classifier
pub struct OllamaClassifier {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClassifier {
    /// Create a new Ollama classifier
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Classification(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Classifier for OllamaClassifier {
    async fn classify(&self, kind: LabelKind, text: Option<&str>, stars: i64) -> Result<String> {
        let prompt = build_prompt(kind, text, stars);
        let url = format!("{}/api/generate", self.base_url);

        tracing::debug!(kind = kind.as_str(), url = %url, "Requesting classification");

        let response = self
            .http_client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: &prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| Error::Classification(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Classification(format!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Classification(format!("malformed response: {}", e)))?;

        let label = body.response.trim().to_string();
        if label.is_empty() {
            return Err(Error::Classification("empty label from model".to_string()));
        }

        Ok(label)
    }
}
