// Classifier Gateway
// One structured prompt/response call against the remote Gemini model.
// The output shape is enforced at this boundary: anything that is not a
// complete, in-range verdict is an error, never a coerced result.

use crate::models::Verdict;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

const GEMINI_DEFAULT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Hard bound on one classification call. The remote service imposes its own
/// timeout as well; this one keeps a stuck upstream from pinning a session.
const CLASSIFY_TIMEOUT_SECS: u64 = 60;

const DETECTION_SYSTEM_PROMPT: &str = r#"You are an AI detector. Given the following text, classify whether it was AI-generated or human-written. Output a probability score (0-1) and short reasoning.

Respond in JSON format only, with no other text:
{
  "is_ai_generated": true/false,
  "confidence": 0.0-1.0,
  "explanation": "Short explanation"
}"#;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("Invalid verdict: {0}")]
    InvalidVerdict(String),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Classification timed out after {0}s")]
    Timeout(u64),
}

/// Capability port for the external classifier. Production uses
/// [`GeminiClassifier`]; tests substitute their own implementation.
pub trait Classifier: Send + Sync + 'static {
    fn classify(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Verdict, ClassifierError>> + Send;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Raw model output. Every field is required; serde rejects missing fields
/// and wrong types, which is exactly the fail-closed behavior we want.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "isAiGenerated")]
    is_ai_generated: bool,
    confidence: f64,
    explanation: String,
}

pub struct GeminiClassifier {
    client: Client,
    url: String,
    model: String,
}

impl Default for GeminiClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClassifier {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(CLASSIFY_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let url = env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string());
        let model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| GEMINI_DEFAULT_MODEL.to_string());

        Self { client, url, model }
    }

    async fn call_chat_api(&self, api_key: &str, text: &str) -> Result<Verdict, ClassifierError> {
        let user_prompt = format!("Text: {}", text);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: DETECTION_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
            max_tokens: 512,
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response.json().await?;

        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(ClassifierError::MissingContent)?;

        info!(
            "[CLASSIFIER] model={} latency_ms={} content_len={}",
            self.model,
            latency_ms,
            content.len()
        );

        parse_verdict(&content)
    }
}

impl Classifier for GeminiClassifier {
    /// Single call attempt, no retry: transient upstream failures surface
    /// immediately for the orchestrator to report.
    async fn classify(&self, text: &str) -> Result<Verdict, ClassifierError> {
        let api_key = get_api_key().ok_or(ClassifierError::MissingApiKey)?;

        let fut = self.call_chat_api(&api_key, text);
        match tokio::time::timeout(Duration::from_secs(CLASSIFY_TIMEOUT_SECS), fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "[CLASSIFIER] call timed out after {}s",
                    CLASSIFY_TIMEOUT_SECS
                );
                Err(ClassifierError::Timeout(CLASSIFY_TIMEOUT_SECS))
            }
        }
    }
}

/// Parse and validate the model's reply against the verdict schema.
pub fn parse_verdict(content: &str) -> Result<Verdict, ClassifierError> {
    let json_str = extract_json(content.trim())?;
    let raw: RawVerdict = serde_json::from_str(&json_str)
        .map_err(|e| ClassifierError::InvalidVerdict(e.to_string()))?;

    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(ClassifierError::InvalidVerdict(format!(
            "confidence {} outside [0, 1]",
            raw.confidence
        )));
    }
    if raw.explanation.trim().is_empty() {
        return Err(ClassifierError::InvalidVerdict(
            "empty explanation".to_string(),
        ));
    }

    Ok(Verdict {
        is_ai_generated: raw.is_ai_generated,
        confidence: raw.confidence,
        explanation: raw.explanation,
    })
}

/// Extract the JSON object from the reply, tolerating prose or code fences
/// around it.
fn extract_json(content: &str) -> Result<String, ClassifierError> {
    if content.starts_with('{') && content.ends_with('}') {
        return Ok(content.to_string());
    }
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(content[start..=end].to_string()),
        _ => Err(ClassifierError::InvalidVerdict(
            "no JSON object in response".to_string(),
        )),
    }
}

/// API key from environment, service-prefixed name accepted too.
pub fn get_api_key() -> Option<String> {
    for key in ["GEMINI_API_KEY", "VERITEXT_GEMINI_API_KEY"] {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}
