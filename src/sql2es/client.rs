use crate::error::ConvertError;
use crate::sql2es::util::truncate_with_ellipsis;
use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

const CHAT_TEMPERATURE: f64 = 0.3;
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
}

/// A chat-completion backend. Implementations hold no per-call state.
pub trait ModelClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ConvertError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionClient {
    http: Client,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ConvertError> {
        Self::from_builder(Client::builder(), timeout_secs)
    }

    fn from_builder(
        builder: reqwest::blocking::ClientBuilder,
        timeout_secs: u64,
    ) -> Result<Self, ConvertError> {
        let http = builder
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| ConvertError::Transport(err.to_string()))?;
        Ok(Self { http, timeout_secs })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ConvertError {
        if err.is_timeout() {
            ConvertError::RemoteTimeout {
                secs: self.timeout_secs,
            }
        } else {
            ConvertError::Transport(err.to_string())
        }
    }
}

fn chat_payload(request: &CompletionRequest) -> Value {
    serde_json::json!({
        "model": request.model,
        "messages": [
            {"role": "user", "content": request.prompt}
        ],
        "temperature": CHAT_TEMPERATURE
    })
}

fn extract_chat_text(json: &Value) -> Option<String> {
    let choices = json.get("choices").and_then(Value::as_array)?;
    let first = choices.first()?;
    let content = first.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.to_string()),
        Value::Array(parts) => {
            let mut chunks = Vec::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    chunks.push(text.to_string());
                }
            }
            if chunks.is_empty() {
                None
            } else {
                Some(chunks.join("\n"))
            }
        }
        _ => None,
    }
}

impl ModelClient for ChatCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ConvertError> {
        debug!(
            "posting chat completion endpoint={} model={} prompt_chars={}",
            request.endpoint,
            request.model,
            request.prompt.chars().count()
        );
        let response = self
            .http
            .post(&request.endpoint)
            .bearer_auth(&request.api_key)
            .json(&chat_payload(request))
            .send()
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ConvertError::RemoteCall {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: truncate_with_ellipsis(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }

        let json: Value = response.json().map_err(|err| {
            if err.is_timeout() {
                ConvertError::RemoteTimeout {
                    secs: self.timeout_secs,
                }
            } else {
                ConvertError::InvalidResponse(err.to_string())
            }
        })?;
        let text = extract_chat_text(&json).ok_or(ConvertError::EmptyModelResponse)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ConvertError::EmptyModelResponse);
        }
        debug!("chat completion returned {} chars", trimmed.chars().count());
        Ok(trimmed.to_string())
    }
}
