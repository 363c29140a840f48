use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::GenerationParameters;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Persona preamble framing every prompt.
const PREAMBLE: &str = "The following is a conversation with an AI assistant. \
The assistant is helpful, creative, clever, and very friendly.";

/// Truncate the continuation before the model invents the next turn label.
const STOP_SEQUENCES: [&str; 2] = [" Human:", " AI:"];

/// Why a completion request failed.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by the completion service: {0}")]
    RateLimited(String),

    #[error("completion service rejected the request: {0}")]
    InvalidRequest(String),

    #[error("completion service error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("completion service returned no candidates")]
    EmptyResponse,
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Network(err.to_string())
    }
}

/// Wire payload for one POST to `/v1/completions`. The parameter fields
/// snapshot the live control values at the moment of submission.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(model: &str, user_text: &str, params: &GenerationParameters) -> Self {
        Self {
            model: model.to_string(),
            prompt: build_prompt(user_text),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// Frame the latest user text into the prompt. Earlier turns are not
/// replayed; the model sees only the newest exchange.
pub fn build_prompt(user_text: &str) -> String {
    format!("{PREAMBLE}\n\nHuman: {user_text}\nAI:")
}

#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CompletionClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Issue one completion request and return the first candidate's text.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/v1/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or(CompletionError::EmptyResponse)
    }
}

fn classify_status(status: StatusCode, body: String) -> CompletionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited(body),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CompletionError::InvalidRequest(body)
        }
        _ => CompletionError::Api { status, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_frames_latest_user_text() {
        let prompt = build_prompt("Hello");
        assert!(prompt.starts_with("The following is a conversation"));
        assert!(prompt.ends_with("Human: Hello\nAI:"));
    }

    #[test]
    fn test_request_snapshots_default_parameters() {
        let params = GenerationParameters::default();
        let request = CompletionRequest::new(DEFAULT_MODEL, "Hello", &params);

        assert_eq!(request.temperature, 0.9);
        assert_eq!(request.max_tokens, 150);
        assert_eq!(request.top_p, 1.0);
        assert_eq!(request.frequency_penalty, 0.0);
        assert_eq!(request.presence_penalty, 0.6);
        assert_eq!(request.stop, vec![" Human:", " AI:"]);
    }

    #[test]
    fn test_request_serializes_with_wire_field_names() {
        let params = GenerationParameters::default();
        let request = CompletionRequest::new("test-model", "Hi", &params);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "test-model");
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["top_p"], 1.0);
        assert_eq!(value["frequency_penalty"], 0.0);
        assert_eq!(value["presence_penalty"], 0.6);
        assert!(value["prompt"].as_str().unwrap().ends_with("Human: Hi\nAI:"));
        assert_eq!(value["stop"][0], " Human:");
    }

    #[test]
    fn test_response_uses_first_candidate_only() {
        let json = r#"{"choices": [{"text": " Hi there!"}, {"text": " ignored"}]}"#;
        let response: CompletionResponse = serde_json::from_str(json).unwrap();
        let text = response.choices.into_iter().next().map(|c| c.text);
        assert_eq!(text.as_deref(), Some(" Hi there!"));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            CompletionError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, String::new()),
            CompletionError::InvalidRequest(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            CompletionError::Api { .. }
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = CompletionClient::new("https://example.test/", "key");
        assert_eq!(client.base_url, "https://example.test");
    }
}
