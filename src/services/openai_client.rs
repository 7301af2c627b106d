use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::model::ChatModel;
use crate::{
    config::{ModelSettings, DEFAULT_BASE_URL},
    error::{PlannerError, Result},
};

/// Thin client for OpenAI-compatible chat-completion endpoints.
#[derive(Clone, Debug)]
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Send one completion request. Failures are returned as-is, never retried.
    pub async fn chat_completion(&self, body: &Value) -> Result<Value> {
        let request_url = build_chat_url(&self.base_url);

        let response = self
            .http
            .post(&request_url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        let response_json: Value = match serde_json::from_str(&response_text) {
            Ok(value) => value,
            Err(err) if status.is_success() => {
                return Err(PlannerError::Provider(format!(
                    "Failed to parse provider JSON: {err}"
                )))
            }
            Err(_) => {
                return Err(PlannerError::Provider(format!(
                    "HTTP {} error: {}",
                    status, response_text
                )))
            }
        };

        if !status.is_success() {
            let api_message = response_json
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|value| value.as_str())
                .map(|s| s.to_string())
                .unwrap_or(response_text);

            return Err(PlannerError::Provider(format!(
                "HTTP {} error: {}",
                status, api_message
            )));
        }

        if let Some(error) = response_json.get("error").filter(|error| !error.is_null()) {
            let error_message = error
                .get("message")
                .and_then(|value| value.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| error.to_string());
            return Err(PlannerError::Provider(format!("API error: {}", error_message)));
        }

        Ok(response_json)
    }
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[derive(Clone, Debug)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Value>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn into_value(self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }
}

/// [`ChatModel`] over a chat-completion endpoint with fixed sampling settings.
#[derive(Clone, Debug)]
pub struct ChatCompletionModel {
    client: OpenAIClient,
    model: String,
    settings: ModelSettings,
}

impl ChatCompletionModel {
    pub fn new(client: OpenAIClient, model: impl Into<String>, settings: ModelSettings) -> Self {
        Self {
            client,
            model: model.into(),
            settings,
        }
    }

    /// Same endpoint and model, different sampling settings.
    pub fn with_settings(&self, settings: ModelSettings) -> Self {
        Self {
            client: self.client.clone(),
            model: self.model.clone(),
            settings,
        }
    }
}

#[async_trait]
impl ChatModel for ChatCompletionModel {
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = ChatCompletionRequest::new(
            self.model.clone(),
            vec![
                json!({"role": "system", "content": system_prompt}),
                json!({"role": "user", "content": user_prompt}),
            ],
        )
        .with_temperature(Some(self.settings.temperature))
        .with_max_tokens(Some(self.settings.max_tokens))
        .into_value();

        debug!(
            target: "trip_planner::model",
            model = %self.model,
            temperature = self.settings.temperature,
            max_tokens = self.settings.max_tokens,
            prompt_chars = user_prompt.chars().count(),
            "sending chat completion"
        );

        let response = self.client.chat_completion(&body).await.map_err(|err| {
            error!(target: "trip_planner::model", error = %err, "chat completion failed");
            err
        })?;

        message_content(&response)
    }
}

/// `choices[0].message.content` of a completion response.
fn message_content(response: &Value) -> Result<String> {
    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PlannerError::Provider("completion response has no message content".to_string())
        })
}
