//! OpenAI-compatible chat-completions client.
//!
//! One-shot, non-streaming completion against any endpoint speaking the
//! `/chat/completions` shape. This is the summarizer's provider: a single
//! cheap call with an output cap.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use bonsai_core::{CompactionError, TextGenerator};

use crate::provider::{GeneratorError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct OpenAiCompatGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Run one completion and return the assistant text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": max_output_tokens,
        });

        log::debug!(
            "requesting completion from {} (model '{}', cap {} tokens)",
            self.base_url,
            self.model,
            max_output_tokens
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api(format!("HTTP {}: {}", status, text)));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(GeneratorError::EmptyCompletion)
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<String, CompactionError> {
        self.complete(system_prompt, prompt, max_output_tokens)
            .await
            .map_err(|error| CompactionError::Generation(error.to_string()))
    }
}
