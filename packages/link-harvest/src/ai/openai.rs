//! OpenAI implementation of the engine trait.
//!
//! Chat completions for free text, `json_schema` response format in strict
//! mode for structured output.
//!
//! # Example
//!
//! ```rust,ignore
//! use link_harvest::ai::OpenAiEngine;
//!
//! let engine = OpenAiEngine::from_env()?.with_model("gpt-4o");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult, HarvestError};
use crate::traits::engine::ExtractionEngine;

const SYSTEM_PROMPT: &str =
    "You extract information from web pages. Follow the user's instructions exactly.";

/// OpenAI-backed extraction engine.
pub struct OpenAiEngine {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiEngine {
    /// Create an engine with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, HarvestError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| HarvestError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for proxies or compatible servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> EngineResult<ChatMessageOut> {
        debug!(
            model = %self.model,
            structured = request.response_format.is_some(),
            "OpenAI request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| EngineError::Request(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OpenAI request failed");
            return Err(EngineError::Request(
                format!("OpenAI returned {status}: {body}").into(),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Request(Box::new(e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| EngineError::Request("no choices in OpenAI response".into()))
    }
}

#[async_trait]
impl ExtractionEngine for OpenAiEngine {
    async fn complete(&self, prompt: &str) -> EngineResult<String> {
        let request = ChatRequest::new(&self.model, prompt, None);
        let message = self.chat(&request).await?;
        message
            .content
            .ok_or_else(|| EngineError::Request("empty completion".into()))
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> EngineResult<Value> {
        let format = ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: "extraction",
                strict: true,
                schema,
            },
        };
        let request = ChatRequest::new(&self.model, prompt, Some(format));
        let message = self.chat(&request).await?;

        if let Some(refusal) = message.refusal {
            return Err(EngineError::non_conforming(format!("model refused: {refusal}")));
        }
        let content = message
            .content
            .ok_or_else(|| EngineError::non_conforming("empty structured response"))?;
        serde_json::from_str(&content).map_err(EngineError::non_conforming)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessageIn<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, response_format: Option<ResponseFormat<'a>>) -> Self {
        Self {
            model,
            messages: [
                ChatMessageIn {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessageIn {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            response_format,
        }
    }
}

#[derive(Serialize)]
struct ChatMessageIn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
