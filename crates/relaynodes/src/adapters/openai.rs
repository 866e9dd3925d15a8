use async_trait::async_trait;
use relaycore::{AdapterError, ConditionAdapter, LlmAdapter, LlmRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Chat-completions client for every OpenAI-compatible backend the editor
/// can select. The request's model type picks the base URL.
pub struct OpenAiCompatibleLlm {
    http: Client,
}

impl OpenAiCompatibleLlm {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    fn base_url(model_type: &str) -> Result<&'static str, AdapterError> {
        match model_type {
            "openai" => Ok(OPENAI_BASE_URL),
            "gemini" => Ok(GEMINI_BASE_URL),
            "claude" => Ok(ANTHROPIC_BASE_URL),
            other => Err(AdapterError::UnsupportedModelType(other.to_string())),
        }
    }
}

impl Default for OpenAiCompatibleLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmAdapter for OpenAiCompatibleLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<String, AdapterError> {
        let base = Self::base_url(&request.model_type)?;

        let system = match request.system_prompt.as_deref() {
            Some(instructions) => format!(
                "You are an assistant performing this task: {}. Follow these instructions where \
                 they apply: {}. If the instructions do not fit the query, answer the query \
                 according to the task alone.",
                request.type_of_work, instructions
            ),
            None => format!(
                "You are an assistant performing this task: {}.",
                request.type_of_work
            ),
        };

        let body = ChatRequest {
            model: request.effective_model(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: request.query.clone(),
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", base))
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdapterError::Response(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Response(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .unwrap_or_default())
    }
}

/// Condition evaluator backed by a chat model that is asked to answer
/// strictly `true` or `false`. The handler performs the boolean coercion.
pub struct LlmConditionAdapter {
    llm: OpenAiCompatibleLlm,
    api_key: String,
    model: String,
}

impl LlmConditionAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            llm: OpenAiCompatibleLlm::new(),
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ConditionAdapter for LlmConditionAdapter {
    async fn evaluate(&self, condition: &str, query: &str) -> Result<Value, AdapterError> {
        let request = LlmRequest {
            type_of_work: format!(
                "Decide whether the statement satisfies this condition: {}. Answer only 'true' \
                 or 'false'.",
                condition
            ),
            system_prompt: None,
            model: self.model.clone(),
            model_type: "gemini".to_string(),
            api_key: self.api_key.clone(),
            model_version: None,
            query: query.to_string(),
        };

        let answer = self.llm.complete(&request).await?;
        Ok(Value::String(answer.trim().to_lowercase()))
    }
}
