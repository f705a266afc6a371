use crate::config::Settings;
use crate::domain::analysis::AnalysisResult;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{json, prompt};
use crate::llm::{AnalysisInput, LlmClient, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url = settings
            .openai_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .openai_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = settings.llm_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    async fn create_chat_completion(
        &self,
        req: ChatCompletionRequest,
    ) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|err| {
                LlmDiagnosticsError::http(Provider::OpenAI, format!("request failed: {err}"), None)
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|err| {
            LlmDiagnosticsError::http(
                Provider::OpenAI,
                format!("failed to read response body: {err}"),
                None,
            )
        })?;
        if !status.is_success() {
            return Err(
                LlmDiagnosticsError::http(Provider::OpenAI, format!("status={status}"), Some(text))
                    .into(),
            );
        }

        serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|err| {
            LlmDiagnosticsError::parse(
                Provider::OpenAI,
                format!("failed to decode response: {err}"),
                Some(text.clone()),
            )
            .into()
        })
    }

    fn response_text(res: &ChatCompletionResponse) -> Option<&str> {
        res.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn analyze(&self, input: AnalysisInput) -> anyhow::Result<AnalysisResult> {
        let ticker = input.snapshot.metrics.ticker.clone();
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            messages: vec![
                Message {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: prompt::render_user_prompt(&input.snapshot)?,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let res = self.create_chat_completion(req).await?;
        if let Some(usage) = &res.usage {
            tracing::debug!(
                %ticker,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI usage"
            );
        }

        let text = Self::response_text(&res).ok_or_else(|| {
            LlmDiagnosticsError::parse(Provider::OpenAI, "response has no message content", None)
        })?;

        json::parse_analysis(text).map_err(|err| {
            LlmDiagnosticsError::parse(Provider::OpenAI, format!("{err:#}"), Some(text.to_string()))
                .into()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
