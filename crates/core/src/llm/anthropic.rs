use crate::config::Settings;
use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::LlmAnalysis;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{json, prompt};
use crate::llm::{AnalysisInput, LlmClient, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.1;

const TOOL_NAME_EMIT_ANALYSIS: &str = "emit_analysis";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url = settings
            .anthropic_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .anthropic_model
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
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .map_err(|err| {
                LlmDiagnosticsError::http(Provider::Anthropic, format!("request failed: {err}"), None)
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|err| {
            LlmDiagnosticsError::http(
                Provider::Anthropic,
                format!("failed to read response body: {err}"),
                None,
            )
        })?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::http(
                Provider::Anthropic,
                format!("status={status}"),
                Some(text),
            )
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|err| {
            Self::parse_failure(format!("failed to decode response: {err}"), Some(text.clone()))
        })
    }

    fn tools() -> Vec<Tool> {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["signal", "reasoning", "key_factors", "risks"],
            "properties": {
                "signal": {"type": "string", "enum": ["BUY", "SELL", "HOLD"]},
                "reasoning": {"type": "string"},
                "key_factors": {"type": "array", "items": {"type": "string"}},
                "risks": {"type": "array", "items": {"type": "string"}}
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_ANALYSIS,
            description: "Emit the final stock analysis as structured JSON",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_ANALYSIS,
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_input(res: &CreateMessageResponse) -> Option<&serde_json::Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == TOOL_NAME_EMIT_ANALYSIS => Some(input),
            _ => None,
        })
    }

    fn tool_analysis(input: &serde_json::Value) -> anyhow::Result<AnalysisResult> {
        serde_json::from_value::<LlmAnalysis>(input.clone())
            .context("failed to decode tool_use.input into LlmAnalysis")?
            .validate_and_into_result()
    }

    fn parse_failure(detail: String, raw_output: Option<String>) -> anyhow::Error {
        LlmDiagnosticsError::parse(Provider::Anthropic, detail, raw_output).into()
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn analyze(&self, input: AnalysisInput) -> anyhow::Result<AnalysisResult> {
        let req = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            system: Some(prompt::SYSTEM_PROMPT.to_string()),
            messages: vec![Message {
                role: "user",
                content: prompt::render_user_prompt(&input.snapshot)?,
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        };

        let res = self.create_message(req).await?;
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                ticker = %input.snapshot.metrics.ticker,
                max_tokens = self.max_tokens,
                "Anthropic stop_reason=max_tokens; output may be truncated"
            );
        }

        // Tool output path.
        if let Some(tool_input) = Self::response_tool_input(&res) {
            return Self::tool_analysis(tool_input).map_err(|err| {
                Self::parse_failure(format!("{err:#}"), Some(tool_input.to_string()))
            });
        }

        // Fallback to text (should be rare).
        let text = Self::response_text(&res);
        json::parse_analysis(&text).map_err(|err| Self::parse_failure(format!("{err:#}"), Some(text)))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Signal;
    use crate::domain::snapshot::{FinancialSnapshot, StockMetrics};
    use crate::domain::ticker::Ticker;
    use mockito::Matcher;
    use serde_json::json;

    fn input() -> AnalysisInput {
        let metrics = StockMetrics::new(Ticker::parse("NVDA").unwrap(), 900.0);
        AnalysisInput::new(FinancialSnapshot {
            metrics,
            news: vec![],
        })
    }

    fn settings_for(server: &mockito::ServerGuard) -> Settings {
        Settings {
            llm_provider: Some("anthropic".to_string()),
            anthropic_api_key: Some("sk-ant-test".to_string()),
            anthropic_base_url: Some(server.url()),
            ..Settings::default()
        }
    }

    #[test]
    fn parses_tool_use_analysis_input() {
        let res = CreateMessageResponse {
            content: vec![ContentBlock::ToolUse {
                name: TOOL_NAME_EMIT_ANALYSIS.to_string(),
                input: json!({
                    "signal": "BUY",
                    "reasoning": "Data center demand.",
                    "key_factors": ["GPU backlog"],
                    "risks": ["Export controls"]
                }),
            }],
            stop_reason: Some("tool_use".to_string()),
        };

        let tool_input = AnthropicClient::response_tool_input(&res).unwrap();
        let result = AnthropicClient::tool_analysis(tool_input).unwrap();
        assert_eq!(result.signal, Signal::Buy);
        assert_eq!(result.risks, vec!["Export controls".to_string()]);
    }

    #[test]
    fn unknown_blocks_are_ignored_in_text() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "{\"signal\":\"HOLD\","},
                {"type": "text", "text": "\"reasoning\":\"Wait.\"}"}
            ]
        }))
        .unwrap();
        let text = AnthropicClient::response_text(&res);
        assert_eq!(text, "{\"signal\":\"HOLD\",\n\"reasoning\":\"Wait.\"}");
        assert_eq!(json::parse_analysis(&text).unwrap().signal, Signal::Hold);
    }

    #[tokio::test]
    async fn analyze_uses_forced_tool_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(json!({
                "tool_choice": {"type": "tool", "name": "emit_analysis"}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "content": [{
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "emit_analysis",
                        "input": {
                            "signal": "hold",
                            "reasoning": "Priced for perfection.",
                            "key_factors": [],
                            "risks": ["Competition"]
                        }
                    }],
                    "stop_reason": "tool_use"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = AnthropicClient::from_settings(&settings_for(&server)).unwrap();
        let result = client.analyze(input()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.signal, Signal::Hold);
        assert_eq!(result.reasoning, "Priced for perfection.");
    }

    #[tokio::test]
    async fn invalid_tool_output_is_a_parse_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(
                json!({
                    "content": [{
                        "type": "tool_use",
                        "name": "emit_analysis",
                        "input": {"signal": "STRONG BUY", "reasoning": "x"}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = AnthropicClient::from_settings(&settings_for(&server)).unwrap();
        let err = client.analyze(input()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "parse");
        assert!(diag.detail.contains("unknown signal"));
        let raw: serde_json::Value =
            serde_json::from_str(diag.raw_output.as_deref().unwrap()).unwrap();
        assert_eq!(raw["signal"], "STRONG BUY");
    }

    #[tokio::test]
    async fn undecodable_tool_input_keeps_raw_output() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(
                json!({
                    "content": [{
                        "type": "tool_use",
                        "name": "emit_analysis",
                        "input": {"verdict": "MAYBE"}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = AnthropicClient::from_settings(&settings_for(&server)).unwrap();
        let err = client.analyze(input()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "parse");
        assert!(diag.raw_output.as_deref().unwrap().contains("MAYBE"));
    }

    #[tokio::test]
    async fn non_json_body_is_a_parse_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let client = AnthropicClient::from_settings(&settings_for(&server)).unwrap();
        let err = client.analyze(input()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.provider, Provider::Anthropic);
        assert_eq!(diag.stage, "parse");
        assert_eq!(diag.raw_output.as_deref(), Some("<html>gateway</html>"));
    }
}
