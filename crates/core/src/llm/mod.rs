pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;
pub mod prompt;

use crate::config::Settings;
use crate::domain::analysis::AnalysisResult;
use crate::domain::snapshot::FinancialSnapshot;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub snapshot: FinancialSnapshot,
}

impl AnalysisInput {
    pub fn new(snapshot: FinancialSnapshot) -> Self {
        Self { snapshot }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        match settings
            .llm_provider
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            None | Some("openai") => Ok(Provider::OpenAI),
            Some("anthropic") => Ok(Provider::Anthropic),
            Some(other) => anyhow::bail!("LLM_PROVIDER must be openai or anthropic (got {other})"),
        }
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn analyze(&self, input: AnalysisInput) -> anyhow::Result<AnalysisResult>;
}

/// Builds the configured client. Fails before any network I/O when the provider's API key
/// is missing.
pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match Provider::from_settings(settings)? {
        Provider::OpenAI => Arc::new(openai::OpenAiClient::from_settings(settings)?),
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
    };
    Ok(client)
}
