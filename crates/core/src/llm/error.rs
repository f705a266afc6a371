use crate::llm::Provider;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl LlmDiagnosticsError {
    /// Transport failures and non-2xx responses.
    pub fn http(provider: Provider, detail: impl Into<String>, raw_output: Option<String>) -> Self {
        Self {
            provider,
            stage: "http",
            detail: detail.into(),
            raw_output,
        }
    }

    /// Bodies or model output that could not be decoded into an analysis.
    pub fn parse(provider: Provider, detail: impl Into<String>, raw_output: Option<String>) -> Self {
        Self {
            provider,
            stage: "parse",
            detail: detail.into(),
            raw_output,
        }
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider.as_str(),
            self.stage,
            self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
