use crate::domain::analysis::{AnalysisResult, Signal};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Shape the model is asked to emit. Loosely typed so validation can report what is wrong.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAnalysis {
    pub signal: String,
    pub reasoning: String,
    #[serde(default)]
    pub key_factors: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

impl LlmAnalysis {
    pub fn validate_and_into_result(self) -> anyhow::Result<AnalysisResult> {
        let signal: Signal = self.signal.parse()?;

        let reasoning = self.reasoning.trim().to_string();
        ensure!(!reasoning.is_empty(), "reasoning must be non-empty");

        Ok(AnalysisResult {
            signal,
            reasoning,
            key_factors: clean_lines(self.key_factors),
            risks: clean_lines(self.risks),
        })
    }
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(signal: &str, reasoning: &str) -> LlmAnalysis {
        LlmAnalysis {
            signal: signal.to_string(),
            reasoning: reasoning.to_string(),
            key_factors: vec![" Growth ".to_string(), "".to_string()],
            risks: vec!["  ".to_string(), "Valuation".to_string()],
        }
    }

    #[test]
    fn trims_and_drops_blank_lines() {
        let result = raw("buy", " Solid. ").validate_and_into_result().unwrap();
        assert_eq!(result.signal, Signal::Buy);
        assert_eq!(result.reasoning, "Solid.");
        assert_eq!(result.key_factors, vec!["Growth".to_string()]);
        assert_eq!(result.risks, vec!["Valuation".to_string()]);
    }

    #[test]
    fn rejects_unknown_signal() {
        assert!(raw("ACCUMULATE", "x").validate_and_into_result().is_err());
    }

    #[test]
    fn rejects_blank_reasoning() {
        assert!(raw("SELL", "   ").validate_and_into_result().is_err());
    }
}
