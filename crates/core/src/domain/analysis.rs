use crate::domain::snapshot::{NewsArticle, StockMetrics};
use crate::domain::ticker::Ticker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            "HOLD" => Ok(Signal::Hold),
            other => anyhow::bail!("unknown signal: {other:?} (expected BUY, SELL or HOLD)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub signal: Signal,
    pub reasoning: String,
    pub key_factors: Vec<String>,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub ticker: Ticker,
    pub name: String,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub news: Vec<NewsArticle>,
    pub metrics: StockMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Analysis,
}

impl FailureStage {
    pub fn label(self) -> &'static str {
        match self {
            FailureStage::Fetch => "fetch failed",
            FailureStage::Analysis => "analysis failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerFailure {
    pub ticker: Ticker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub stage: FailureStage,
    pub error: String,
}

impl TickerFailure {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.ticker.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TickerOutcome {
    Analyzed(StockReport),
    Failed(TickerFailure),
}

impl TickerOutcome {
    pub fn ticker(&self) -> &Ticker {
        match self {
            TickerOutcome::Analyzed(report) => &report.ticker,
            TickerOutcome::Failed(failure) => &failure.ticker,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TickerOutcome::Analyzed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisBatch {
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<TickerOutcome>,
}

impl AnalysisBatch {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.is_success())
    }

    pub fn reports(&self) -> impl Iterator<Item = &StockReport> {
        self.outcomes.iter().filter_map(|o| match o {
            TickerOutcome::Analyzed(report) => Some(report),
            TickerOutcome::Failed(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> StockReport {
        let ticker = Ticker::parse("AAPL").unwrap();
        let mut metrics = StockMetrics::new(ticker.clone(), 189.5);
        metrics.name = "Apple Inc.".to_string();
        metrics.pe_ratio = Some(29.4);
        StockReport {
            ticker,
            name: "Apple Inc.".to_string(),
            analysis: AnalysisResult {
                signal: Signal::Hold,
                reasoning: "Fairly valued.".to_string(),
                key_factors: vec!["Services growth".to_string()],
                risks: vec![],
            },
            news: vec![NewsArticle {
                title: "Apple ships".to_string(),
                publisher: "Reuters".to_string(),
                link: "https://example.com/a".to_string(),
                published: "2025-05-10".to_string(),
            }],
            metrics,
        }
    }

    #[test]
    fn signal_parses_loosely_and_serializes_upper() {
        assert_eq!(" buy ".parse::<Signal>().unwrap(), Signal::Buy);
        assert_eq!("Hold".parse::<Signal>().unwrap(), Signal::Hold);
        assert!("STRONG BUY".parse::<Signal>().is_err());
        assert_eq!(serde_json::to_string(&Signal::Sell).unwrap(), "\"SELL\"");
    }

    #[test]
    fn analysis_result_json_roundtrip_keeps_all_fields() {
        let result = AnalysisResult {
            signal: Signal::Buy,
            reasoning: "Strong margins.".to_string(),
            key_factors: vec!["Margins".to_string(), "Buybacks".to_string()],
            risks: vec!["Regulation".to_string()],
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn stock_report_json_is_flat_and_roundtrips() {
        let report = sample_report();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["signal"], "HOLD");
        assert_eq!(value["ticker"], "AAPL");
        assert_eq!(value["metrics"]["current_price"], 189.5);

        let back: StockReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn outcome_untagged_roundtrip_distinguishes_variants() {
        let failed = TickerOutcome::Failed(TickerFailure {
            ticker: Ticker::parse("ZZZZ").unwrap(),
            name: None,
            stage: FailureStage::Fetch,
            error: "unknown ticker: ZZZZ".to_string(),
        });
        let analyzed = TickerOutcome::Analyzed(sample_report());

        for outcome in [failed, analyzed] {
            let json = serde_json::to_string(&outcome).unwrap();
            let back: TickerOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(back, outcome);
        }
    }

    #[test]
    fn batch_reports_failures() {
        let batch = AnalysisBatch {
            generated_at: Utc::now(),
            outcomes: vec![TickerOutcome::Analyzed(sample_report())],
        };
        assert!(!batch.has_failures());
        assert_eq!(batch.reports().count(), 1);

        let mut batch = batch;
        batch.outcomes.push(TickerOutcome::Failed(TickerFailure {
            ticker: Ticker::parse("MSFT").unwrap(),
            name: Some("Microsoft".to_string()),
            stage: FailureStage::Analysis,
            error: "boom".to_string(),
        }));
        assert!(batch.has_failures());
        assert_eq!(batch.reports().count(), 1);
    }
}
