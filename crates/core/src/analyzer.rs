use crate::domain::analysis::{
    AnalysisBatch, FailureStage, StockReport, TickerFailure, TickerOutcome,
};
use crate::domain::ticker::Ticker;
use crate::llm::{AnalysisInput, LlmClient};
use crate::market::MarketDataProvider;
use std::sync::Arc;

/// Runs fetch then LLM analysis, one ticker at a time.
#[derive(Clone)]
pub struct Analyzer {
    market: Arc<dyn MarketDataProvider>,
    llm: Arc<dyn LlmClient>,
}

impl Analyzer {
    pub fn new(market: Arc<dyn MarketDataProvider>, llm: Arc<dyn LlmClient>) -> Self {
        Self { market, llm }
    }

    pub async fn analyze_ticker(&self, ticker: &Ticker) -> TickerOutcome {
        let snapshot = match self.market.fetch_snapshot(ticker).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(
                    %ticker,
                    provider = self.market.provider_name(),
                    error = %err,
                    "market data fetch failed"
                );
                return TickerOutcome::Failed(TickerFailure {
                    ticker: ticker.clone(),
                    name: None,
                    stage: FailureStage::Fetch,
                    error: err.to_string(),
                });
            }
        };

        let name = snapshot.metrics.name.clone();
        let news = snapshot.news.clone();
        let metrics = snapshot.metrics.clone();

        match self.llm.analyze(AnalysisInput::new(snapshot)).await {
            Ok(analysis) => {
                tracing::info!(
                    %ticker,
                    provider = self.llm.provider().as_str(),
                    signal = %analysis.signal,
                    "analysis complete"
                );
                TickerOutcome::Analyzed(StockReport {
                    ticker: ticker.clone(),
                    name,
                    analysis,
                    news,
                    metrics,
                })
            }
            Err(err) => {
                tracing::warn!(
                    %ticker,
                    provider = self.llm.provider().as_str(),
                    error = %err,
                    "LLM analysis failed"
                );
                TickerOutcome::Failed(TickerFailure {
                    ticker: ticker.clone(),
                    name: Some(name),
                    stage: FailureStage::Analysis,
                    error: format!("{err:#}"),
                })
            }
        }
    }

    pub async fn analyze_tickers(&self, tickers: &[Ticker]) -> AnalysisBatch {
        let mut outcomes = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            outcomes.push(self.analyze_ticker(ticker).await);
        }
        AnalysisBatch {
            generated_at: chrono::Utc::now(),
            outcomes,
        }
    }
}
