use crate::domain::ticker::Ticker;
use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub metrics: StockMetrics,
    pub news: Vec<NewsArticle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMetrics {
    pub ticker: Ticker,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub current_price: f64,
    pub target_price: Option<f64>,
    pub target_upside_pct: Option<f64>,
    pub yearly_return_pct: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_yield_pct: Option<f64>,
    pub eps: Option<f64>,
    pub roe_pct: Option<f64>,
    pub roa_pct: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub recommendation: String,
}

impl StockMetrics {
    /// Metrics with only the mandatory fields filled in.
    pub fn new(ticker: Ticker, current_price: f64) -> Self {
        Self {
            name: ticker.to_string(),
            ticker,
            sector: "Unknown".to_string(),
            industry: "Unknown".to_string(),
            current_price,
            target_price: None,
            target_upside_pct: None,
            yearly_return_pct: None,
            pe_ratio: None,
            forward_pe: None,
            peg_ratio: None,
            price_to_book: None,
            dividend_yield_pct: None,
            eps: None,
            roe_pct: None,
            roa_pct: None,
            debt_to_equity: None,
            quick_ratio: None,
            current_ratio: None,
            market_cap: None,
            recommendation: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub publisher: String,
    pub link: String,
    /// `YYYY-MM-DD` or `N/A`.
    pub published: String,
}

/// Percent upside of `target` over `current`; `None` unless both are positive.
pub fn target_upside_pct(current: f64, target: Option<f64>) -> Option<f64> {
    let target = target?;
    if current <= 0.0 || target <= 0.0 {
        return None;
    }
    Some((target / current - 1.0) * 100.0)
}

/// Percent change from the first to the last close, rounded to 2 decimals.
pub fn period_return_pct(closes: &[f64]) -> Option<f64> {
    let first = *closes.first()?;
    let last = *closes.last()?;
    if first <= 0.0 {
        return None;
    }
    let pct = (last - first) / first * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upside_needs_both_prices() {
        assert_eq!(target_upside_pct(100.0, None), None);
        assert_eq!(target_upside_pct(0.0, Some(120.0)), None);
        let upside = target_upside_pct(100.0, Some(125.0)).unwrap();
        assert!((upside - 25.0).abs() < 1e-9);
    }

    #[test]
    fn period_return_rounds_to_cents() {
        assert_eq!(period_return_pct(&[]), None);
        assert_eq!(period_return_pct(&[150.0, 160.0, 171.234]), Some(14.16));
        assert_eq!(period_return_pct(&[200.0, 150.0]), Some(-25.0));
    }
}
