use crate::domain::snapshot::FinancialSnapshot;
use crate::domain::ticker::Ticker;
use crate::market::error::FetchError;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_snapshot(&self, ticker: &Ticker) -> Result<FinancialSnapshot, FetchError>;
}
