pub mod error;
pub mod provider;
pub mod types;
pub mod yahoo;

pub use error::FetchError;
pub use provider::MarketDataProvider;
pub use yahoo::YahooFinanceProvider;
