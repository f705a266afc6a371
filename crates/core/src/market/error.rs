use crate::domain::ticker::Ticker;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unknown ticker: {0}")]
    UnknownTicker(Ticker),

    #[error("market data provider rate limit exceeded")]
    RateLimited,

    #[error("market data provider HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("market data request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not obtain Yahoo session crumb: {0}")]
    Crumb(String),

    #[error("no current price available for {0}")]
    MissingPrice(Ticker),
}
