use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_TICKER_LEN: usize = 16;

/// Exchange symbol, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let symbol = raw.trim().to_ascii_uppercase();
        ensure!(!symbol.is_empty(), "ticker must be non-empty");
        ensure!(
            symbol.len() <= MAX_TICKER_LEN,
            "ticker too long: {symbol} (max {MAX_TICKER_LEN} chars)"
        );
        ensure!(
            symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
            "ticker contains invalid characters: {symbol}"
        );
        Ok(Self(symbol))
    }

    /// Splits free-form input on commas and whitespace. Keeps first-seen order and drops
    /// duplicates.
    pub fn parse_list(input: &str) -> anyhow::Result<Vec<Self>> {
        let mut out: Vec<Self> = Vec::new();
        for raw in input.split(|c: char| c == ',' || c.is_whitespace()) {
            if raw.is_empty() {
                continue;
            }
            let ticker = Self::parse(raw)?;
            if !out.contains(&ticker) {
                out.push(ticker);
            }
        }
        Ok(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let t = Ticker::parse("  aapl ").unwrap();
        assert_eq!(t.as_str(), "AAPL");
    }

    #[test]
    fn accepts_class_and_index_symbols() {
        for raw in ["BRK-B", "^GSPC", "EURUSD=X", "RY.TO"] {
            assert!(Ticker::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("   ").is_err());
        assert!(Ticker::parse("AA PL").is_err());
        assert!(Ticker::parse("AAPL;DROP").is_err());
        assert!(Ticker::parse("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn parse_list_splits_and_dedupes() {
        let tickers = Ticker::parse_list("aapl, msft  googl,AAPL,,").unwrap();
        let symbols: Vec<_> = tickers.iter().map(Ticker::as_str).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn parse_list_of_blank_input_is_empty() {
        assert!(Ticker::parse_list(" , ").unwrap().is_empty());
    }
}
