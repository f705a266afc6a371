pub mod analyzer;
pub mod domain;
pub mod llm;
pub mod market;
pub mod report;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_LOOKBACK_RANGE: &str = "1y";
    pub const DEFAULT_NEWS_LIMIT: usize = 5;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub llm_provider: Option<String>,
        pub openai_api_key: Option<String>,
        pub openai_base_url: Option<String>,
        pub openai_model: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub anthropic_base_url: Option<String>,
        pub anthropic_model: Option<String>,
        pub llm_timeout_secs: Option<u64>,
        pub market_data_base_url: Option<String>,
        pub market_data_cookie_url: Option<String>,
        pub market_data_timeout_secs: Option<u64>,
        pub lookback_range: Option<String>,
        pub news_limit: Option<usize>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                llm_provider: non_empty_var("LLM_PROVIDER"),
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                openai_base_url: non_empty_var("OPENAI_BASE_URL"),
                openai_model: non_empty_var("OPENAI_MODEL"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                anthropic_base_url: non_empty_var("ANTHROPIC_BASE_URL"),
                anthropic_model: non_empty_var("ANTHROPIC_MODEL"),
                llm_timeout_secs: parsed_var("LLM_TIMEOUT_SECS")?,
                market_data_base_url: non_empty_var("MARKET_DATA_BASE_URL"),
                market_data_cookie_url: non_empty_var("MARKET_DATA_COOKIE_URL"),
                market_data_timeout_secs: parsed_var("MARKET_DATA_TIMEOUT_SECS")?,
                lookback_range: non_empty_var("LOOKBACK_RANGE"),
                news_limit: parsed_var("NEWS_LIMIT")?,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn lookback_range(&self) -> &str {
            self.lookback_range
                .as_deref()
                .unwrap_or(DEFAULT_LOOKBACK_RANGE)
        }

        pub fn news_limit(&self) -> usize {
            self.news_limit.unwrap_or(DEFAULT_NEWS_LIMIT)
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(key)
            .map(|s| s.parse::<T>().with_context(|| format!("{key} is invalid: {s}")))
            .transpose()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_keys_produce_named_errors() {
            let settings = Settings::default();
            let err = settings.require_openai_api_key().unwrap_err();
            assert_eq!(err.to_string(), "OPENAI_API_KEY is required");
            let err = settings.require_anthropic_api_key().unwrap_err();
            assert_eq!(err.to_string(), "ANTHROPIC_API_KEY is required");
        }

        #[test]
        fn defaults_apply_when_unset() {
            let settings = Settings::default();
            assert_eq!(settings.lookback_range(), "1y");
            assert_eq!(settings.news_limit(), 5);

            let settings = Settings {
                lookback_range: Some("6mo".to_string()),
                news_limit: Some(3),
                ..Settings::default()
            };
            assert_eq!(settings.lookback_range(), "6mo");
            assert_eq!(settings.news_limit(), 3);
        }
    }
}
