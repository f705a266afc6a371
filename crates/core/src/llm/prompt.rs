use crate::domain::snapshot::{FinancialSnapshot, NewsArticle, NOT_AVAILABLE};
use anyhow::Context;
use minijinja::{context, Environment};

const TEMPLATE_NAME: &str = "analysis_prompt.txt";

pub const SYSTEM_PROMPT: &str = "You are a professional stock analyst with expertise in financial analysis and market trends. \
Return ONLY a single valid JSON object. Do not wrap it in markdown.";

const ANALYSIS_TEMPLATE: &str = r#"Analyze the following stock data and provide a clear investment recommendation.

Stock Information:
- Ticker: {{ ticker }}
- Company Name: {{ name }}
- Sector: {{ sector }}
- Industry: {{ industry }}
- Current Price: ${{ current_price }}
- Target Price: ${{ target_price }}
- Target Upside: {{ target_upside }}%

Financial Metrics:
- 1-Year Return: {{ yearly_return }}%
- P/E Ratio: {{ pe_ratio }}
- Forward P/E: {{ forward_pe }}
- PEG Ratio: {{ peg_ratio }}
- Price-to-Book: {{ price_to_book }}
- Dividend Yield: {{ dividend_yield }}%
- EPS: ${{ eps }}
- ROE: {{ roe }}%
- ROA: {{ roa }}%
- Debt-to-Equity: {{ debt_to_equity }}
- Quick Ratio: {{ quick_ratio }}
- Current Ratio: {{ current_ratio }}
- Market Cap: {{ market_cap }}
- Analyst Recommendation: {{ recommendation }}

Recent News:
{{ news }}

Based on the above information, provide:
1. A clear investment signal: BUY, SELL, or HOLD
2. A concise explanation of your recommendation (3-5 sentences)
3. Key factors that influenced your decision
4. Potential risks to your recommendation

{{ format_instructions }}"#;

pub const FORMAT_INSTRUCTIONS: &str = r#"Respond with a JSON object with exactly these keys:
{
  "signal": "BUY" | "SELL" | "HOLD",
  "reasoning": "string",
  "key_factors": ["string", ...],
  "risks": ["string", ...]
}
No trailing commas. No comments. Use double quotes for all JSON strings."#;

pub fn render_user_prompt(snapshot: &FinancialSnapshot) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(false);
    env.add_template(TEMPLATE_NAME, ANALYSIS_TEMPLATE)
        .context("invalid analysis prompt template")?;
    let template = env.get_template(TEMPLATE_NAME)?;

    let m = &snapshot.metrics;
    let rendered = template
        .render(context! {
            ticker => m.ticker.as_str(),
            name => m.name,
            sector => m.sector,
            industry => m.industry,
            current_price => fmt_num(Some(m.current_price)),
            target_price => fmt_num(m.target_price),
            target_upside => fmt_num(m.target_upside_pct),
            yearly_return => fmt_num(m.yearly_return_pct),
            pe_ratio => fmt_num(m.pe_ratio),
            forward_pe => fmt_num(m.forward_pe),
            peg_ratio => fmt_num(m.peg_ratio),
            price_to_book => fmt_num(m.price_to_book),
            dividend_yield => fmt_num(m.dividend_yield_pct),
            eps => fmt_num(m.eps),
            roe => fmt_num(m.roe_pct),
            roa => fmt_num(m.roa_pct),
            debt_to_equity => fmt_num(m.debt_to_equity),
            quick_ratio => fmt_num(m.quick_ratio),
            current_ratio => fmt_num(m.current_ratio),
            market_cap => fmt_market_cap(m.market_cap),
            recommendation => m.recommendation,
            news => format_news(&snapshot.news),
            format_instructions => FORMAT_INSTRUCTIONS,
        })
        .context("failed to render analysis prompt")?;
    Ok(rendered)
}

pub fn format_news(news: &[NewsArticle]) -> String {
    if news.is_empty() {
        return "No recent news available.".to_string();
    }

    news.iter()
        .enumerate()
        .map(|(i, a)| format!("{}. {} ({} - {})", i + 1, a.title, a.published, a.publisher))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn fmt_num(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn fmt_market_cap(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };
    let abs = v.abs();
    if abs >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else {
        format!("{v:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::StockMetrics;
    use crate::domain::ticker::Ticker;

    fn snapshot(news: Vec<NewsArticle>) -> FinancialSnapshot {
        let mut metrics = StockMetrics::new(Ticker::parse("AAPL").unwrap(), 189.5);
        metrics.name = "Apple Inc.".to_string();
        metrics.pe_ratio = Some(29.444);
        metrics.market_cap = Some(2.95e12);
        FinancialSnapshot { metrics, news }
    }

    #[test]
    fn prompt_embeds_metrics_and_marks_missing_values() {
        let prompt = render_user_prompt(&snapshot(vec![])).unwrap();
        assert!(prompt.contains("- Ticker: AAPL"));
        assert!(prompt.contains("- Company Name: Apple Inc."));
        assert!(prompt.contains("- Current Price: $189.50"));
        assert!(prompt.contains("- P/E Ratio: 29.44"));
        assert!(prompt.contains("- PEG Ratio: N/A"));
        assert!(prompt.contains("- Market Cap: 2.95T"));
        assert!(prompt.contains("No recent news available."));
        assert!(prompt.ends_with("Use double quotes for all JSON strings."));
    }

    #[test]
    fn prompt_does_not_html_escape() {
        let mut snap = snapshot(vec![]);
        snap.metrics.name = "AT&T <Inc>".to_string();
        let prompt = render_user_prompt(&snap).unwrap();
        assert!(prompt.contains("AT&T <Inc>"));
    }

    #[test]
    fn news_is_numbered() {
        let news = vec![
            NewsArticle {
                title: "First".to_string(),
                publisher: "Reuters".to_string(),
                link: "#".to_string(),
                published: "2025-05-10".to_string(),
            },
            NewsArticle {
                title: "Second".to_string(),
                publisher: "Bloomberg".to_string(),
                link: "#".to_string(),
                published: "N/A".to_string(),
            },
        ];
        assert_eq!(
            format_news(&news),
            "1. First (2025-05-10 - Reuters)\n2. Second (N/A - Bloomberg)"
        );
    }

    #[test]
    fn market_cap_scales() {
        assert_eq!(fmt_market_cap(None), "N/A");
        assert_eq!(fmt_market_cap(Some(3.5e9)), "3.50B");
        assert_eq!(fmt_market_cap(Some(12_500_000.0)), "12.50M");
        assert_eq!(fmt_market_cap(Some(950.0)), "950");
    }
}
