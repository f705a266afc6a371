use crate::domain::analysis::{AnalysisBatch, Signal, TickerOutcome};
use crate::domain::snapshot::NewsArticle;
use crate::report::DISCLAIMER;
use anyhow::Context;
use minijinja::Environment;
use serde::Serialize;

// The .html suffix turns on minijinja's HTML autoescaping.
const TEMPLATE_NAME: &str = "page.html";

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Stock Pulse - Stock Analysis Tool</title>
<style>
body { font-family: sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
.banner { font-family: monospace; color: #00BFFF; font-size: 2rem; font-weight: bold; }
.signal-BUY { color: green; } .signal-SELL { color: red; } .signal-HOLD { color: orange; }
.error { background: #fdecea; border-left: 4px solid #d32f2f; padding: .5rem 1rem; }
.disclaimer { background: #fff8e1; border-left: 4px solid #f9a825; padding: .5rem 1rem; margin-top: 2rem; }
.columns { display: flex; gap: 2rem; } .columns > div { flex: 1; }
</style>
</head>
<body>
<div class="banner">STOCK PULSE</div>
<h3>Feel the pulse of the market with AI-powered stock insights</h3>
<p>Enter one or more stock ticker symbols separated by commas or spaces.</p>
<form method="get" action="/analyze">
<input type="text" name="tickers" value="{{ tickers_input }}" placeholder="AAPL, MSFT, GOOGL">
<button type="submit">Analyze Stocks</button>
</form>
{% if error %}<div class="error"><strong>Error:</strong> {{ error }}</div>{% endif %}
{% for r in results %}
<section>
{% if r.success %}
<h2>{{ r.ticker }}: {{ r.name }}</h2>
<h3 class="signal-{{ r.signal }}">Signal: {{ r.signal }}</h3>
<p><strong>Reasoning:</strong> {{ r.reasoning }}</p>
<div class="columns">
<div><strong>Key Factors:</strong><ul>{% for f in r.key_factors %}<li>{{ f }}</li>{% endfor %}</ul></div>
<div><strong>Risks:</strong><ul>{% for k in r.risks %}<li>{{ k }}</li>{% endfor %}</ul></div>
</div>
<h4>Recent News</h4>
{% if r.news %}<ol>{% for a in r.news %}<li><a href="{{ a.link }}">{{ a.title }}</a> <small>{{ a.published }} - {{ a.publisher }}</small></li>{% endfor %}</ol>
{% else %}<p>No recent news available.</p>{% endif %}
{% else %}
<div class="error"><strong>Error analyzing {{ r.ticker }}:</strong> {{ r.error }}</div>
{% endif %}
</section>
<hr>
{% endfor %}
{% if results %}<p>Analysis complete!</p>{% endif %}
<div class="disclaimer">{{ disclaimer }}</div>
</body>
</html>
"#;

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub tickers_input: String,
    pub error: Option<String>,
    pub results: Vec<ResultView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub ticker: String,
    pub name: String,
    pub success: bool,
    pub signal: Option<Signal>,
    pub reasoning: String,
    pub key_factors: Vec<String>,
    pub risks: Vec<String>,
    pub news: Vec<NewsArticle>,
    pub error: Option<String>,
}

impl PageView {
    pub fn new(tickers_input: impl Into<String>) -> Self {
        Self {
            tickers_input: tickers_input.into(),
            error: None,
            results: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_batch(mut self, batch: &AnalysisBatch) -> Self {
        self.results = batch.outcomes.iter().map(ResultView::from).collect();
        self
    }
}

impl From<&TickerOutcome> for ResultView {
    fn from(outcome: &TickerOutcome) -> Self {
        match outcome {
            TickerOutcome::Analyzed(report) => Self {
                ticker: report.ticker.to_string(),
                name: report.name.clone(),
                success: true,
                signal: Some(report.analysis.signal),
                reasoning: report.analysis.reasoning.clone(),
                key_factors: report.analysis.key_factors.clone(),
                risks: report.analysis.risks.clone(),
                news: report.news.iter().map(linkable).collect(),
                error: None,
            },
            TickerOutcome::Failed(failure) => Self {
                ticker: failure.ticker.to_string(),
                name: failure.display_name().to_string(),
                success: false,
                signal: None,
                reasoning: String::new(),
                key_factors: Vec::new(),
                risks: Vec::new(),
                news: Vec::new(),
                error: Some(format!("{}: {}", failure.stage.label(), failure.error)),
            },
        }
    }
}

/// Autoescaping does not neutralize URL schemes, so only web links stay clickable.
fn linkable(article: &NewsArticle) -> NewsArticle {
    let link = article.link.trim();
    let is_web = ["http://", "https://"].iter().any(|scheme| {
        link.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    NewsArticle {
        link: if is_web { link.to_string() } else { "#".to_string() },
        ..article.clone()
    }
}

pub fn render_page(view: &PageView) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, PAGE_TEMPLATE)
        .context("invalid page template")?;
    let template = env.get_template(TEMPLATE_NAME)?;
    template
        .render(minijinja::context! {
            tickers_input => view.tickers_input,
            error => view.error,
            results => view.results,
            disclaimer => DISCLAIMER,
        })
        .context("failed to render page")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn empty_form_has_no_results() {
        let html = render_page(&PageView::new("")).unwrap();
        assert!(html.contains("<form method=\"get\" action=\"/analyze\">"));
        assert!(!html.contains("Analysis complete!"));
        assert!(html.contains("DISCLAIMER:"));
    }

    #[test]
    fn renders_success_and_failure_sections() {
        let view = PageView::new("AAPL ZZZZ").with_batch(&fixtures::batch());
        let html = render_page(&view).unwrap();
        assert!(html.contains("<h2>AAPL: Apple Inc.</h2>"));
        assert!(html.contains("class=\"signal-BUY\">Signal: BUY</h3>"));
        assert!(html.contains("<li>Share buybacks</li>"));
        // minijinja escapes '/' inside expressions as well.
        assert!(html.contains("<a href=\"https:&#x2f;&#x2f;example.com&#x2f;apple\">Apple beats estimates</a>"));
        assert!(html.contains("Error analyzing ZZZZ:</strong> fetch failed: unknown ticker: ZZZZ"));
        assert!(html.contains("value=\"AAPL ZZZZ\""));
        assert!(html.contains("Analysis complete!"));
    }

    #[test]
    fn non_web_news_links_are_not_clickable() {
        let mut batch = fixtures::batch();
        if let TickerOutcome::Analyzed(report) = &mut batch.outcomes[0] {
            report.news[0].link = " JavaScript:alert(1)".to_string();
            let mut second = report.news[0].clone();
            second.title = "Data URL".to_string();
            second.link = "data:text/html,<script>alert(1)</script>".to_string();
            report.news.push(second);
        }

        let html = render_page(&PageView::new("AAPL").with_batch(&batch)).unwrap();
        assert!(!html.to_ascii_lowercase().contains("javascript:"));
        assert!(!html.contains("data:text"));
        assert!(html.contains("<a href=\"#\">Apple beats estimates</a>"));
        assert!(html.contains("<a href=\"#\">Data URL</a>"));
    }

    #[test]
    fn web_links_pass_through_regardless_of_scheme_case() {
        let article = NewsArticle {
            title: "t".to_string(),
            publisher: "p".to_string(),
            link: "HTTPS://example.com/x".to_string(),
            published: "N/A".to_string(),
        };
        assert_eq!(linkable(&article).link, "HTTPS://example.com/x");
    }

    #[test]
    fn user_and_model_text_is_escaped() {
        let view = PageView::new("\"><script>alert(1)</script>")
            .with_error("<b>OPENAI_API_KEY is required</b>");
        let html = render_page(&view).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;OPENAI_API_KEY is required&lt;&#x2f;b&gt;"));
    }
}
