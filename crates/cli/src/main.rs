use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use stockpulse_core::analyzer::Analyzer;
use stockpulse_core::domain::ticker::Ticker;
use stockpulse_core::market::YahooFinanceProvider;
use stockpulse_core::report::{json, text};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BANNER: &str = "
███████╗████████╗ ██████╗  ██████╗██╗  ██╗    ██████╗ ██╗   ██╗██╗     ███████╗███████╗
██╔════╝╚══██╔══╝██╔═══██╗██╔════╝██║ ██╔╝    ██╔══██╗██║   ██║██║     ██╔════╝██╔════╝
███████╗   ██║   ██║   ██║██║     █████╔╝     ██████╔╝██║   ██║██║     ███████╗█████╗
╚════██║   ██║   ██║   ██║██║     ██╔═██╗     ██╔═══╝ ██║   ██║██║     ╚════██║██╔══╝
███████║   ██║   ╚██████╔╝╚██████╗██║  ██╗    ██║     ╚██████╔╝███████╗███████║███████╗
╚══════╝   ╚═╝    ╚═════╝  ╚═════╝╚═╝  ╚═╝    ╚═╝      ╚═════╝ ╚══════╝╚══════╝╚══════╝
";

#[derive(Debug, Parser)]
#[command(
    name = "stockpulse",
    about = "Stock Pulse - Feel the pulse of the market with AI-powered stock insights"
)]
struct Args {
    /// Stock ticker symbols to analyze (e.g. AAPL MSFT GOOGL)
    #[arg(required = true, value_name = "TICKER")]
    tickers: Vec<String>,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Skip the ASCII banner
    #[arg(long)]
    no_banner: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "stockpulse run failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = stockpulse_core::config::Settings::from_env()?;
    // Held until the process exits so buffered events get flushed.
    let _sentry_guard = init_sentry(&settings);

    // stdout is reserved for results.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    if !args.json && !args.no_banner {
        println!("{BANNER}");
    }

    let tickers = parse_tickers(&args.tickers)?;

    // Builds the LLM client first: a missing key must fail before any network call.
    let llm = stockpulse_core::llm::client_from_settings(&settings)?;
    let market = Arc::new(YahooFinanceProvider::from_settings(&settings)?);
    let analyzer = Analyzer::new(market, llm);

    tracing::info!(count = tickers.len(), "analyzing stocks");
    let batch = analyzer.analyze_tickers(&tickers).await;

    if args.json {
        println!("{}", json::render_json(&batch)?);
    } else {
        println!("Stock Analysis Results");
        println!("{}", text::render_summary_table(&batch));
        println!();
        print!("{}", text::render_details(&batch));
        println!();
        print!("{}", text::render_disclaimer());
    }

    Ok(if batch.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn parse_tickers(raw: &[String]) -> anyhow::Result<Vec<Ticker>> {
    let tickers = Ticker::parse_list(&raw.join(" "))?;
    anyhow::ensure!(!tickers.is_empty(), "at least one ticker is required");
    Ok(tickers)
}

fn init_sentry(settings: &stockpulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
