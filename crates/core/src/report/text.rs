use crate::domain::analysis::{AnalysisBatch, Signal, TickerOutcome};
use crate::report::DISCLAIMER;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use std::fmt::Write as _;

const RULE_WIDTH: usize = 80;

fn signal_color(signal: Signal) -> Color {
    match signal {
        Signal::Buy => Color::Green,
        Signal::Sell => Color::Red,
        Signal::Hold => Color::Yellow,
    }
}

/// One row per ticker. Cells are colored only when stdout is a terminal.
pub fn render_summary_table(batch: &AnalysisBatch) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Ticker", "Company", "Signal", "Reasoning"]);

    for outcome in &batch.outcomes {
        match outcome {
            TickerOutcome::Analyzed(report) => {
                let signal = report.analysis.signal;
                table.add_row(vec![
                    Cell::new(report.ticker.as_str()).fg(Color::Cyan),
                    Cell::new(&report.name).fg(Color::Magenta),
                    Cell::new(signal.as_str())
                        .fg(signal_color(signal))
                        .add_attribute(Attribute::Bold),
                    Cell::new(&report.analysis.reasoning),
                ]);
            }
            TickerOutcome::Failed(failure) => {
                table.add_row(vec![
                    Cell::new(failure.ticker.as_str()).fg(Color::Cyan),
                    Cell::new(failure.display_name()).fg(Color::Magenta),
                    Cell::new("ERROR")
                        .fg(Color::Red)
                        .add_attribute(Attribute::Bold),
                    Cell::new(format!("{}: {}", failure.stage.label(), failure.error)),
                ]);
            }
        }
    }

    table.to_string()
}

/// Per-ticker detail blocks for analyzed tickers. Plain text, no styling.
pub fn render_details(batch: &AnalysisBatch) -> String {
    let mut out = String::new();
    for report in batch.reports() {
        let analysis = &report.analysis;
        let _ = writeln!(out, "{}: {}", report.ticker, report.name);
        let _ = writeln!(out, "Signal: {}", analysis.signal);
        let _ = writeln!(out, "Reasoning: {}", analysis.reasoning);

        out.push_str("Key Factors:\n");
        push_bullets(&mut out, &analysis.key_factors);
        out.push_str("Risks:\n");
        push_bullets(&mut out, &analysis.risks);

        if report.news.is_empty() {
            out.push_str("\nRecent News: No news available.\n");
        } else {
            out.push_str("\nRecent News:\n");
            for article in &report.news {
                let _ = writeln!(
                    out,
                    "  [{}] {}: {}",
                    article.published, article.publisher, article.title
                );
                let _ = writeln!(out, "    {}", article.link);
            }
        }

        out.push_str(&"─".repeat(RULE_WIDTH));
        out.push('\n');
    }
    out
}

pub fn render_disclaimer() -> String {
    format!("{DISCLAIMER}\n")
}

fn push_bullets(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("  (none)\n");
        return;
    }
    for item in items {
        let _ = writeln!(out, "  • {item}");
    }
}
