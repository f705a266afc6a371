use crate::domain::analysis::{AnalysisBatch, TickerOutcome};
use crate::report::JSON_DISCLAIMER;
use anyhow::Context;
use serde::ser::{Serialize, Serializer};

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    results: Results<'a>,
    disclaimer: &'static str,
}

/// Ticker-keyed object that keeps the batch order.
struct Results<'a>(&'a [TickerOutcome]);

impl Serialize for Results<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|outcome| {
            (
                outcome.ticker().as_str(),
                JsonEntry {
                    success: outcome.is_success(),
                    outcome,
                },
            )
        }))
    }
}

#[derive(serde::Serialize)]
struct JsonEntry<'a> {
    success: bool,
    #[serde(flatten)]
    outcome: &'a TickerOutcome,
}

pub fn render_json(batch: &AnalysisBatch) -> anyhow::Result<String> {
    let report = JsonReport {
        results: Results(&batch.outcomes),
        disclaimer: JSON_DISCLAIMER,
    };
    serde_json::to_string_pretty(&report).context("failed to serialize analysis report")
}
