//! Renders an [`AnalysisBatch`](crate::domain::analysis::AnalysisBatch) for the console,
//! as JSON, or as the web UI page.

pub mod html;
pub mod json;
pub mod text;

pub const DISCLAIMER: &str = "DISCLAIMER: The analysis provided by Stock Pulse is for informational purposes only and does not \
constitute investment advice. Stock market investments involve risk, and past performance is not indicative of \
future results. Always conduct your own research and consult with a qualified financial advisor before making \
investment decisions.";

pub const JSON_DISCLAIMER: &str = "DISCLAIMER: The analysis provided is for informational purposes only and does not \
constitute investment advice. Always conduct your own research and consult with a qualified financial advisor \
before making investment decisions.";
