//! Report rendering for scan and fix results.
//!
//! The report structure itself lives in [`crate::scan`]; these formatters
//! consume it read-only.

pub mod json;
pub mod plain;

use crate::scan::{FixedSource, ScanReport};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Colored plain text.
    #[default]
    Plain,
    /// JSON.
    Json,
}

impl OutputFormat {
    /// Parse from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Some(Self::Plain),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Format a scan report to a string.
pub fn format_scan(report: &ScanReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => plain::format_scan(report),
        OutputFormat::Json => json::format_scan(report),
    }
}

/// Format fix results to a string.
pub fn format_fixes(fixes: &[FixedSource], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => plain::format_fixes(fixes),
        OutputFormat::Json => json::format_fixes(fixes),
    }
}
