//! Plain text formatter.

use crate::scan::{FixedSource, ScanReport};
use crate::types::Severity;
use colored::Colorize;

fn severity_tag(severity: Severity) -> String {
    let tag = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::High => tag.red().bold().to_string(),
        Severity::Medium => tag.yellow().to_string(),
        Severity::Low => tag.blue().to_string(),
    }
}

/// Format a scan report as plain text, grouped by source.
pub fn format_scan(report: &ScanReport) -> String {
    let mut output = String::new();

    for source in &report.sources {
        if let Some(ref error) = source.parse_error {
            output.push_str(&format!(
                "{}: {} {}\n",
                source.path.display(),
                "[PARSE ERROR]".red().bold(),
                error
            ));
            continue;
        }

        for doc in &source.documents {
            for finding in &doc.findings {
                output.push_str(&format!(
                    "{}: {} {} ({}) - {}\n",
                    finding.document,
                    severity_tag(finding.severity),
                    finding.rule,
                    finding.location,
                    finding.message,
                ));
            }
        }
    }

    if report.summary.total_findings == 0 && report.summary.parse_failures == 0 {
        output.push_str("No issues found.\n");
    } else {
        output.push_str(&format!(
            "\nScanned {} document(s) in {} source(s): {} finding(s), {} parse failure(s).\n",
            report.summary.documents_analyzed,
            report.summary.sources_scanned,
            report.summary.total_findings,
            report.summary.parse_failures,
        ));
    }

    output
}

/// Format fix results as plain text.
pub fn format_fixes(fixes: &[FixedSource]) -> String {
    let mut output = String::new();

    for source in fixes {
        output.push_str(&format!(
            "{} -> {}\n",
            source.path.display(),
            source.output_path.display()
        ));

        for fixed in &source.fixed {
            for record in &fixed.records {
                output.push_str(&format!(
                    "  {} {}: {}",
                    severity_tag(record.finding.severity),
                    record.finding.rule,
                    record.outcome,
                ));
                if let Some(ref note) = record.note {
                    output.push_str(&format!(" ({})", note));
                }
                output.push('\n');
            }
            if !fixed.validation.round_trips {
                output.push_str(&format!(
                    "  {} fixed document failed validation; emitted best-effort output\n",
                    "[WARNING]".yellow()
                ));
            }
            for warning in &fixed.validation.warnings {
                output.push_str(&format!("  {} {}\n", "[WARNING]".yellow(), warning));
            }
        }

        if let Some(ref error) = source.write_error {
            output.push_str(&format!(
                "  {} could not write output: {}\n",
                "[ERROR]".red(),
                error
            ));
        }
    }

    if fixes.is_empty() {
        output.push_str("Nothing to fix.\n");
    }

    output
}
