//! JSON formatter.

use crate::scan::{FixedSource, ScanReport};
use serde::Serialize;

/// Format a scan report as JSON.
pub fn format_scan(report: &ScanReport) -> String {
    let output = JsonReport::from(report);
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Format fix results as JSON.
pub fn format_fixes(fixes: &[FixedSource]) -> String {
    let output: Vec<JsonFixedSource> = fixes.iter().map(JsonFixedSource::from).collect();
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Serialize)]
struct JsonReport {
    sources: Vec<JsonSource>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonSource {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_error: Option<String>,
    findings: Vec<JsonFinding>,
}

#[derive(Serialize)]
struct JsonFinding {
    rule: String,
    severity: String,
    message: String,
    location: String,
    document_index: usize,
}

#[derive(Serialize)]
struct JsonSummary {
    sources_scanned: usize,
    documents_analyzed: usize,
    total_findings: usize,
    parse_failures: usize,
}

impl From<&ScanReport> for JsonReport {
    fn from(report: &ScanReport) -> Self {
        Self {
            sources: report
                .sources
                .iter()
                .map(|source| JsonSource {
                    path: source.path.display().to_string(),
                    parse_error: source.parse_error.clone(),
                    findings: source
                        .documents
                        .iter()
                        .flat_map(|d| d.findings.iter())
                        .map(|f| JsonFinding {
                            rule: f.rule.to_string(),
                            severity: f.severity.to_string(),
                            message: f.message.clone(),
                            location: f.location.to_string(),
                            document_index: f.document.index,
                        })
                        .collect(),
                })
                .collect(),
            summary: JsonSummary {
                sources_scanned: report.summary.sources_scanned,
                documents_analyzed: report.summary.documents_analyzed,
                total_findings: report.summary.total_findings,
                parse_failures: report.summary.parse_failures,
            },
        }
    }
}

#[derive(Serialize)]
struct JsonFixedSource {
    path: String,
    output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    write_error: Option<String>,
    documents: Vec<JsonFixedDocument>,
}

#[derive(Serialize)]
struct JsonFixedDocument {
    round_trips: bool,
    warnings: Vec<String>,
    records: Vec<JsonFixRecord>,
}

#[derive(Serialize)]
struct JsonFixRecord {
    rule: String,
    location: String,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl From<&FixedSource> for JsonFixedSource {
    fn from(source: &FixedSource) -> Self {
        Self {
            path: source.path.display().to_string(),
            output_path: source.output_path.display().to_string(),
            write_error: source.write_error.clone(),
            documents: source
                .fixed
                .iter()
                .map(|fixed| JsonFixedDocument {
                    round_trips: fixed.validation.round_trips,
                    warnings: fixed.validation.warnings.clone(),
                    records: fixed
                        .records
                        .iter()
                        .map(|r| JsonFixRecord {
                            rule: r.finding.rule.to_string(),
                            location: r.finding.location.to_string(),
                            outcome: r.outcome.to_string(),
                            note: r.note.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::scan::scan_content;

    #[test]
    fn test_json_scan_output_is_valid() {
        let report = scan_content(
            "kind: Service\nmetadata:\n  name: s\nspec:\n  type: NodePort\n",
            &ScanConfig::default(),
        )
        .unwrap();
        let rendered = format_scan(&report);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["summary"]["total_findings"], 2);
        assert_eq!(
            parsed["sources"][0]["findings"][0]["rule"],
            "exposed-service-type"
        );
        assert_eq!(parsed["sources"][0]["findings"][0]["severity"], "high");
    }
}
