//! Scan orchestration: source discovery, per-document evaluation, and the
//! optional fix pass.
//!
//! Failures local to one source never abort the batch: an unparsable file
//! contributes a parse diagnostic and its siblings are still processed.

use crate::config::ScanConfig;
use crate::engine::RuleEngine;
use crate::error::{ConfigError, KubefixError};
use crate::fix::{FixedDocument, Fixer};
use crate::manifest::ManifestDocument;
use crate::types::{Finding, Severity};

use std::path::{Path, PathBuf};

/// Scan results for one source file.
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// The source file.
    pub path: PathBuf,
    /// Documents parsed from the source, with their findings.
    pub documents: Vec<DocumentReport>,
    /// Parse diagnostic if the source could not be read or parsed.
    pub parse_error: Option<String>,
}

/// One document and the findings it produced.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    /// The parsed document.
    pub document: ManifestDocument,
    /// Findings, in rule-definition then traversal order.
    pub findings: Vec<Finding>,
}

/// Aggregate results of a scan pass.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Per-source results, ordered by source path.
    pub sources: Vec<SourceReport>,
    /// Run summary.
    pub summary: ScanSummary,
}

/// Summary of a scan run.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Number of sources scanned.
    pub sources_scanned: usize,
    /// Number of documents analyzed.
    pub documents_analyzed: usize,
    /// Number of findings across all documents.
    pub total_findings: usize,
    /// Number of sources that failed to parse.
    pub parse_failures: usize,
}

impl ScanReport {
    /// Iterate over all findings in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.sources
            .iter()
            .flat_map(|s| s.documents.iter())
            .flat_map(|d| d.findings.iter())
    }

    /// The highest severity present, if any findings exist.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings().map(|f| f.severity).max()
    }

    /// Whether the run should exit non-zero under the given config.
    pub fn should_fail(&self, config: &ScanConfig) -> bool {
        if config.no_fail {
            return false;
        }
        match self.max_severity() {
            Some(max) => max >= config.failure_threshold,
            None => false,
        }
    }

    /// Whether any source failed to parse.
    pub fn has_parse_errors(&self) -> bool {
        self.summary.parse_failures > 0
    }
}

/// Expand a path into scannable sources.
///
/// A file is returned as-is; a directory expands to every `.yaml`/`.yml`
/// file beneath it, sorted by path so aggregation order is deterministic
/// regardless of filesystem order.
pub fn collect_sources(path: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    if path.is_dir() {
        for entry in walkdir::WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if !entry_path.is_file() {
                continue;
            }
            let ext = entry_path.extension().and_then(|e| e.to_str());
            if matches!(ext, Some("yaml") | Some("yml")) {
                sources.push(entry_path.to_path_buf());
            }
        }
        sources.sort();
    } else {
        sources.push(path.to_path_buf());
    }

    sources.retain(|p| !config.should_ignore_path(p));
    sources
}

/// Scan a file or directory.
///
/// Only configuration problems (an incomplete severity table, a bad
/// config) abort the run; everything source-local is recorded in the
/// report.
pub fn scan(path: &Path, config: &ScanConfig) -> Result<ScanReport, ConfigError> {
    let engine = RuleEngine::new(config)?;
    let sources = collect_sources(path, config);

    let mut report = ScanReport {
        sources: Vec::new(),
        summary: ScanSummary {
            sources_scanned: sources.len(),
            documents_analyzed: 0,
            total_findings: 0,
            parse_failures: 0,
        },
    };

    for source in sources {
        let source_report = scan_source(&source, &engine);
        if source_report.parse_error.is_some() {
            report.summary.parse_failures += 1;
        }
        report.summary.documents_analyzed += source_report.documents.len();
        report.summary.total_findings += source_report
            .documents
            .iter()
            .map(|d| d.findings.len())
            .sum::<usize>();
        report.sources.push(source_report);
    }

    Ok(report)
}

/// Scan YAML content directly (used by tests and library callers).
pub fn scan_content(content: &str, config: &ScanConfig) -> Result<ScanReport, ConfigError> {
    let engine = RuleEngine::new(config)?;
    let mut report = ScanReport {
        sources: Vec::new(),
        summary: ScanSummary {
            sources_scanned: 1,
            documents_analyzed: 0,
            total_findings: 0,
            parse_failures: 0,
        },
    };

    let source_report = match ManifestDocument::parse_str(content, "<input>") {
        Ok(documents) => evaluate_documents(PathBuf::from("<input>"), documents, &engine),
        Err(e) => {
            report.summary.parse_failures = 1;
            SourceReport {
                path: PathBuf::from("<input>"),
                documents: Vec::new(),
                parse_error: Some(e.to_string()),
            }
        }
    };

    report.summary.documents_analyzed = source_report.documents.len();
    report.summary.total_findings = source_report
        .documents
        .iter()
        .map(|d| d.findings.len())
        .sum();
    report.sources.push(source_report);
    Ok(report)
}

fn scan_source(path: &Path, engine: &RuleEngine) -> SourceReport {
    match ManifestDocument::parse_file(path) {
        Ok(documents) => evaluate_documents(path.to_path_buf(), documents, engine),
        Err(e) => {
            log::warn!("{}: {}", path.display(), e);
            SourceReport {
                path: path.to_path_buf(),
                documents: Vec::new(),
                parse_error: Some(e.to_string()),
            }
        }
    }
}

fn evaluate_documents(
    path: PathBuf,
    documents: Vec<ManifestDocument>,
    engine: &RuleEngine,
) -> SourceReport {
    let documents = documents
        .into_iter()
        .map(|document| {
            let findings = engine.evaluate(&document);
            DocumentReport { document, findings }
        })
        .collect();
    SourceReport {
        path,
        documents,
        parse_error: None,
    }
}

/// Fix results for one source.
#[derive(Debug)]
pub struct FixedSource {
    /// The original source file.
    pub path: PathBuf,
    /// Where the fixed output was (or would be) written.
    pub output_path: PathBuf,
    /// Fixed documents, one per parsed document.
    pub fixed: Vec<FixedDocument>,
    /// Error writing the output, if any. The fix results are still
    /// reported.
    pub write_error: Option<String>,
}

/// Run the fixer over every document of a scan report and write one fixed
/// manifest per source, named `<stem>_fixed.<ext>`.
///
/// Sources that failed to parse are skipped; write failures are recorded
/// per source and never abort the batch.
pub fn fix_sources(
    report: &ScanReport,
    fixer: &Fixer,
    output_dir: Option<&Path>,
    dry_run: bool,
) -> Result<Vec<FixedSource>, KubefixError> {
    let mut out = Vec::new();

    for source in &report.sources {
        if source.parse_error.is_some() {
            continue;
        }

        let fixed: Vec<FixedDocument> = source
            .documents
            .iter()
            .map(|d| fixer.fix(&d.document, &d.findings))
            .collect();

        let output_path = fixed_output_path(&source.path, output_dir);
        let mut write_error = None;

        if !dry_run {
            match render_fixed(&fixed) {
                Ok(content) => {
                    if let Err(e) = std::fs::write(&output_path, content) {
                        log::error!("failed to write {}: {}", output_path.display(), e);
                        write_error = Some(e.to_string());
                    } else {
                        log::info!("wrote {}", output_path.display());
                    }
                }
                Err(e) => write_error = Some(e),
            }
        }

        out.push(FixedSource {
            path: source.path.clone(),
            output_path,
            fixed,
            write_error,
        });
    }

    Ok(out)
}

fn render_fixed(fixed: &[FixedDocument]) -> Result<String, String> {
    let mut parts = Vec::new();
    for doc in fixed {
        parts.push(doc.document.to_yaml().map_err(|e| e.to_string())?);
    }
    Ok(parts.join("---\n"))
}

/// `<stem>_fixed.<ext>` next to the source, or under `output_dir`.
fn fixed_output_path(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("manifest");
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");
    let file_name = format!("{}_fixed.{}", stem, ext);

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => source.with_file_name(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_content_reports_findings() {
        let report = scan_content(
            "kind: Service\nmetadata:\n  name: s\nspec:\n  type: LoadBalancer\n",
            &ScanConfig::default(),
        )
        .unwrap();
        assert_eq!(report.summary.documents_analyzed, 1);
        let ids: Vec<&str> = report.findings().map(|f| f.rule.as_str()).collect();
        assert_eq!(ids, vec!["exposed-service-type", "missing-namespace"]);
    }

    #[test]
    fn test_scan_content_parse_error() {
        let report = scan_content("kind: Pod\n  bad indent: [\n", &ScanConfig::default()).unwrap();
        assert_eq!(report.summary.parse_failures, 1);
        assert!(report.sources[0].parse_error.is_some());
        assert!(report.findings().next().is_none());
    }

    #[test]
    fn test_should_fail_respects_threshold_and_no_fail() {
        let report = scan_content(
            "kind: Pod\nmetadata:\n  name: p\n  namespace: n\nspec:\n  containers:\n  - name: a\n    image: a:latest\n    securityContext:\n      runAsNonRoot: true\n    resources:\n      requests: {cpu: 1m, memory: 1Mi}\n      limits: {cpu: 1m, memory: 1Mi}\n",
            &ScanConfig::default(),
        )
        .unwrap();
        // Only the Low-severity latest-tag finding remains.
        assert_eq!(report.max_severity(), Some(Severity::Low));

        assert!(report.should_fail(&ScanConfig::default()));
        assert!(!report.should_fail(&ScanConfig::default().with_threshold(Severity::High)));

        let mut lenient = ScanConfig::default();
        lenient.no_fail = true;
        assert!(!report.should_fail(&lenient));
    }

    #[test]
    fn test_fixed_output_path() {
        assert_eq!(
            fixed_output_path(Path::new("k8s/deploy.yaml"), None),
            Path::new("k8s/deploy_fixed.yaml")
        );
        assert_eq!(
            fixed_output_path(Path::new("deploy.yml"), Some(Path::new("out"))),
            Path::new("out/deploy_fixed.yml")
        );
    }
}
