//! # Kubefix
//!
//! A Rust-based command-line tool that scans Kubernetes YAML manifests for
//! a catalogue of security and best-practice misconfigurations, and
//! optionally rewrites each manifest toward a safer baseline.
//!
//! ## Features
//!
//! - **Rule-based scanning**: seven built-in checks over workloads,
//!   Services, and RBAC manifests
//! - **Deterministic autofix**: canonical structural patches per finding,
//!   with idempotent re-runs
//! - **Optional enrichment**: a pluggable collaborator can pin real image
//!   versions or narrow RBAC rules; the tool is fully functional without it
//! - **Batch-friendly**: a source that fails to parse never aborts the
//!   rest of the batch
//!
//! ## Example
//!
//! ```rust,no_run
//! use kubefix::{config::ScanConfig, scan};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::default();
//! let report = scan::scan(Path::new("./k8s"), &config)?;
//!
//! for finding in report.findings() {
//!     println!("{} [{}] {}", finding.document, finding.severity, finding.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fix;
pub mod manifest;
pub mod report;
pub mod rules;
pub mod scan;
pub mod types;

// Re-export commonly used types and functions
pub use config::ScanConfig;
pub use engine::RuleEngine;
pub use error::{KubefixError, Result};
pub use fix::{FixedDocument, Fixer};
pub use manifest::{FieldPath, ManifestDocument};
pub use scan::{scan, scan_content, ScanReport};
pub use types::{Finding, RuleId, Severity};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
