use crate::report::OutputFormat;
use crate::types::Severity;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kubefix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan Kubernetes manifests for misconfigurations and fix them")]
#[command(
    long_about = "A CLI tool that scans Kubernetes YAML manifests for a catalogue of security \
                  and best-practice misconfigurations, and optionally rewrites them toward a \
                  safer baseline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (defaults to .kubefix.yaml if present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan manifests and report findings
    Scan {
        /// Manifest file or directory to scan
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "plain")]
        format: ReportFormat,

        /// Fail (exit 1) only for findings at or above this severity
        #[arg(long, value_enum)]
        threshold: Option<SeverityThreshold>,

        /// Never return a non-zero exit code for findings
        #[arg(long)]
        no_fail: bool,
    },

    /// Scan manifests, then write fixed copies as <stem>_fixed.<ext>
    Fix {
        /// Manifest file or directory to fix
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Directory for fixed output files (defaults to next to each source)
        #[arg(short, long, value_name = "OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Show what would change without writing files
        #[arg(long)]
        dry_run: bool,

        /// Consult the configured enrichment endpoint for image pins and
        /// RBAC narrowing
        #[arg(long)]
        enrich: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "plain")]
        format: ReportFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Plain,
    Json,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Plain => OutputFormat::Plain,
            ReportFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityThreshold {
    Low,
    Medium,
    High,
}

impl From<SeverityThreshold> for Severity {
    fn from(threshold: SeverityThreshold) -> Self {
        match threshold {
            SeverityThreshold::Low => Severity::Low,
            SeverityThreshold::Medium => Severity::Medium,
            SeverityThreshold::High => Severity::High,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
