//! Error types for kubefix.
//!
//! The taxonomy mirrors how failures propagate: per-source parse problems
//! are recovered and recorded in the report, enrichment failures degrade to
//! deterministic fixes, and only configuration problems abort a run.

use thiserror::Error;

/// A manifest source failed to parse. Recovered per source; the batch
/// continues with the remaining sources.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The source could not be read.
    #[error("I/O error: {0}")]
    Io(String),

    /// The YAML itself is malformed.
    #[error("YAML syntax error: {0}")]
    Syntax(String),

    /// The document parsed but its top level is not a mapping.
    #[error("malformed structure: {0}")]
    MalformedStructure(String),
}

/// Configuration problems. These are fatal and abort before any document
/// is processed.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// I/O error reading a config file.
    #[error("I/O error reading config: {0}")]
    Io(String),

    /// Config file did not parse.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A catalogued rule has no severity entry. Indicates a programming
    /// defect in the rule catalogue, not a problem with user input.
    #[error("rule '{0}' has no severity entry")]
    MissingSeverity(String),
}

/// The enrichment collaborator could not supply a suggestion or patch
/// proposal. Always recovered: the fixer falls back to its deterministic
/// default and surfaces the reason as an informational note.
#[derive(Debug, Clone, Error)]
pub enum EnrichmentUnavailable {
    /// No enrichment client is configured (the offline default).
    #[error("enrichment not configured")]
    Disabled,

    /// The request exceeded the configured timeout.
    #[error("enrichment request timed out")]
    Timeout,

    /// The request failed at the transport or HTTP level.
    #[error("enrichment request failed: {0}")]
    Http(String),

    /// The collaborator answered, but with data we refuse to apply.
    #[error("enrichment returned invalid data: {0}")]
    InvalidResponse(String),
}

/// A patched document failed to round-trip through the serializer.
/// Recovered: the best-effort document is still emitted with a warning.
#[derive(Debug, Clone, Error)]
#[error("fixed document failed validation: {0}")]
pub struct FixValidationError(pub String);

/// Top-level error type for the CLI entry points.
#[derive(Debug, Error)]
pub enum KubefixError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KubefixError>;
