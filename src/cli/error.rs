//! CLI error types and conversions

use crate::exporter::ExportError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::snapshot::SnapshotError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Snapshot error
    #[error("snapshot error: {0}")]
    SnapshotError(#[from] SnapshotError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl From<FetcherError> for CliError {
    fn from(e: FetcherError) -> Self {
        Self::ExportError(ExportError::from(e))
    }
}
