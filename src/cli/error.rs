//! CLI error types and conversions

use crate::fetcher::FetchError;
use crate::harvester::HarvestError;
use crate::metrics::MetricsError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Run error
    #[error("load error: {0}")]
    HarvestError(#[from] HarvestError),

    /// Fetcher setup error
    #[error("fetcher error: {0}")]
    FetchError(#[from] FetchError),

    /// Store setup error
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Metrics exporter error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),
}
