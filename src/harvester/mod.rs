//! Batch orchestration
//!
//! The harvester walks the ID space of the people collection in fixed-width
//! windows until as many records have been persisted as the collection reports.
//!
//! 1. **Discovery**: read `count` from the collection endpoint once
//! 2. **Windows**: assemble every ID of [`window::IdWindow`] concurrently
//! 3. **Persistence**: save each found person as soon as it is assembled
//! 4. **Completion**: stop once the found tally reaches `count`
//!
//! # Error Handling
//!
//! Fetch exhaustion and store failures end the run with [`HarvestError`]; people
//! saved before the failure stay saved.

use crate::fetcher::FetchError;
use crate::store::StoreError;

pub mod config;
pub mod driver;
pub mod window;

pub use config::HarvestConfig;
pub use driver::{BatchDriver, RunSummary};
pub use window::IdWindow;

/// Run errors
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Fetch outside of any single record (count discovery)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Assembly of one record failed
    #[error("record {id} could not be assembled: {source}")]
    Record {
        /// ID being assembled
        id: u32,
        /// Underlying fetch failure
        source: FetchError,
    },

    /// The store refused a record
    #[error("record {id} could not be persisted: {source}")]
    Persist {
        /// ID being saved
        id: u32,
        /// Underlying store failure
        source: StoreError,
    },

    /// Settings that cannot drive a run
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Too many consecutive windows without a record
    #[error("stalled after id {last_id}: {processed} of {expected} records found")]
    Stalled {
        /// Records persisted so far
        processed: u64,
        /// Count reported by the collection
        expected: u64,
        /// Last ID scanned
        last_id: u32,
    },

    /// Shutdown was requested between windows
    #[error("cancelled after {processed} records")]
    Cancelled {
        /// Records persisted before cancellation
        processed: u64,
    },
}

impl HarvestError {
    /// ID of the record involved, if the failure belongs to one
    pub fn record_id(&self) -> Option<u32> {
        match self {
            HarvestError::Record { id, .. } | HarvestError::Persist { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Result type for harvester operations
pub type HarvestResult<T> = Result<T, HarvestError>;
