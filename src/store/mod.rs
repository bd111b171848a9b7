//! Persistence collaborators
//!
//! The loader only needs `save`; `prepare` applies the drop/create setup flags
//! before a run starts.

use async_trait::async_trait;

use crate::{Person, RecordId};

pub mod csv;
pub mod memory;
pub mod sqlite;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Storage was used before being prepared, or does not exist
    #[error("storage not prepared: {0}")]
    NotPrepared(String),

    /// A person with this ID was already saved
    #[error("duplicate record id {0}")]
    Duplicate(RecordId),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage setup flags applied before a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageSetup {
    /// Remove any existing storage first
    pub drop: bool,
    /// Create storage when it does not exist
    pub create: bool,
}

impl StorageSetup {
    /// Drop then create: start from empty storage
    pub fn fresh() -> Self {
        Self {
            drop: true,
            create: true,
        }
    }

    /// Use storage as it is
    pub fn existing() -> Self {
        Self::default()
    }
}

/// Destination for resolved people
#[async_trait]
pub trait PeopleStore: Send + Sync {
    /// Apply drop/create setup
    async fn prepare(&self, setup: StorageSetup) -> StoreResult<()>;

    /// Persist one person durably
    async fn save(&self, person: &Person) -> StoreResult<RecordId>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}
