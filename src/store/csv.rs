//! CSV store
//!
//! One row per person, columns in [`PERSON_COLUMNS`] order. Each save is
//! flushed before it returns.

use async_trait::async_trait;
use csv::{Reader, Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{PeopleStore, StorageSetup, StoreError, StoreResult};
use crate::{Person, RecordId, PERSON_COLUMNS};

/// Appends people to a CSV file
pub struct CsvPeopleStore {
    path: PathBuf,
    writer: Mutex<Option<Writer<File>>>,
}

impl CsvPeopleStore {
    /// Store writing to `path`; nothing is opened until [`PeopleStore::prepare`]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PeopleStore for CsvPeopleStore {
    async fn prepare(&self, setup: StorageSetup) -> StoreResult<()> {
        let path = &self.path;

        if setup.drop && path.exists() {
            info!(path = %path.display(), "Dropping existing CSV output");
            std::fs::remove_file(path)
                .map_err(|e| StoreError::Io(format!("Failed to remove {}: {e}", path.display())))?;
        }

        let exists = path.exists();
        if !exists && !setup.create {
            return Err(StoreError::NotPrepared(format!(
                "{} does not exist; run with --create",
                path.display()
            )));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create directory: {e}")))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::Io(format!("Failed to open {}: {e}", path.display())))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if !exists {
            info!(path = %path.display(), "Creating CSV output");
            writer
                .write_record(PERSON_COLUMNS)
                .map_err(|e| StoreError::Csv(format!("Failed to write header: {e}")))?;
            writer
                .flush()
                .map_err(|e| StoreError::Io(format!("Failed to flush: {e}")))?;
        }

        *self.writer.lock().await = Some(writer);
        Ok(())
    }

    async fn save(&self, person: &Person) -> StoreResult<RecordId> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| {
            StoreError::NotPrepared(format!("{} was never prepared", self.path.display()))
        })?;

        writer
            .serialize(person)
            .map_err(|e| StoreError::Csv(format!("Failed to write person {}: {e}", person.id)))?;
        writer
            .flush()
            .map_err(|e| StoreError::Io(format!("Failed to flush: {e}")))?;

        debug!(id = person.id, name = %person.name, "{:>40} - {} written", person.id, person.name);
        Ok(person.id)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Read every person back from a CSV file written by [`CsvPeopleStore`]
pub fn read_people<P: AsRef<Path>>(path: P) -> StoreResult<Vec<Person>> {
    let mut reader = Reader::from_path(path.as_ref())
        .map_err(|e| StoreError::Csv(format!("Failed to open CSV: {e}")))?;

    reader
        .deserialize()
        .map(|row| row.map_err(|e| StoreError::Csv(format!("Failed to read row: {e}"))))
        .collect()
}
