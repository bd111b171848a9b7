//! In-memory store

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{PeopleStore, StorageSetup, StoreError, StoreResult};
use crate::{Person, RecordId};

/// Keeps saved people in save order; rejects a second save of the same ID
#[derive(Debug, Default)]
pub struct MemoryStore {
    people: Mutex<Vec<Person>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of saved people, in save order
    pub async fn people(&self) -> Vec<Person> {
        self.people.lock().await.clone()
    }

    /// Number of people saved
    pub async fn len(&self) -> usize {
        self.people.lock().await.len()
    }

    /// Whether nothing has been saved
    pub async fn is_empty(&self) -> bool {
        self.people.lock().await.is_empty()
    }
}

#[async_trait]
impl PeopleStore for MemoryStore {
    async fn prepare(&self, setup: StorageSetup) -> StoreResult<()> {
        if setup.drop {
            self.people.lock().await.clear();
        }
        Ok(())
    }

    async fn save(&self, person: &Person) -> StoreResult<RecordId> {
        let mut people = self.people.lock().await;
        if people.iter().any(|p| p.id == person.id) {
            return Err(StoreError::Duplicate(person.id));
        }
        people.push(person.clone());
        debug!(id = person.id, name = %person.name, "Person kept in memory");
        Ok(person.id)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
