//! SQLite-backed people table.
//!
//! Usage:
//! ```ignore
//! let store = SqlitePeopleStore::open("people.db").await?;
//! store.prepare(StorageSetup::fresh()).await?;
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{PeopleStore, StorageSetup, StoreError, StoreResult};
use crate::{Person, RecordId, PERSON_COLUMNS};

const DROP_TABLE: &str = "DROP TABLE IF EXISTS people";

const TABLE_EXISTS: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'people'";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY,
    birth_year VARCHAR(16),
    eye_color VARCHAR(128),
    films TEXT,
    gender VARCHAR(128),
    hair_color VARCHAR(128),
    height VARCHAR(16),
    homeworld VARCHAR(128),
    mass VARCHAR(16),
    name VARCHAR(128),
    skin_color VARCHAR(128),
    species TEXT,
    starships TEXT,
    vehicles TEXT
)
"#;

fn db_error(context: &str, e: sqlx::Error) -> StoreError {
    StoreError::Database(format!("{context}: {e}"))
}

/// People table in a single SQLite file
#[derive(Clone)]
pub struct SqlitePeopleStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqlitePeopleStore {
    /// Open (or create) the database file at `path`
    ///
    /// The table itself is only created by [`PeopleStore::prepare`].
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(format!("Failed to create directory: {e}")))?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| db_error("failed to open database", e))?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Every stored person, ordered by ID
    pub async fn fetch_all(&self) -> StoreResult<Vec<Person>> {
        let sql = format!("SELECT {} FROM people ORDER BY id", PERSON_COLUMNS.join(", "));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to read people", e))?;

        rows.iter()
            .map(person_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| db_error("failed to decode person", e))
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        let row = sqlx::query(TABLE_EXISTS)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to inspect schema", e))?;
        Ok(row.is_some())
    }

    /// Number of stored people
    pub async fn count(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM people")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("failed to count people", e))?;
        let n: i64 = row.try_get("n").map_err(|e| db_error("failed to count people", e))?;
        Ok(n.max(0) as u64)
    }
}

#[async_trait]
impl PeopleStore for SqlitePeopleStore {
    async fn prepare(&self, setup: StorageSetup) -> StoreResult<()> {
        if setup.drop {
            info!("Dropping tables...");
            sqlx::query(DROP_TABLE)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("failed to drop people table", e))?;
        }
        if setup.create {
            info!("Creating tables...");
            sqlx::query(CREATE_TABLE)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("failed to create people table", e))?;
        } else if !self.table_exists().await? {
            return Err(StoreError::NotPrepared(format!(
                "{} has no people table; run with --create",
                self.path.display()
            )));
        }
        Ok(())
    }

    async fn save(&self, person: &Person) -> StoreResult<RecordId> {
        let placeholders = vec!["?"; PERSON_COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO people ({}) VALUES ({placeholders})",
            PERSON_COLUMNS.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(i64::from(person.id));
        for column in &PERSON_COLUMNS[1..] {
            query = query.bind(person.column(column).unwrap_or_default());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("failed to begin transaction", e))?;
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error(&format!("failed to insert person {}", person.id), e))?;
        tx.commit()
            .await
            .map_err(|e| db_error("failed to commit transaction", e))?;

        debug!(id = person.id, "{:>40} - {} written", person.id, person.name);
        Ok(person.id)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

fn person_from_row(row: &SqliteRow) -> Result<Person, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    let text = |column: &str| -> Result<String, sqlx::Error> {
        Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
    };

    Ok(Person {
        id: u32::try_from(id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        birth_year: text("birth_year")?,
        eye_color: text("eye_color")?,
        films: text("films")?,
        gender: text("gender")?,
        hair_color: text("hair_color")?,
        height: text("height")?,
        homeworld: text("homeworld")?,
        mass: text("mass")?,
        name: text("name")?,
        skin_color: text("skin_color")?,
        species: text("species")?,
        starships: text("starships")?,
        vehicles: text("vehicles")?,
    })
}
