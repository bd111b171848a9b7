//! Load command: bootstrap collaborators and run the batch driver

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::CliError;
use crate::fetcher::client::{build_http_client, HttpSettings};
use crate::fetcher::http::HttpJsonClient;
use crate::fetcher::retry::RetryPolicy;
use crate::harvester::config::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, MAX_ATTEMPTS, RETRY_DELAY_MS};
use crate::harvester::{BatchDriver, HarvestConfig, RunSummary};
use crate::metrics::init_metrics;
use crate::people::PeopleEndpoint;
use crate::shutdown::SharedShutdown;
use crate::store::csv::CsvPeopleStore;
use crate::store::memory::MemoryStore;
use crate::store::sqlite::SqlitePeopleStore;
use crate::store::{PeopleStore, StorageSetup};

/// Largest window accepted on the command line
const MAX_PAGE_SIZE: usize = 100;

/// Parse and validate the page size
fn parse_page_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("page size must be at least 1".to_string());
    }
    if value > MAX_PAGE_SIZE {
        return Err(format!("page size {value} exceeds maximum of {MAX_PAGE_SIZE}"));
    }
    Ok(value)
}

/// Where resolved people are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// SQLite database file
    Sqlite,
    /// CSV file
    Csv,
    /// Kept in memory and discarded (dry run)
    Memory,
}

impl StoreKind {
    fn default_output(&self) -> PathBuf {
        match self {
            StoreKind::Sqlite => PathBuf::from("people.db"),
            StoreKind::Csv => PathBuf::from("people.csv"),
            StoreKind::Memory => PathBuf::new(),
        }
    }
}

/// Load every SWAPI person, resolve nested references and persist the result
#[derive(Debug, Parser)]
#[command(name = "swapi-people-loader", version, about)]
pub struct Cli {
    /// IDs fetched concurrently per window
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    pub page_size: usize,

    /// Drop existing storage before loading
    #[arg(long)]
    pub drop: bool,

    /// Create storage before loading
    #[arg(long)]
    pub create: bool,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::Sqlite)]
    pub store: StoreKind,

    /// Output file (defaults to people.db or people.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// People collection URL
    #[arg(long, env = "SWAPI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Attempts per URL, the first one included
    #[arg(long, default_value_t = MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds
    #[arg(long, default_value_t = RETRY_DELAY_MS)]
    pub retry_delay_ms: u64,

    /// Double the delay after every failed attempt
    #[arg(long)]
    pub exponential_backoff: bool,

    /// Cap on HTTP requests in flight across the whole run
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    /// Drop/create flags
    pub fn storage_setup(&self) -> StorageSetup {
        StorageSetup {
            drop: self.drop,
            create: self.create,
        }
    }

    /// Retry policy built from the attempt and delay flags
    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.retry_delay_ms);
        if self.exponential_backoff {
            RetryPolicy::exponential(self.max_attempts, delay)
        } else {
            RetryPolicy::fixed(self.max_attempts, delay)
        }
    }

    /// Transport settings
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings::default().with_max_in_flight(self.max_in_flight)
    }

    /// Driver settings
    pub fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig::new(self.page_size)
    }

    /// Output path for file-backed stores
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.store.default_output())
    }

    /// Open the selected store and apply the setup flags
    pub async fn open_store(&self) -> Result<Arc<dyn PeopleStore>, CliError> {
        let store: Arc<dyn PeopleStore> = match self.store {
            StoreKind::Sqlite => Arc::new(SqlitePeopleStore::open(self.output_path()).await?),
            StoreKind::Csv => Arc::new(CsvPeopleStore::new(self.output_path())),
            StoreKind::Memory => Arc::new(MemoryStore::new()),
        };

        store.prepare(self.storage_setup()).await?;
        info!(store = %store.describe(), setup = ?self.storage_setup(), "Store ready");
        Ok(store)
    }

    /// Run the load
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<RunSummary, CliError> {
        if let Some(addr) = self.metrics_addr {
            init_metrics(addr)?;
        }

        let settings = self.http_settings();
        let client = build_http_client(&settings)?;
        let source = Arc::new(HttpJsonClient::from_settings(
            client,
            self.retry_policy(),
            &settings,
        ));

        let store = self.open_store().await?;
        let endpoint = PeopleEndpoint::new(self.base_url.as_str());

        let mut driver = BatchDriver::new(source, endpoint, store, self.harvest_config())
            .with_shutdown(shutdown);
        if !self.no_progress {
            driver = driver.with_progress(create_progress_bar());
        }

        let summary = driver.run().await?;
        info!(
            expected = summary.expected,
            processed = summary.processed,
            windows = summary.windows.len(),
            last_id = summary.last_id(),
            "Load finished"
        );
        Ok(summary)
    }
}

/// Progress bar sized once the record count is known
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} people {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
