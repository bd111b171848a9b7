//! Windowed batch driver
//!
//! Within a window every ID is assembled and saved by its own future; the
//! futures are polled together and the window ends only once every one of them
//! has finished. The next window never starts before that.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{HarvestConfig, HarvestError, HarvestResult, IdWindow};
use crate::fetcher::JsonSource;
use crate::metrics::{record_persisted, record_window_completed, RunMetrics};
use crate::people::{discover_count, PeopleEndpoint, RecordAssembler};
use crate::shutdown::SharedShutdown;
use crate::store::PeopleStore;

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Count reported by the collection
    pub expected: u64,
    /// People persisted
    pub processed: u64,
    /// Windows scanned, in order
    pub windows: Vec<IdWindow>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last window finished
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn new(expected: u64) -> Self {
        let now = Utc::now();
        Self {
            expected,
            processed: 0,
            windows: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Last ID scanned, 0 before the first window
    pub fn last_id(&self) -> u32 {
        self.windows
            .last()
            .map(|w| w.end().saturating_sub(1))
            .unwrap_or(0)
    }

    /// Whether more IDs were scanned than records expected (gaps in the ID space)
    pub fn overscanned(&self) -> bool {
        u64::from(self.last_id()) > self.expected
    }
}

/// Drives assembly and persistence over the whole ID space
pub struct BatchDriver<S: ?Sized> {
    source: Arc<S>,
    assembler: RecordAssembler<S>,
    store: Arc<dyn PeopleStore>,
    config: HarvestConfig,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl<S: JsonSource + ?Sized> BatchDriver<S> {
    /// Create a driver
    ///
    /// # Arguments
    /// * `source` - JSON source shared by every fetch of the run
    /// * `endpoint` - People collection to enumerate
    /// * `store` - Persistence collaborator receiving each resolved person
    /// * `config` - Window width and stall guard
    pub fn new(
        source: Arc<S>,
        endpoint: PeopleEndpoint,
        store: Arc<dyn PeopleStore>,
        config: HarvestConfig,
    ) -> Self {
        Self {
            assembler: RecordAssembler::new(Arc::clone(&source), endpoint),
            source,
            store,
            config,
            shutdown: None,
            progress: None,
        }
    }

    /// Stop between windows once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report persisted records on a progress bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run configuration
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Load every record and return how many were persisted
    pub async fn run_all(&self) -> HarvestResult<u64> {
        Ok(self.run().await?.processed)
    }

    /// Load every record and return the full summary
    pub async fn run(&self) -> HarvestResult<RunSummary> {
        self.config.validate()?;
        let metrics = RunMetrics::start(self.config.page_size());

        let span = info_span!("people_load", page_size = self.config.page_size());
        let result = self.run_windows().instrument(span).await;

        match &result {
            Ok(summary) => metrics.record_success(summary.processed),
            Err(e) => metrics.record_failure(&e.to_string()),
        }
        result
    }

    async fn run_windows(&self) -> HarvestResult<RunSummary> {
        let width = self.config.window_width()?;
        let expected = discover_count(self.source.as_ref(), self.assembler.endpoint()).await?;
        info!(expected, "Record count discovered");

        if let Some(progress) = &self.progress {
            progress.set_length(expected);
        }

        let mut summary = RunSummary::new(expected);
        let mut window = IdWindow::first(width);
        let mut idle_windows = 0u32;

        while summary.processed < expected {
            if self.shutdown_requested() {
                warn!(processed = summary.processed, "Shutdown requested - stopping before next window");
                return Err(HarvestError::Cancelled {
                    processed: summary.processed,
                });
            }

            let found = self.process_window(window).await?;
            summary.processed += found;
            summary.windows.push(window);
            summary.finished_at = Utc::now();

            idle_windows = if found == 0 { idle_windows + 1 } else { 0 };
            let stalled = idle_windows >= self.config.max_idle_windows() || window.is_last();
            if stalled && summary.processed < expected {
                return Err(HarvestError::Stalled {
                    processed: summary.processed,
                    expected,
                    last_id: summary.last_id(),
                });
            }

            window = window.next();
        }

        if summary.overscanned() {
            debug!(
                expected,
                last_id = summary.last_id(),
                "Scanned past the reported count because of gaps in the id space"
            );
        }

        if let Some(progress) = &self.progress {
            progress.finish_with_message("done");
        }
        Ok(summary)
    }

    /// Assemble and persist every ID of `window`, returning how many were found
    ///
    /// Every future of the window is awaited even if one fails, so every person
    /// that resolves is still saved; the first failure in ID order is returned.
    pub async fn process_window(&self, window: IdWindow) -> HarvestResult<u64> {
        let span = info_span!("window", start = window.start(), end = window.end());
        let outcomes = join_all(window.ids().map(|id| self.process_id(id)))
            .instrument(span)
            .await;

        let mut found = 0;
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(true) => found += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Record failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        record_window_completed();
        debug!(%window, found, "Window complete");
        Ok(found)
    }

    async fn process_id(&self, id: u32) -> HarvestResult<bool> {
        let person = match self
            .assembler
            .assemble(id)
            .await
            .map_err(|source| HarvestError::Record { id, source })?
        {
            Some(person) => person,
            None => return Ok(false),
        };

        self.store
            .save(&person)
            .await
            .map_err(|source| HarvestError::Persist { id, source })?;

        record_persisted();
        if let Some(progress) = &self.progress {
            // A window may save past the reported count
            if progress.position() >= progress.length().unwrap_or(0) {
                progress.inc_length(1);
            }
            progress.inc(1);
        }
        Ok(true)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}
