//! Loader configuration constants and run configuration

use super::{HarvestError, HarvestResult};

/// Collection the loader reads by default
pub const DEFAULT_BASE_URL: &str = "https://swapi.dev/api/people/";

/// IDs fetched concurrently per window
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Attempts per URL before a fetch fails, the first one included
pub const MAX_ATTEMPTS: u32 = 5;

/// Delay between two attempts on the same URL
pub const RETRY_DELAY_MS: u64 = 1000;

/// Cap for a single delay when exponential backoff is selected
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// HTTP connect timeout (seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Consecutive windows without a single record before the run is declared stalled.
/// 25 windows of 10 IDs tolerates a gap of 250 missing IDs.
pub const MAX_IDLE_WINDOWS: u32 = 25;

/// Batch driver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestConfig {
    page_size: usize,
    max_idle_windows: u32,
}

impl HarvestConfig {
    /// Config with the given window width and default stall guard
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            max_idle_windows: MAX_IDLE_WINDOWS,
        }
    }

    /// Set the window width
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set how many empty windows in a row end the run
    pub fn with_max_idle_windows(mut self, max_idle_windows: u32) -> Self {
        self.max_idle_windows = max_idle_windows;
        self
    }

    /// Window width
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Stall guard
    pub fn max_idle_windows(&self) -> u32 {
        self.max_idle_windows
    }

    /// Window width as an ID span
    pub fn window_width(&self) -> HarvestResult<u32> {
        self.validate()?;
        u32::try_from(self.page_size).map_err(|_| {
            HarvestError::InvalidConfig(format!("page size {} is too large", self.page_size))
        })
    }

    /// Reject settings that would never terminate
    pub fn validate(&self) -> HarvestResult<()> {
        if self.page_size == 0 {
            return Err(HarvestError::InvalidConfig(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.max_idle_windows == 0 {
            return Err(HarvestError::InvalidConfig(
                "max idle windows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
