//! Fixed-width ID windows

use std::fmt;
use std::ops::Range;

/// Half-open range of record IDs processed together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdWindow {
    start: u32,
    width: u32,
}

impl IdWindow {
    /// First window of a run; IDs start at 1
    pub fn first(width: u32) -> Self {
        Self::new(1, width)
    }

    /// Window `[start, start + width)`
    pub fn new(start: u32, width: u32) -> Self {
        Self { start, width }
    }

    /// First ID in the window
    pub fn start(&self) -> u32 {
        self.start
    }

    /// One past the last ID in the window
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.width)
    }

    /// IDs covered by the window
    pub fn ids(&self) -> Range<u32> {
        self.start..self.end()
    }

    /// Window immediately after this one
    pub fn next(&self) -> Self {
        Self::new(self.end(), self.width)
    }

    /// Whether advancing is impossible because the ID space is used up
    pub fn is_last(&self) -> bool {
        self.end() == u32::MAX
    }
}

impl fmt::Display for IdWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
