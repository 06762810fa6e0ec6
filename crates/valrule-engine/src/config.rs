//! Engine configuration

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::thread;

/// Longest sliding window accepted, in periods
pub const MAX_SLIDING_WINDOW_PERIODS: u32 = 1000;

/// Tunables shared by every run of a [`crate::ValidationRunner`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Org units evaluated at the same time
    pub max_concurrency: usize,
    /// Periods covered by a sliding window, ending on the evaluated period
    pub sliding_window_periods: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            sliding_window_periods: 1,
        }
    }
}

impl EngineConfig {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_sliding_window_periods(mut self, periods: u32) -> Self {
        self.sliding_window_periods = periods;
        self
    }

    /// Concurrency actually used: never below one
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Window length actually used: between one and
    /// [`MAX_SLIDING_WINDOW_PERIODS`] periods
    pub fn effective_window(&self) -> u32 {
        self.sliding_window_periods.clamp(1, MAX_SLIDING_WINDOW_PERIODS)
    }
}
