use crate::errors::SolverError;
use memory_stats::memory_stats;
use std::time::{Duration, Instant};
use tracing::info;

/// Soft ceiling on process resident set size, in megabytes.
pub const DEFAULT_MEMORY_LIMIT_MB: usize = 2048;

/// Polls the process RSS against a configured ceiling, and optionally the
/// wall clock against a time limit. One governor lives for the duration of
/// one search call.
#[derive(Debug)]
pub struct MemoryGovernor {
    memory_limit_mb: usize,
    time_limit: Option<Duration>,
    start_time: Instant,
    peak_memory_mb: Option<usize>,
}

impl MemoryGovernor {
    pub fn new(memory_limit_mb: usize, time_limit: Option<Duration>) -> Self {
        Self {
            memory_limit_mb,
            time_limit,
            start_time: Instant::now(),
            peak_memory_mb: None,
        }
    }

    /// Fails with `ResourceLimit` or `TimeLimit` when a ceiling is breached.
    pub fn check(&mut self) -> Result<(), SolverError> {
        let used_mb = memory_stats().map(|usage| usage.physical_mem / 1024 / 1024);
        self.peak_memory_mb = self.peak_memory_mb.max(used_mb);
        if let Some(used_mb) = used_mb {
            if used_mb > self.memory_limit_mb {
                return Err(SolverError::ResourceLimit {
                    used_mb,
                    limit_mb: self.memory_limit_mb,
                });
            }
        }
        if let Some(limit) = self.time_limit {
            if self.start_time.elapsed() > limit {
                return Err(SolverError::TimeLimit {
                    limit_secs: limit.as_secs(),
                });
            }
        }
        Ok(())
    }

    pub fn finalise(&self) {
        info!(
            peak_memory_usage_mb = self.peak_memory_mb,
            time_elapsed = self.start_time.elapsed().as_secs_f64(),
        );
    }
}
