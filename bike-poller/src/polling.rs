//! Fixed-interval driving loop.
//!
//! Pulls from a [`SnapshotSource`] on every tick and hands each snapshot to a
//! [`Collector`]. A failed poll aborts only its own iteration unless the
//! schedule asks to stop on the first error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::collector::{Collector, CollectorError};

/// Default wait between polls.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default number of polls per run.
const DEFAULT_ITERATIONS: u32 = 100;

/// Shortest interval `run` will tick at; `tokio` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Produces at most one snapshot per call; `None` means nothing changed.
pub trait SnapshotSource {
    type Snapshot;
    type Error: Display;

    fn next_snapshot(
        &mut self,
    ) -> impl Future<Output = Result<Option<Self::Snapshot>, Self::Error>>;
}

/// When and how long to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    /// Wall-clock time between polls.
    pub interval: Duration,
    /// Number of polls, or `None` to run until the process is stopped.
    pub iterations: Option<u32>,
    /// End the run on the first failed poll instead of waiting for the next tick.
    pub stop_on_error: bool,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            iterations: Some(DEFAULT_ITERATIONS),
            stop_on_error: false,
        }
    }

    pub fn with_iterations(mut self, iterations: Option<u32>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

/// Counts from a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub iterations: u32,
    pub forwarded: u32,
    pub unchanged: u32,
    pub failed: u32,
}

/// Why a run ended early.
#[derive(Debug, thiserror::Error)]
pub enum RunError<E> {
    /// A poll failed and the schedule stops on errors
    #[error("poll failed: {0}")]
    Poll(E),

    /// The collector could not accept or write snapshots
    #[error(transparent)]
    Collector(#[from] CollectorError),
}

/// Poll `source` on `schedule`, forwarding changed snapshots to `collector`.
///
/// With `iterations: None` this only returns on a collector error or, when
/// the schedule stops on errors, a failed poll. Collectors must therefore
/// persist in `collect`; `finish` runs only when the loop ends.
pub async fn run<S, C>(
    source: &mut S,
    collector: &mut C,
    schedule: &PollSchedule,
) -> Result<PollSummary, RunError<S::Error>>
where
    S: SnapshotSource,
    C: Collector<S::Snapshot>,
{
    let mut ticker = tokio::time::interval(schedule.interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut summary = PollSummary::default();
    let mut stopped_by = None;

    while schedule.iterations.is_none_or(|n| summary.iterations < n) {
        ticker.tick().await;
        summary.iterations += 1;

        match source.next_snapshot().await {
            Ok(Some(snapshot)) => {
                summary.forwarded += 1;
                collector.collect(snapshot)?;
            }
            Ok(None) => {
                summary.unchanged += 1;
                debug!(iteration = summary.iterations, "nothing changed");
            }
            Err(e) => {
                summary.failed += 1;
                error!(iteration = summary.iterations, error = %e, "poll failed");
                if schedule.stop_on_error {
                    stopped_by = Some(e);
                    break;
                }
            }
        }
    }

    collector.finish()?;

    if let Some(e) = stopped_by {
        return Err(RunError::Poll(e));
    }

    info!(
        iterations = summary.iterations,
        forwarded = summary.forwarded,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "polling finished"
    );
    Ok(summary)
}
