//! Fixed-rate tick scheduler for the Parlor server loop.
//!
//! The server does all of its work in short synchronous bursts: accept
//! whatever is pending, update every room once, then wait. This crate
//! owns the "then wait" part. It fires at a fixed rate (1–128 Hz), notices
//! when a burst ran long, and decides how to get back on schedule.
//!
//! # Integration
//!
//! The scheduler sits in the server's `tokio::select!` loop next to the
//! shutdown signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = tokio::signal::ctrl_c() => break,
//!         tick = scheduler.wait_for_tick() => {
//!             router.tick(tick.started_at);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! `wait_for_tick` is the only `.await` in that loop, so a room update
//! always runs to completion before the next one starts.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// The rate is zero or above [`TickConfig::MAX_TICK_RATE_HZ`].
    #[error("tick rate {0} Hz is outside 1..={max}", max = TickConfig::MAX_TICK_RATE_HZ)]
    InvalidRate(u32),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
///
/// Serialized in snake case: `"skip"`, `"drop"`, or
/// `{ "catch_up": { "max_catchup": 3 } }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full interval
    /// from now.
    #[default]
    Skip,
    /// Fire the missed ticks back to back, but only if no more than
    /// `max_catchup` were missed; otherwise behave like `Skip`.
    CatchUp { max_catchup: u32 },
    /// Keep the original cadence. Late ticks fire immediately, one after
    /// another, until the schedule is caught up.
    Drop,
}

/// Configuration for [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second, 1 to [`Self::MAX_TICK_RATE_HZ`].
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Fraction of the tick interval (0.0–1.0) after which a burst is
    /// logged as approaching its budget.
    pub budget_warn_threshold: f64,
    /// Fraction after which a burst is logged as over budget.
    pub budget_critical_threshold: f64,
    /// Track average and maximum burst time.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    /// 10 Hz, i.e. one update every 100 ms.
    fn default() -> Self {
        Self {
            tick_rate_hz: 10,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Checks the rate and clamps the thresholds into `0.0..=1.0`, with
    /// warn never above critical.
    pub fn validated(mut self) -> Result<Self, TickError> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            return Err(TickError::InvalidRate(self.tick_rate_hz));
        }
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        self.budget_warn_threshold = self
            .budget_warn_threshold
            .clamp(0.0, self.budget_critical_threshold);
        Ok(self)
    }

    /// Length of one tick interval.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// The fixed interval.
    pub dt: Duration,
    /// Wall-clock time the tick fired. Rooms use this as "now" for the
    /// whole burst, so every liveness check in one tick agrees.
    pub started_at: Instant,
    /// Fired more than 10% of an interval late.
    pub overrun: bool,
    /// Whole intervals that were dropped to get back on schedule.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters and burst timings.
///
/// Timings come from [`TickScheduler::record_tick_end`]; if the caller
/// never reports, only the counters move.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average (α = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last burst time over the interval. Above 1.0 means over budget.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-rate scheduler for one loop.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    next_tick: TokioInstant,
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Creates a scheduler whose first tick is one interval from now.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: TickConfig) -> Result<Self, TickError> {
        let config = config.validated()?;
        let tick_duration = config.tick_duration();
        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = tick_duration.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );
        Ok(Self {
            next_tick: TokioInstant::now() + tick_duration,
            config,
            tick_duration,
            tick_count: 0,
            tick_start: None,
            metrics: TickMetrics::default(),
        })
    }

    pub fn with_rate(tick_rate_hz: u32) -> Result<Self, TickError> {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    ///
    /// Cancel-safe: dropping the future (e.g. when another `select!`
    /// branch wins) leaves the schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        let started_at = Instant::now();
        self.tick_start = Some(started_at);

        let dt = self.tick_duration;
        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > dt / 10;
        let (next, ticks_skipped) = self.schedule_after(due, now, late_by, overrun);
        self.next_tick = next;

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt,
            started_at,
            overrun,
            ticks_skipped,
        }
    }

    /// Picks the next deadline after a tick that was due at `due` fired at
    /// `now`. Returns it with the number of intervals given up.
    fn schedule_after(
        &self,
        due: TokioInstant,
        now: TokioInstant,
        late_by: Duration,
        overrun: bool,
    ) -> (TokioInstant, u64) {
        let dt = self.tick_duration;
        if !overrun {
            return (due + dt, 0);
        }
        let behind = (late_by.as_nanos() / dt.as_nanos().max(1)) as u64;
        let late_ms = late_by.as_secs_f64() * 1000.0;

        match self.config.policy {
            TickPolicy::Skip => {
                if behind > 0 {
                    warn!(tick = self.tick_count, skipped = behind, late_ms, "tick overrun, skipping ahead");
                }
                (now + dt, behind)
            }
            TickPolicy::CatchUp { max_catchup } if behind <= u64::from(max_catchup) => {
                warn!(tick = self.tick_count, behind, late_ms, "tick overrun, catching up");
                (due + dt, 0)
            }
            TickPolicy::CatchUp { max_catchup } => {
                let skipped = behind - u64::from(max_catchup);
                warn!(
                    tick = self.tick_count,
                    behind,
                    skipped,
                    late_ms,
                    "tick overrun beyond catch-up cap, skipping ahead"
                );
                (now + dt, skipped)
            }
            TickPolicy::Drop => {
                warn!(tick = self.tick_count, late_ms, "tick overrun, keeping cadence");
                (due + dt, 0)
            }
        }
    }

    /// Reports that the work for the current tick is done.
    ///
    /// Logs a warning when the burst ate most of its interval and updates
    /// the timing metrics. Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.tick_duration;
        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let budget_ms = budget.as_secs_f64() * 1000.0;
        if utilization >= self.config.budget_critical_threshold {
            warn!(tick = self.tick_count, elapsed_ms, budget_ms, "tick exceeded budget");
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(tick = self.tick_count, elapsed_ms, budget_ms, "tick approaching budget");
        }

        if self.config.metrics_enabled {
            self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * 0.9 + elapsed.as_secs_f64() * 0.1);
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
