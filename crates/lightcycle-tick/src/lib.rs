//! Fixed-period ticker for the local game loop.
//!
//! The local two-player game advances once every period (450 ms by
//! default). A slow tick delays the next one: after an overrun the next
//! deadline is measured from the late wake-up, so ticks are never dropped
//! and never fired back to back to catch up.
//!
//! The scheduler is meant to sit inside a `tokio::select!` loop next to a
//! stop signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = &mut stop => break,
//!         _ = ticker.wait_for_tick() => {
//!             game.step();
//!             ticker.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! [`TickScheduler::wait_for_tick`] is cancel-safe: if the select picks
//! another branch first, no tick is consumed.

use std::time::{Duration, Instant};

use tokio::time::{Instant as Deadline, sleep_until};
use tracing::{debug, trace, warn};

/// Weight of the newest sample in [`TickStats::mean_step`].
const MEAN_WEIGHT: f64 = 0.1;

/// Ticker settings.
#[derive(Debug, Clone)]
pub struct TickConfig {
    pub period: Duration,
    /// Step time, as a fraction of `period`, above which a step is logged
    /// at debug level.
    pub warn_load: f64,
    /// Step time, as a fraction of `period`, above which a step is logged
    /// as a warning.
    pub max_load: f64,
    /// Keep [`TickStats::mean_step`] and [`TickStats::slowest_step`].
    pub track_timing: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
            warn_load: 0.8,
            max_load: 1.0,
            track_timing: true,
        }
    }
}

impl TickConfig {
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(450);

    /// Shortest period the scheduler accepts.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Raises `period` to [`Self::MIN_PERIOD`], keeps both loads in
    /// `0.0..=1.0` and `warn_load` at or below `max_load`.
    pub fn validated(self) -> Self {
        let period = if self.period < Self::MIN_PERIOD {
            warn!(period = ?self.period, "tick period too short, using the minimum");
            Self::MIN_PERIOD
        } else {
            self.period
        };
        let max_load = self.max_load.clamp(0.0, 1.0);
        Self {
            period,
            warn_load: self.warn_load.clamp(0.0, 1.0).min(max_load),
            max_load,
            ..self
        }
    }
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// Woke up more than a tenth of a period after the deadline.
    pub overrun: bool,
    pub late_by: Duration,
}

/// Running counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickStats {
    pub ticks: u64,
    pub late_ticks: u64,
    /// Moving average of step time.
    pub mean_step: Duration,
    pub slowest_step: Duration,
    /// Last step time divided by the period.
    pub last_load: f64,
}

/// Fixed-period scheduler. One per game loop.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    deadline: Deadline,
    ticks: u64,
    /// Open between `wait_for_tick` and `record_tick_end`.
    step_started: Option<Instant>,
    stats: TickStats,
}

impl TickScheduler {
    /// The first tick is due one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(period = ?config.period, "ticker ready");
        Self {
            deadline: Deadline::now() + config.period,
            config,
            ticks: 0,
            step_started: None,
            stats: TickStats::default(),
        }
    }

    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let due = self.deadline;
        sleep_until(due).await;

        let woke = Deadline::now();
        let late_by = woke.saturating_duration_since(due);
        let overrun = late_by > self.config.period / 10;

        self.ticks += 1;
        self.stats.ticks += 1;
        self.step_started = Some(Instant::now());
        self.deadline = if overrun {
            self.stats.late_ticks += 1;
            warn!(tick = self.ticks, ?late_by, "late tick, next one moves back");
            woke + self.config.period
        } else {
            due + self.config.period
        };

        trace!(tick = self.ticks, overrun, "tick");
        TickInfo {
            tick: self.ticks,
            overrun,
            late_by,
        }
    }

    /// Closes the step opened by the last `wait_for_tick`. A second call,
    /// or a call before any tick, is ignored.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.step_started.take() else {
            return;
        };
        let step = started.elapsed();
        let load = step.as_secs_f64() / self.config.period.as_secs_f64();
        self.stats.last_load = load;

        if load >= self.config.max_load {
            warn!(
                tick = self.ticks,
                ?step,
                period = ?self.config.period,
                "step longer than a period"
            );
        } else if load >= self.config.warn_load {
            debug!(tick = self.ticks, ?step, "slow step");
        }

        if self.config.track_timing {
            self.stats.slowest_step = self.stats.slowest_step.max(step);
            let mean = self.stats.mean_step.as_secs_f64();
            self.stats.mean_step =
                Duration::from_secs_f64(mean + (step.as_secs_f64() - mean) * MEAN_WEIGHT);
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// The period after validation.
    pub fn period(&self) -> Duration {
        self.config.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_period_is_450ms() {
        assert_eq!(TickConfig::default().period, Duration::from_millis(450));
    }

    #[test]
    fn test_validated_clamps_zero_period() {
        let cfg = TickConfig::with_period(Duration::ZERO).validated();
        assert_eq!(cfg.period, TickConfig::MIN_PERIOD);
    }

    #[test]
    fn test_validated_caps_warn_load_at_max_load() {
        let cfg = TickConfig {
            warn_load: 1.5,
            max_load: 0.5,
            ..TickConfig::default()
        }
        .validated();
        assert_eq!(cfg.max_load, 0.5);
        assert_eq!(cfg.warn_load, 0.5);
    }
}
