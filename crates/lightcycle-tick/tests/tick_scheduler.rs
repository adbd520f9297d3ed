//! Integration tests for the fixed-period ticker.
//!
//! All async tests run on a paused clock, so `sleep_until` resolves as
//! soon as the runtime is idle.

use std::time::Duration;

use lightcycle_tick::{TickConfig, TickScheduler};
use tokio::time::Instant;

fn config_50ms() -> TickConfig {
    TickConfig::with_period(Duration::from_millis(50))
}

/// The timer wheel rounds deadlines up to the next millisecond.
fn assert_close(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(2),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[test]
fn test_scheduler_initial_state() {
    let s = TickScheduler::new(config_50ms());
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.period(), Duration::from_millis(50));
    assert_eq!(s.stats().ticks, 0);
    assert_eq!(s.stats().slowest_step, Duration::ZERO);
}

#[test]
fn test_scheduler_new_clamps_zero_period() {
    let s = TickScheduler::new(TickConfig::with_period(Duration::ZERO));
    assert_eq!(s.period(), TickConfig::MIN_PERIOD);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_after_one_period() {
    let start = Instant::now();
    let mut s = TickScheduler::new(TickConfig::default());

    let info = s.wait_for_tick().await;

    assert_eq!(info.tick, 1);
    assert!(!info.overrun);
    assert_close(start.elapsed(), Duration::from_millis(450));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_increments_monotonically() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_50ms());

    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        s.record_tick_end();
    }

    assert_eq!(s.tick_count(), 5);
    assert_eq!(s.stats().ticks, 5);
    assert_close(start.elapsed(), Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_after_overrun_delays_instead_of_catching_up() {
    let mut s = TickScheduler::new(config_50ms());
    s.wait_for_tick().await;

    // The tick's work takes three periods.
    tokio::time::advance(Duration::from_millis(150)).await;

    let late = s.wait_for_tick().await;
    assert!(late.overrun);
    assert_eq!(late.tick, 2);
    assert_close(late.late_by, Duration::from_millis(100));

    // Next tick is a full period after the late one, not immediately.
    let before = Instant::now();
    let next = s.wait_for_tick().await;
    assert!(!next.overrun);
    assert_eq!(next.tick, 3);
    assert_close(before.elapsed(), Duration::from_millis(50));
    assert_eq!(s.stats().late_ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_wait_is_noop() {
    let mut s = TickScheduler::new(config_50ms());
    s.record_tick_end();
    assert_eq!(s.stats().last_load, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_slowest_step() {
    let mut s = TickScheduler::new(config_50ms());

    s.wait_for_tick().await;
    // record_tick_end measures wall-clock time, which the paused clock
    // does not control.
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    assert!(s.stats().slowest_step > Duration::ZERO);
    assert!(s.stats().last_load > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_tracking_keeps_zero() {
    let mut s = TickScheduler::new(TickConfig {
        track_timing: false,
        ..config_50ms()
    });

    s.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    assert_eq!(s.stats().mean_step, Duration::ZERO);
    assert_eq!(s.stats().slowest_step, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_select_loop_stops_between_ticks() {
    let mut s = TickScheduler::new(config_50ms());
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(160)).await;
        let _ = stop_tx.send(());
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            info = s.wait_for_tick() => {
                fired += 1;
                s.record_tick_end();
                assert_eq!(info.tick, fired);
            }
        }
    }

    assert_eq!(fired, 3);
    assert_eq!(s.tick_count(), 3);
}
