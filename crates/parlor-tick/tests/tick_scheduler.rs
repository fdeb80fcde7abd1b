//! Integration tests for the tick scheduler.
//!
//! Tokio's clock is paused (`start_paused = true`), so `sleep_until`
//! resolves as soon as nothing else is runnable and `time::advance`
//! stands in for a burst of slow work.

use std::time::Duration;

use parlor_tick::{TickConfig, TickError, TickPolicy, TickScheduler};

/// Paused-clock waits land on the deadline, give or take the timer's
/// millisecond granularity.
fn assert_waited(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(2),
        "waited {elapsed:?}, expected {expected:?}"
    );
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_10hz_skip() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 10);
    assert_eq!(cfg.policy, TickPolicy::Skip);
    assert_eq!(cfg.tick_duration(), Duration::from_millis(100));
}

#[test]
fn test_validated_rejects_zero_and_excessive_rates() {
    assert_eq!(
        TickConfig::with_rate(0).validated().unwrap_err(),
        TickError::InvalidRate(0)
    );
    assert_eq!(
        TickConfig::with_rate(500).validated().unwrap_err(),
        TickError::InvalidRate(500)
    );
    assert!(TickConfig::with_rate(TickConfig::MAX_TICK_RATE_HZ).validated().is_ok());
}

#[test]
fn test_validated_clamps_thresholds() {
    let cfg = TickConfig {
        budget_warn_threshold: 1.5,
        budget_critical_threshold: 0.9,
        ..TickConfig::default()
    }
    .validated()
    .unwrap();
    assert_eq!(cfg.budget_critical_threshold, 0.9);
    assert_eq!(cfg.budget_warn_threshold, 0.9);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduler_initial_state() {
    let s = TickScheduler::with_rate(20).unwrap();
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.tick_rate_hz(), 20);
    assert_eq!(s.tick_duration(), Duration::from_millis(50));
    assert_eq!(s.metrics().total_ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_after_one_interval() {
    let mut s = TickScheduler::with_rate(10).unwrap();
    let start = tokio::time::Instant::now();

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, Duration::from_millis(100));
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_waited(start.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_increment_monotonically() {
    let mut s = TickScheduler::with_rate(20).unwrap();
    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        s.record_tick_end();
    }
    assert_eq!(s.tick_count(), 5);
    assert_eq!(s.metrics().total_ticks, 5);
}

// =========================================================================
// Overrun policies
// =========================================================================

/// Fires one tick, then pretends the work took `work`.
async fn slow_first_tick(s: &mut TickScheduler, work: Duration) {
    s.wait_for_tick().await;
    tokio::time::advance(work).await;
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_drops_missed_ticks() {
    let mut s = TickScheduler::with_rate(10).unwrap();
    slow_first_tick(&mut s, Duration::from_millis(350)).await;

    // Due at 200 ms, fired at 450 ms: 250 ms late, two whole intervals.
    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 2);

    // Next tick is a full interval after the late one.
    let before = tokio::time::Instant::now();
    let info = s.wait_for_tick().await;
    assert!(!info.overrun);
    assert_waited(before.elapsed(), Duration::from_millis(100));
    assert_eq!(s.metrics().total_overruns, 1);
    assert_eq!(s.metrics().total_skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn test_catchup_policy_fires_missed_ticks_back_to_back() {
    let mut s = TickScheduler::new(TickConfig {
        policy: TickPolicy::CatchUp { max_catchup: 3 },
        ..TickConfig::with_rate(10)
    })
    .unwrap();
    slow_first_tick(&mut s, Duration::from_millis(350)).await;

    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 0);

    // The following tick was due at 300 ms, so it fires without waiting.
    let before = tokio::time::Instant::now();
    s.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_catchup_policy_caps_backlog() {
    let mut s = TickScheduler::new(TickConfig {
        policy: TickPolicy::CatchUp { max_catchup: 1 },
        ..TickConfig::with_rate(10)
    })
    .unwrap();
    slow_first_tick(&mut s, Duration::from_millis(550)).await;

    // 450 ms late: four intervals behind, one may be caught up.
    let info = s.wait_for_tick().await;
    assert_eq!(info.ticks_skipped, 3);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence() {
    let mut s = TickScheduler::new(TickConfig {
        policy: TickPolicy::Drop,
        ..TickConfig::with_rate(10)
    })
    .unwrap();
    slow_first_tick(&mut s, Duration::from_millis(150)).await;

    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 0);

    // Original schedule: the next tick is due at 300 ms, 50 ms from now.
    let before = tokio::time::Instant::now();
    s.wait_for_tick().await;
    assert_waited(before.elapsed(), Duration::from_millis(50));
}

// =========================================================================
// Metrics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_wait_is_noop() {
    let mut s = TickScheduler::with_rate(20).unwrap();
    s.record_tick_end();
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_track_burst_time() {
    let mut s = TickScheduler::with_rate(20).unwrap();
    s.wait_for_tick().await;
    // Burst timing uses the real clock, not Tokio's.
    std::thread::sleep(Duration::from_micros(200));
    s.record_tick_end();

    let m = s.metrics();
    assert!(m.max_tick_time > Duration::ZERO);
    assert!(m.avg_tick_time > Duration::ZERO);
    assert!(m.budget_utilization > 0.0);
    assert!(m.budget_utilization < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_disabled_skips_timings() {
    let mut s = TickScheduler::new(TickConfig {
        metrics_enabled: false,
        ..TickConfig::with_rate(20)
    })
    .unwrap();
    s.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(200));
    s.record_tick_end();

    assert_eq!(s.metrics().total_ticks, 1);
    assert_eq!(s.metrics().avg_tick_time, Duration::ZERO);
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

// =========================================================================
// select! loop, the way the server drives it
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_stops_on_signal() {
    let mut s = TickScheduler::with_rate(20).unwrap();
    let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(160)).await;
        let _ = tx.send(());
    });

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            _ = &mut rx => break,
            info = s.wait_for_tick() => {
                ticks += 1;
                assert_eq!(info.tick, ticks);
                s.record_tick_end();
            }
        }
    }
    assert_eq!(ticks, 3);
}
