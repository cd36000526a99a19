//! End-to-end autoscaling scenarios.
//!
//! Each scenario feeds synthetic per-second samples for every replica and
//! checks the decision at the end of the series. Timing mirrors a real
//! reporting path: replica `j` reports `j` milliseconds into each second.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use surge_autoscale::*;

struct LinearSeries {
    start_concurrency: i32,
    end_concurrency: i32,
    duration_secs: u32,
    pod_count: u32,
}

fn start_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000) + Duration::from_millis(437)
}

fn test_autoscaler(target: f64) -> Autoscaler {
    let config = AutoscalerConfig {
        target_concurrency: target,
        max_scale_up_rate: 10.0,
        stable_window: Duration::from_secs(60),
        panic_window: Duration::from_secs(6),
        scale_to_zero_threshold: Duration::from_secs(5 * 60),
    };
    Autoscaler::new("default/api", config, NoopReporter)
}

/// Record one sample per second per pod along the line from start to end
/// concurrency. Returns the time just after the last second.
fn record_linear_series(scaler: &Autoscaler, mut now: SystemTime, s: LinearSeries) -> SystemTime {
    let points: Vec<i32> = (1..=s.duration_secs)
        .map(|i| {
            let step = (s.end_concurrency - s.start_concurrency) as f64
                * (i as f64 / s.duration_secs as f64);
            (s.start_concurrency as f64 + step) as i32
        })
        .collect();

    for point in points {
        let mut t = now;
        now += Duration::from_secs(1);
        for j in 1..=s.pod_count {
            t += Duration::from_millis(1);
            scaler.record(Stat::new(t, format!("pod-{j}"), point as f64));
        }
    }
    now
}

fn expect_scale(scaler: &Autoscaler, now: SystemTime, expected: ScaleDecision) {
    assert_eq!(scaler.scale(now), expected);
}

#[test]
fn no_data_no_autoscale() {
    let scaler = test_autoscaler(10.0);
    expect_scale(&scaler, start_time(), ScaleDecision::NoChange);
}

#[test]
fn stable_mode_no_change() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 10,
            duration_secs: 60,
            pod_count: 10,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(10));
}

#[test]
fn stable_mode_slow_increase() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 20,
            duration_secs: 60,
            pod_count: 10,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(15));
}

#[test]
fn stable_mode_slow_decrease() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 20,
            end_concurrency: 10,
            duration_secs: 60,
            pod_count: 10,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(15));
}

#[test]
fn stable_mode_low_pod_count_no_change() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 10,
            duration_secs: 60,
            pod_count: 1,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(1));
}

#[test]
fn stable_mode_no_traffic_scale_to_one() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 0,
            end_concurrency: 0,
            duration_secs: 60,
            pod_count: 2,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(1));
}

#[test]
fn stable_mode_no_traffic_scale_to_zero() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 1,
            end_concurrency: 1,
            duration_secs: 60,
            pod_count: 1,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(1));

    let now = record_linear_series(
        &scaler,
        now,
        LinearSeries {
            start_concurrency: 0,
            end_concurrency: 0,
            duration_secs: 300,
            pod_count: 1,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(0));
}

#[test]
fn panic_mode_double_pod_count() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 10,
            duration_secs: 60,
            pod_count: 10,
        },
    );
    let now = record_linear_series(
        &scaler,
        now,
        LinearSeries {
            start_concurrency: 20,
            end_concurrency: 20,
            duration_secs: 6,
            pod_count: 10,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(20));
    assert_eq!(scaler.mode(), ScaleMode::Panicking);
}

// Load grows exponentially. Each scaling event brings concurrency back to
// the target (1.0) but traffic keeps climbing until it levels off at 1296.
#[test]
fn panic_mode_exponential_track_and_stabilize() {
    let scaler = test_autoscaler(1.0);
    let mut now = start_time();

    for (pods, expected) in [(1, 6), (6, 36), (36, 216), (216, 1296)] {
        now = record_linear_series(
            &scaler,
            now,
            LinearSeries {
                start_concurrency: 1,
                end_concurrency: 10,
                duration_secs: 6,
                pod_count: pods,
            },
        );
        expect_scale(&scaler, now, ScaleDecision::ScaleTo(expected));
    }

    // Load reached the target. The floor holds until a full stable window
    // has passed since the last trigger, then stable mode takes over at
    // the same size.
    for elapsed in (6..=60).step_by(6) {
        now = record_linear_series(
            &scaler,
            now,
            LinearSeries {
                start_concurrency: 1,
                end_concurrency: 1,
                duration_secs: 6,
                pod_count: 1296,
            },
        );
        expect_scale(&scaler, now, ScaleDecision::ScaleTo(1296));
        let expected_mode = if elapsed < 60 {
            ScaleMode::Panicking
        } else {
            ScaleMode::Stable
        };
        assert_eq!(scaler.mode(), expected_mode, "{elapsed}s after last trigger");
    }
}

#[test]
fn panic_then_unpanic_scale_down() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 10,
            duration_secs: 60,
            pod_count: 10,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(10));

    let now = record_linear_series(
        &scaler,
        now,
        LinearSeries {
            start_concurrency: 100,
            end_concurrency: 100,
            duration_secs: 6,
            pod_count: 10,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(100));

    let now = record_linear_series(
        &scaler,
        now,
        LinearSeries {
            start_concurrency: 1, // traffic drops off
            end_concurrency: 1,
            duration_secs: 30,
            pod_count: 100,
        },
    );
    // Still panicking: no decrease.
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(100));
    assert_eq!(scaler.mode(), ScaleMode::Panicking);

    let now = record_linear_series(
        &scaler,
        now,
        LinearSeries {
            start_concurrency: 1,
            end_concurrency: 1,
            duration_secs: 31,
            pod_count: 100,
        },
    );
    // Back to stable mode.
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(10));
    assert_eq!(scaler.mode(), ScaleMode::Stable);
}

#[test]
fn panic_floor_never_drops_while_panicking() {
    let scaler = test_autoscaler(10.0);
    let mut now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 50,
            end_concurrency: 50,
            duration_secs: 6,
            pod_count: 4,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(20));

    let mut previous = 20;
    for _ in 0..50 {
        now = record_linear_series(
            &scaler,
            now,
            LinearSeries {
                start_concurrency: 0,
                end_concurrency: 0,
                duration_secs: 1,
                pod_count: 20,
            },
        );
        let desired = scaler.scale(now).desired().unwrap();
        assert!(desired >= previous, "desired dropped from {previous} to {desired}");
        previous = desired;
    }
}

// Samples are dropped once they fall out of the stable window.
#[test]
fn stats_trim_after_stable_window() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 10,
            duration_secs: 60,
            pod_count: 1,
        },
    );
    expect_scale(&scaler, now, ScaleDecision::ScaleTo(1));
    assert_eq!(scaler.stat_buckets(), 60);
    assert_eq!(scaler.stat_count(), 60);

    let now = now + Duration::from_secs(60);
    expect_scale(&scaler, now, ScaleDecision::NoChange);
    assert_eq!(scaler.stat_buckets(), 0);
    assert_eq!(scaler.stat_count(), 0);
}

#[test]
fn repeated_scale_is_idempotent() {
    let scaler = test_autoscaler(10.0);
    let now = record_linear_series(
        &scaler,
        start_time(),
        LinearSeries {
            start_concurrency: 10,
            end_concurrency: 20,
            duration_secs: 60,
            pod_count: 10,
        },
    );
    let first = scaler.scale(now);
    assert_eq!(scaler.scale(now), first);
    assert_eq!(scaler.scale(now), first);
}
