//! Autoscaler — concurrency-driven replica decisions.
//!
//! Samples arrive through [`Autoscaler::record`] from many reporters at
//! once; a single control loop calls [`Autoscaler::scale`] on each tick.
//! Both go through one mutex guarding the sample buffer and the mode
//! state, so each call is atomic with respect to the other.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::config::{AutoscalerConfig, ConfigProvider};
use crate::reporter::{Measurement, Reporter};
use crate::stats::{Stat, StatsBuffer, WindowAverage};

/// A scaling decision for a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Run the specified number of replicas.
    ScaleTo(u32),
    /// No opinion: not enough data, or the configuration is unusable.
    /// The caller should leave the current replica count alone.
    NoChange,
}

impl ScaleDecision {
    pub fn desired(&self) -> Option<u32> {
        match self {
            ScaleDecision::ScaleTo(n) => Some(*n),
            ScaleDecision::NoChange => None,
        }
    }
}

/// Which sizing regime the autoscaler is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    Stable,
    Panicking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Stable,
    Panicking {
        /// Last time the panic trigger fired.
        since: SystemTime,
        /// Floor on desired replicas; only rises until panic ends.
        max_panic_pods: u32,
    },
}

/// Everything mutated by `record` and `scale`.
#[derive(Debug)]
struct ScalerState {
    stats: StatsBuffer,
    mode: Mode,
    /// Latest time traffic was seen. Starts at the first sample ever
    /// recorded so an idle service can still reach zero.
    last_active: Option<SystemTime>,
}

impl ScalerState {
    fn note_activity(&mut self, stat: &Stat) {
        match self.last_active {
            None => self.last_active = Some(stat.time),
            Some(t) if stat.average_concurrency > 0.0 && stat.time > t => {
                self.last_active = Some(stat.time);
            }
            Some(_) => {}
        }
    }
}

/// Values reported after a decision, collected under the lock and
/// emitted after it is released.
struct DecisionReport {
    desired: u32,
    stable: WindowAverage,
    panic: Option<WindowAverage>,
    target: f64,
    panicking: bool,
}

/// Decision engine for one autoscaled service.
pub struct Autoscaler {
    service: String,
    config: Box<dyn ConfigProvider>,
    reporter: Box<dyn Reporter>,
    state: Mutex<ScalerState>,
}

impl Autoscaler {
    /// Create a new autoscaler for `service`.
    pub fn new(
        service: impl Into<String>,
        config: impl ConfigProvider + 'static,
        reporter: impl Reporter + 'static,
    ) -> Self {
        Self {
            service: service.into(),
            config: Box::new(config),
            reporter: Box::new(reporter),
            state: Mutex::new(ScalerState {
                stats: StatsBuffer::new(),
                mode: Mode::Stable,
                last_active: None,
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Store a concurrency sample. Non-finite or negative values are
    /// dropped.
    pub fn record(&self, stat: Stat) {
        if !stat.average_concurrency.is_finite() || stat.average_concurrency < 0.0 {
            debug!(
                service = %self.service,
                replica = %stat.replica_id,
                value = stat.average_concurrency,
                "dropping invalid concurrency sample"
            );
            return;
        }

        let mut state = self.lock();
        state.note_activity(&stat);
        state.stats.record(stat);
    }

    /// Compute the desired replica count at `now`.
    ///
    /// Trims samples older than the stable window, then sizes from the
    /// stable or panic aggregate. Returns [`ScaleDecision::NoChange`] when
    /// no sample falls inside the stable window.
    pub fn scale(&self, now: SystemTime) -> ScaleDecision {
        let config = self.config.current();
        if let Err(e) = config.validate() {
            warn!(service = %self.service, error = %e, "unusable autoscaler config, skipping decision");
            // Keep the buffer bounded while the config is unusable.
            if !config.stable_window.is_zero() {
                self.lock().stats.trim(now, config.stable_window);
            }
            return ScaleDecision::NoChange;
        }

        let report = {
            let mut state = self.lock();
            match self.decide(&mut state, &config, now) {
                Some(report) => report,
                None => return ScaleDecision::NoChange,
            }
        };

        debug!(
            service = %self.service,
            desired = report.desired,
            replicas = report.stable.replicas,
            stable_concurrency = report.stable.average_concurrency,
            panic_concurrency = report.panic.map(|p| p.average_concurrency),
            panicking = report.panicking,
            "scale decision"
        );
        self.emit(&report);

        ScaleDecision::ScaleTo(report.desired)
    }

    fn decide(
        &self,
        state: &mut ScalerState,
        config: &AutoscalerConfig,
        now: SystemTime,
    ) -> Option<DecisionReport> {
        let trimmed = state.stats.trim(now, config.stable_window);
        if trimmed > 0 {
            debug!(service = %self.service, trimmed, "dropped expired samples");
        }

        if state.stats.is_empty() {
            debug!(service = %self.service, "no data to scale on");
            return None;
        }
        let stable = state.stats.window(now, config.stable_window)?;
        let panic = state.stats.window(now, config.panic_window);

        let target = config.target_concurrency;
        let max_scale_up = scale_up_limit(stable.replicas, config.max_scale_up_rate);

        // Stop panicking once a full stable window passes without a fresh trigger.
        if let Mode::Panicking { since, .. } = state.mode
            && elapsed(since, now) >= config.stable_window
        {
            info!(service = %self.service, "un-panicking");
            state.mode = Mode::Stable;
        }

        if let Some(panic) = panic {
            let candidate = desired_pods(&panic, target).min(max_scale_up);

            if panic.average_concurrency >= 2.0 * target {
                state.mode = match state.mode {
                    Mode::Stable => {
                        info!(
                            service = %self.service,
                            panic_concurrency = panic.average_concurrency,
                            target,
                            desired = candidate,
                            "panicking"
                        );
                        Mode::Panicking {
                            since: now,
                            max_panic_pods: candidate,
                        }
                    }
                    Mode::Panicking { max_panic_pods, .. } => Mode::Panicking {
                        since: now,
                        max_panic_pods,
                    },
                };
            }

            if let Mode::Panicking { max_panic_pods, .. } = &mut state.mode
                && candidate > *max_panic_pods
            {
                info!(
                    service = %self.service,
                    from = *max_panic_pods,
                    to = candidate,
                    "raising panic floor"
                );
                *max_panic_pods = candidate;
            }
        }

        let mut desired = match state.mode {
            Mode::Stable => desired_pods(&stable, target),
            Mode::Panicking { max_panic_pods, .. } => max_panic_pods,
        };

        if stable.average_concurrency == 0.0 {
            let idle = state
                .last_active
                .map(|t| elapsed(t, now))
                .unwrap_or_default();
            if idle >= config.scale_to_zero_threshold {
                info!(service = %self.service, idle_secs = idle.as_secs(), "scale-to-zero: no traffic");
                desired = 0;
            } else {
                desired = desired.max(1);
            }
        }

        Some(DecisionReport {
            desired: desired.min(max_scale_up),
            stable,
            panic,
            target,
            panicking: matches!(state.mode, Mode::Panicking { .. }),
        })
    }

    fn emit(&self, report: &DecisionReport) {
        let mut values = vec![
            (Measurement::DesiredPods, report.desired as f64),
            (Measurement::ObservedPods, report.stable.replicas as f64),
            (
                Measurement::StableRequestConcurrency,
                report.stable.average_concurrency,
            ),
            (Measurement::TargetConcurrencyPerPod, report.target),
            (Measurement::PanicMode, if report.panicking { 1.0 } else { 0.0 }),
        ];
        if let Some(panic) = report.panic {
            values.push((
                Measurement::PanicRequestConcurrency,
                panic.average_concurrency,
            ));
        }

        for (measurement, value) in values {
            if let Err(e) = self.reporter.report(measurement, value) {
                warn!(
                    service = %self.service,
                    measurement = %measurement,
                    error = %e,
                    "failed to report measurement"
                );
            }
        }
    }

    /// Current sizing regime.
    pub fn mode(&self) -> ScaleMode {
        match self.lock().mode {
            Mode::Stable => ScaleMode::Stable,
            Mode::Panicking { .. } => ScaleMode::Panicking,
        }
    }

    /// Number of samples currently buffered.
    pub fn stat_count(&self) -> usize {
        self.lock().stats.len()
    }

    /// Number of one-second buckets currently buffered.
    pub fn stat_buckets(&self) -> usize {
        self.lock().stats.bucket_count()
    }

    fn lock(&self) -> MutexGuard<'_, ScalerState> {
        // The state is consistent after every statement that mutates it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Replicas needed to serve the window's load at `target` per replica.
fn desired_pods(avg: &WindowAverage, target: f64) -> u32 {
    (avg.observed_load() / target).ceil() as u32
}

fn scale_up_limit(replicas: usize, rate: f64) -> u32 {
    (replicas as f64 * rate).ceil() as u32
}

fn elapsed(since: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(since).unwrap_or_default()
}
