//! Observability boundary — named measurements emitted per decision.
//!
//! The autoscaler pushes values into a [`Reporter`] after every decision.
//! Reporting is best-effort: errors are logged by the caller and never
//! change the decision.

use std::fmt;

/// A named measurement produced by the autoscaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measurement {
    /// Replica count the autoscaler wants.
    DesiredPods,
    /// Distinct replicas that reported within the stable window.
    ObservedPods,
    /// Average concurrency per replica over the stable window.
    StableRequestConcurrency,
    /// Average concurrency per replica over the panic window.
    PanicRequestConcurrency,
    /// Configured target concurrency per replica.
    TargetConcurrencyPerPod,
    /// 1 while in panic mode, 0 otherwise.
    PanicMode,
}

impl Measurement {
    pub const ALL: [Measurement; 6] = [
        Measurement::DesiredPods,
        Measurement::ObservedPods,
        Measurement::StableRequestConcurrency,
        Measurement::PanicRequestConcurrency,
        Measurement::TargetConcurrencyPerPod,
        Measurement::PanicMode,
    ];

    /// Stable snake-case name used by sinks.
    pub fn name(&self) -> &'static str {
        match self {
            Measurement::DesiredPods => "desired_pods",
            Measurement::ObservedPods => "observed_pods",
            Measurement::StableRequestConcurrency => "stable_request_concurrency",
            Measurement::PanicRequestConcurrency => "panic_request_concurrency",
            Measurement::TargetConcurrencyPerPod => "target_concurrency_per_pod",
            Measurement::PanicMode => "panic_mode",
        }
    }

    /// One-line description for exposition formats.
    pub fn help(&self) -> &'static str {
        match self {
            Measurement::DesiredPods => "Number of replicas the autoscaler wants.",
            Measurement::ObservedPods => "Replicas that reported within the stable window.",
            Measurement::StableRequestConcurrency => {
                "Average concurrent requests per replica over the stable window."
            }
            Measurement::PanicRequestConcurrency => {
                "Average concurrent requests per replica over the panic window."
            }
            Measurement::TargetConcurrencyPerPod => "Target concurrent requests per replica.",
            Measurement::PanicMode => "1 if the autoscaler is in panic mode, 0 otherwise.",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sink for autoscaler measurements.
pub trait Reporter: Send + Sync {
    fn report(&self, measurement: Measurement, value: f64) -> anyhow::Result<()>;
}

/// Reporter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _measurement: Measurement, _value: f64) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn report(&self, measurement: Measurement, value: f64) -> anyhow::Result<()> {
        (**self).report(measurement, value)
    }
}
