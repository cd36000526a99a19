//! surge-autoscale — concurrency-driven replica decisions.
//!
//! Consumes per-replica concurrency samples via [`Autoscaler::record`] and
//! answers "how many replicas should this service run right now?" via
//! [`Autoscaler::scale`]. It never talks to an orchestrator; the caller
//! applies the decision.
//!
//! # Scaling Algorithm
//!
//! ```text
//! trim samples older than now - stable_window
//!
//! stable = mean(samples in [now - stable_window, now)),  n = distinct replicas
//! panic  = mean(samples in [now - panic_window,  now)),  m = distinct replicas
//!
//! desired_stable = ceil(stable * n / target)
//! candidate      = min(ceil(panic * m / target), ceil(n * max_scale_up_rate))
//!
//! if panic >= 2 * target:
//!     enter (or extend) panic mode, panicking_since = now
//! if panicking and now - panicking_since >= stable_window:
//!     leave panic mode
//!
//! panicking:  desired = max_panic_pods = max(max_panic_pods, candidate)
//! stable:     desired = desired_stable
//!
//! if stable == 0:
//!     desired = idle >= scale_to_zero_threshold ? 0 : max(desired, 1)
//!
//! ScaleTo(min(desired, ceil(n * max_scale_up_rate)))
//! ```
//!
//! The panic window reacts within seconds; leaving panic mode takes a full
//! stable window without a fresh trigger, so a spike never causes a
//! scale-down while it is still settling.

pub mod config;
pub mod error;
pub mod reporter;
pub mod scaler;
pub mod stats;

pub use config::{AutoscalerConfig, ConfigProvider, SharedConfig};
pub use error::{ConfigError, ConfigResult};
pub use reporter::{Measurement, NoopReporter, Reporter};
pub use scaler::{Autoscaler, ScaleDecision, ScaleMode};
pub use stats::{Stat, StatsBuffer, WindowAverage};
