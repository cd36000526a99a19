//! surge-metrics — observability sinks for the autoscaler.
//!
//! Collects the measurements each autoscaler reports after a decision and
//! renders them in the Prometheus text exposition format.
//!
//! # Architecture
//!
//! ```text
//! GaugeRegistry
//!   ├── reporter(service) → ServiceReporter (implements Reporter)
//!   │     └── report() ← called by Autoscaler::scale
//!   ├── snapshot() → Vec<GaugeSample>
//!   └── forget(service)
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod prometheus;
pub mod registry;

pub use prometheus::render_prometheus;
pub use registry::{GaugeRegistry, GaugeSample, ServiceReporter};
