//! surge-control — drives autoscalers on a tick.
//!
//! Owns one [`Autoscaler`](surge_autoscale::Autoscaler) per service,
//! routes incoming samples to it, evaluates every service periodically
//! and hands `ScaleTo` decisions to a callback that applies them.
//!
//! # Architecture
//!
//! ```text
//! ScalerRegistry
//!   ├── register(service, autoscaler)
//!   └── record(service, stat) ← called by the metrics ingestion path
//!
//! ScaleLoop
//!   ├── evaluate_all(now) → scale() per service → ScaleCallback
//!   └── run() → periodic evaluation until shutdown
//!
//! ConfigWatcher
//!   └── run() → reloads SharedConfig when the TOML file changes
//! ```

pub mod control_loop;
pub mod registry;
pub mod watcher;

pub use control_loop::{ScaleCallback, ScaleLoop};
pub use registry::ScalerRegistry;
pub use watcher::ConfigWatcher;
