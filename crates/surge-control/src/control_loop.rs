//! Scale loop — periodic decisions for every registered service.
//!
//! Each tick runs `scale()` on every autoscaler in the registry. `ScaleTo`
//! decisions are handed to the scale callback, which applies them to the
//! orchestrator; `NoChange` leaves the service alone.

use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use surge_autoscale::ScaleDecision;

use crate::registry::ScalerRegistry;

/// Callback type for applying scaling decisions.
///
/// The loop calls this with (service, target_replicas).
pub type ScaleCallback = Box<dyn Fn(&str, u32) -> BoxFuture + Send + Sync>;

type BoxFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
>;

/// Evaluates all registered autoscalers on an interval.
pub struct ScaleLoop {
    registry: ScalerRegistry,
    /// Callback to apply scaling.
    scale_fn: Option<ScaleCallback>,
}

impl ScaleLoop {
    pub fn new(registry: ScalerRegistry) -> Self {
        Self {
            registry,
            scale_fn: None,
        }
    }

    /// Set the callback used to apply scaling decisions.
    pub fn with_scale_fn(mut self, f: ScaleCallback) -> Self {
        self.scale_fn = Some(f);
        self
    }

    /// Evaluate every registered service at `now`.
    ///
    /// Callback failures are logged and do not stop the remaining
    /// services from being evaluated.
    pub async fn evaluate_all(&self, now: SystemTime) -> Vec<(String, ScaleDecision)> {
        // Snapshot the registry so the lock is not held across callbacks.
        let entries = self.registry.entries().await;
        let mut decisions = Vec::with_capacity(entries.len());

        for (service, scaler) in entries {
            let decision = scaler.scale(now);

            match decision {
                ScaleDecision::ScaleTo(target) => {
                    if let Some(ref scale_fn) = self.scale_fn
                        && let Err(e) = scale_fn(&service, target).await
                    {
                        warn!(
                            %service,
                            target,
                            error = %e,
                            "scaling action failed"
                        );
                    }
                }
                ScaleDecision::NoChange => {
                    debug!(%service, "no scaling decision");
                }
            }

            decisions.push((service, decision));
        }

        decisions
    }

    /// Run the scale loop until shutdown.
    pub async fn run(
        &self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(
            interval_ms = interval.as_millis() as u64,
            "scale loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.evaluate_all(SystemTime::now()).await;
                }
                _ = shutdown.changed() => {
                    info!("scale loop shutting down");
                    break;
                }
            }
        }
    }
}
