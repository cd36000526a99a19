//! Per-service autoscaler registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use surge_autoscale::{Autoscaler, Stat};

/// Autoscalers keyed by service name. Clones share the same map.
#[derive(Clone, Default)]
pub struct ScalerRegistry {
    scalers: Arc<RwLock<HashMap<String, Arc<Autoscaler>>>>,
}

impl ScalerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an autoscaler, replacing any previous one for the service.
    pub async fn register(&self, service: &str, autoscaler: Arc<Autoscaler>) {
        let mut scalers = self.scalers.write().await;
        if scalers.insert(service.to_string(), autoscaler).is_some() {
            info!(%service, "replaced autoscaler");
        } else {
            info!(%service, "registered autoscaler");
        }
    }

    /// Remove a service. Its buffered samples are dropped with it.
    pub async fn unregister(&self, service: &str) -> Option<Arc<Autoscaler>> {
        let mut scalers = self.scalers.write().await;
        let removed = scalers.remove(service);
        if removed.is_some() {
            info!(%service, "unregistered autoscaler");
        }
        removed
    }

    pub async fn get(&self, service: &str) -> Option<Arc<Autoscaler>> {
        let scalers = self.scalers.read().await;
        scalers.get(service).cloned()
    }

    /// Route a sample to its service's autoscaler.
    ///
    /// Returns `false` (and drops the sample) for unknown services.
    pub async fn record(&self, service: &str, stat: Stat) -> bool {
        let scalers = self.scalers.read().await;
        match scalers.get(service) {
            Some(scaler) => {
                scaler.record(stat);
                true
            }
            None => {
                debug!(%service, replica = %stat.replica_id, "sample for unknown service dropped");
                false
            }
        }
    }

    /// Registered service names, sorted.
    pub async fn services(&self) -> Vec<String> {
        let scalers = self.scalers.read().await;
        let mut names: Vec<String> = scalers.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered autoscalers, sorted by service name.
    pub(crate) async fn entries(&self) -> Vec<(String, Arc<Autoscaler>)> {
        let scalers = self.scalers.read().await;
        let mut entries: Vec<_> = scalers
            .iter()
            .map(|(name, scaler)| (name.clone(), Arc::clone(scaler)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
