//! Gauge registry — latest autoscaler measurement per service.
//!
//! Each autoscaler gets a [`ServiceReporter`] bound to its service name.
//! Reports overwrite the previous value; the registry keeps no history.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use surge_autoscale::{Measurement, Reporter};

/// The latest value of one measurement for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    pub service: String,
    pub measurement: Measurement,
    pub value: f64,
}

type Gauges = BTreeMap<(String, Measurement), f64>;

/// Shared store of the most recent measurement values.
#[derive(Debug, Clone, Default)]
pub struct GaugeRegistry {
    gauges: Arc<RwLock<Gauges>>,
}

impl GaugeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that labels everything with `service`.
    pub fn reporter(&self, service: &str) -> ServiceReporter {
        ServiceReporter {
            service: service.to_string(),
            gauges: Arc::clone(&self.gauges),
        }
    }

    /// Latest value for a service's measurement, if any was reported.
    pub fn get(&self, service: &str, measurement: Measurement) -> Option<f64> {
        let gauges = self.gauges.read().unwrap_or_else(|e| e.into_inner());
        gauges.get(&(service.to_string(), measurement)).copied()
    }

    /// All current values, ordered by service then measurement.
    pub fn snapshot(&self) -> Vec<GaugeSample> {
        let gauges = self.gauges.read().unwrap_or_else(|e| e.into_inner());
        gauges
            .iter()
            .map(|((service, measurement), value)| GaugeSample {
                service: service.clone(),
                measurement: *measurement,
                value: *value,
            })
            .collect()
    }

    /// Drop every value reported for `service`.
    pub fn forget(&self, service: &str) {
        let mut gauges = self.gauges.write().unwrap_or_else(|e| e.into_inner());
        gauges.retain(|(s, _), _| s != service);
        debug!(%service, "dropped service gauges");
    }
}

/// [`Reporter`] writing into a [`GaugeRegistry`] under one service label.
#[derive(Debug, Clone)]
pub struct ServiceReporter {
    service: String,
    gauges: Arc<RwLock<Gauges>>,
}

impl Reporter for ServiceReporter {
    fn report(&self, measurement: Measurement, value: f64) -> anyhow::Result<()> {
        if !value.is_finite() {
            anyhow::bail!("{measurement} value is not finite: {value}");
        }
        let mut gauges = self.gauges.write().unwrap_or_else(|e| e.into_inner());
        gauges.insert((self.service.clone(), measurement), value);
        Ok(())
    }
}
