//! Autoscaler configuration and the hot-reloadable provider.
//!
//! The engine never caches configuration: it calls
//! [`ConfigProvider::current`] at the start of every decision, so a
//! [`SharedConfig`] updated between ticks takes effect on the next one.
//!
//! # Example
//!
//! ```toml
//! target_concurrency = 10.0
//! max_scale_up_rate = 10.0
//! stable_window = "60s"
//! panic_window = "6s"
//! scale_to_zero_threshold = "5m"
//! ```

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};

/// Tunable thresholds read by the autoscaler on every decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoscalerConfig {
    /// Desired average in-flight requests per replica.
    pub target_concurrency: f64,
    /// Upper bound on the ratio desired / observed replicas per decision.
    pub max_scale_up_rate: f64,
    /// Averaging horizon for steady-state sizing and sample retention.
    #[serde(with = "duration_str")]
    pub stable_window: Duration,
    /// Short horizon used to detect load spikes.
    #[serde(with = "duration_str")]
    pub panic_window: Duration,
    /// How long zero traffic must persist before scaling to zero.
    #[serde(with = "duration_str")]
    pub scale_to_zero_threshold: Duration,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            target_concurrency: 1.0,
            max_scale_up_rate: 10.0,
            stable_window: Duration::from_secs(60),
            panic_window: Duration::from_secs(6),
            scale_to_zero_threshold: Duration::from_secs(5 * 60),
        }
    }
}

impl AutoscalerConfig {
    /// Config with the given target and defaults for everything else.
    pub fn with_target(target_concurrency: f64) -> Self {
        Self {
            target_concurrency,
            ..Self::default()
        }
    }

    /// Check that the values describe a usable autoscaler.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.target_concurrency.is_finite() || self.target_concurrency <= 0.0 {
            return Err(ConfigError::TargetConcurrency(self.target_concurrency));
        }
        if !self.max_scale_up_rate.is_finite() || self.max_scale_up_rate <= 1.0 {
            return Err(ConfigError::MaxScaleUpRate(self.max_scale_up_rate));
        }
        if self.stable_window.is_zero() {
            return Err(ConfigError::EmptyStableWindow);
        }
        if self.panic_window.is_zero() {
            return Err(ConfigError::EmptyPanicWindow);
        }
        if self.panic_window >= self.stable_window {
            return Err(ConfigError::InvertedWindows {
                panic: self.panic_window,
                stable: self.stable_window,
            });
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: AutoscalerConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Source of the configuration the autoscaler reads on every decision.
pub trait ConfigProvider: Send + Sync {
    /// The configuration in effect right now.
    fn current(&self) -> AutoscalerConfig;
}

impl ConfigProvider for AutoscalerConfig {
    fn current(&self) -> AutoscalerConfig {
        *self
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for Arc<T> {
    fn current(&self) -> AutoscalerConfig {
        (**self).current()
    }
}

/// A configuration that can be swapped at runtime.
///
/// Clones share the same underlying value. Updates are validated first;
/// a rejected update leaves the previous value in place.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<AutoscalerConfig>>,
}

impl SharedConfig {
    pub fn new(config: AutoscalerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the configuration if it validates.
    pub fn set(&self, config: AutoscalerConfig) -> ConfigResult<()> {
        config.validate()?;
        let mut current = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *current = config;
        Ok(())
    }

    /// Apply an edit to a copy of the current configuration and store it
    /// if the result validates.
    pub fn update(&self, edit: impl FnOnce(&mut AutoscalerConfig)) -> ConfigResult<()> {
        let mut next = self.current();
        edit(&mut next);
        self.set(next)
    }

    /// Re-read a TOML file. Parse or validation failures are logged and
    /// the previous configuration is kept.
    pub fn reload_from_file(&self, path: &Path) -> anyhow::Result<()> {
        let loaded = match AutoscalerConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config reload failed, keeping previous");
                return Err(e);
            }
        };
        if let Err(e) = self.set(loaded) {
            warn!(path = %path.display(), error = %e, "reloaded config rejected, keeping previous");
            return Err(e.into());
        }
        info!(path = %path.display(), "autoscaler config reloaded");
        Ok(())
    }
}

impl ConfigProvider for SharedConfig {
    fn current(&self) -> AutoscalerConfig {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse a duration string like "500ms", "6s", "5m", "1h".
///
/// A bare integer is taken as seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::Duration(s.to_string());

    let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else {
        (s, 1_000)
    };

    let value = digits.trim().parse::<u64>().map_err(|_| invalid())?;
    let millis = value.checked_mul(unit_ms).ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}

/// Render a duration in the largest unit that represents it exactly.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1_000 != 0 {
        format!("{millis}ms")
    } else if millis != 0 && millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis != 0 && millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else {
        format!("{}s", millis / 1_000)
    }
}

mod duration_str {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Secs(u64),
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        }
    }
}
