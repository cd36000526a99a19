//! Config watcher — hot reload of the autoscaler TOML file.
//!
//! Polls the file's modification time and reloads the shared config when
//! it changes. A bad edit is logged and the previous config stays active.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use surge_autoscale::SharedConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    config: SharedConfig,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>, config: SharedConfig) -> Self {
        Self {
            path: path.into(),
            config,
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload if the file changed since the last poll.
    ///
    /// Returns `Ok(true)` when a new config was applied. A file that fails
    /// to parse or validate is not retried until it changes again.
    pub fn poll(&mut self) -> anyhow::Result<bool> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(false);
        }

        self.last_modified = Some(modified);
        self.config.reload_from_file(&self.path)?;
        Ok(true)
    }

    /// Poll on an interval until shutdown.
    pub async fn run(
        mut self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(path = %self.path.display(), "config watcher started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.poll() {
                        Ok(true) => debug!(path = %self.path.display(), "config changed"),
                        Ok(false) => {}
                        Err(e) => warn!(path = %self.path.display(), error = %e, "config poll failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("config watcher shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use surge_autoscale::{AutoscalerConfig, ConfigProvider};

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("surge-{name}-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn write_with_mtime(path: &Path, content: &str, mtime_secs: u64) {
        std::fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .unwrap();
    }

    #[test]
    fn poll_reloads_only_on_change() {
        let dir = TempDir::new("watch-change");
        let path = dir.0.join("autoscaler.toml");
        write_with_mtime(&path, "target_concurrency = 5.0\n", 1_000);

        let config = SharedConfig::new(AutoscalerConfig::with_target(1.0));
        let mut watcher = ConfigWatcher::new(&path, config.clone());

        assert!(watcher.poll().unwrap());
        assert_eq!(config.current().target_concurrency, 5.0);
        assert!(!watcher.poll().unwrap());

        write_with_mtime(&path, "target_concurrency = 8.0\n", 2_000);
        assert!(watcher.poll().unwrap());
        assert_eq!(config.current().target_concurrency, 8.0);
    }

    #[test]
    fn bad_edit_keeps_previous_config() {
        let dir = TempDir::new("watch-bad");
        let path = dir.0.join("autoscaler.toml");
        write_with_mtime(&path, "target_concurrency = 5.0\n", 1_000);

        let config = SharedConfig::new(AutoscalerConfig::with_target(1.0));
        let mut watcher = ConfigWatcher::new(&path, config.clone());
        watcher.poll().unwrap();

        write_with_mtime(&path, "max_scale_up_rate = 0.5\n", 2_000);
        assert!(watcher.poll().is_err());
        assert_eq!(config.current().target_concurrency, 5.0);
        assert_eq!(config.current().max_scale_up_rate, 10.0);

        // Not retried until the file changes again.
        assert!(!watcher.poll().unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new("watch-missing");
        let config = SharedConfig::default();
        let mut watcher = ConfigWatcher::new(dir.0.join("absent.toml"), config);

        assert!(watcher.poll().is_err());
    }
}
