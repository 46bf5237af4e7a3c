//! Observer client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use depthcast_core::FrameSize;

/// Top-level configuration for the observer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ObserverConfig {
    pub network: NetworkConfig,
    /// Frame geometry; must match the provider's sensor stream.
    pub stream: FrameSize,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Provider address (IP:port).
    pub provider_address: String,
    /// Connect and stream-description timeout in milliseconds.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Ask for the intrinsics table along with the first frame.
    pub want_intrinsics: bool,
    /// Write each received table here as `x\ty` lines. Empty disables.
    pub intrinsics_export: String,
    /// Seconds between frame summaries in the log.
    pub report_interval_secs: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            provider_address: "127.0.0.1:7340".into(),
            timeout_ms: 5000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            want_intrinsics: true,
            intrinsics_export: String::new(),
            report_interval_secs: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ObserverConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn frame_size(&self) -> FrameSize {
        self.stream
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.network.timeout_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.capture.report_interval_secs.max(1))
    }

    pub fn export_path(&self) -> Option<PathBuf> {
        let path = self.capture.intrinsics_export.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ObserverConfig::default()).unwrap();
        assert!(text.contains("provider_address"));
        assert!(text.contains("want_intrinsics"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&ObserverConfig::default()).unwrap();
        let parsed: ObserverConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.frame_size(), FrameSize::SENSOR_DEFAULT);
        assert_eq!(parsed.network.provider_address, "127.0.0.1:7340");
        assert!(parsed.export_path().is_none());
    }

    #[test]
    fn export_path_set() {
        let cfg: ObserverConfig = toml::from_str(
            r#"
            [stream]
            height = 288

            [capture]
            intrinsics_export = "table.tsv"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.frame_size(), FrameSize::new(448, 288));
        assert_eq!(cfg.export_path(), Some(PathBuf::from("table.tsv")));
        assert!(cfg.capture.want_intrinsics);
    }
}
