//! Configuration for the depth provider.

use std::path::Path;

use serde::{Deserialize, Serialize};

use depthcast_core::depth::DEFAULT_COMPRESSION_LEVEL;
use depthcast_core::{ControllerConfig, FrameSize};

use crate::synthetic::SyntheticConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub network: NetworkConfig,
    /// Stream selection and the synthetic sensor's geometry.
    pub stream: StreamConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address observers connect to.
    pub listen_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Substring the selected stream's name must contain.
    pub name_filter: String,
    /// Substring the selected stream's id must contain.
    pub id_filter: String,
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frames buffered between the capture thread and the controller.
    pub frame_queue: usize,
    /// zstd level (1 = fastest).
    pub compression_level: i32,
    /// Unit-plane radius of the synthetic lens's valid area.
    pub valid_radius: f32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:7340".into(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        let size = FrameSize::SENSOR_DEFAULT;
        Self {
            name_filter: "Sensor Streaming".into(),
            id_filter: "Source#2".into(),
            width: size.width,
            height: size.height,
            framerate: 5.0,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_queue: 4,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            valid_radius: 1.2,
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

impl ProviderConfig {
    /// Load configuration from a TOML file, falling back to defaults.
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
        FrameSize::new(self.stream.width, self.stream.height)
    }

    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            name_filter: self.stream.name_filter.clone(),
            id_filter: self.stream.id_filter.clone(),
            frame_queue: self.capture.frame_queue.max(1),
            compression_level: self.capture.compression_level,
        }
    }

    /// The synthetic sensor advertises itself under the configured
    /// filters so the default setup selects it.
    pub fn to_device_config(&self) -> SyntheticConfig {
        SyntheticConfig {
            sensor_name: self.stream.name_filter.clone(),
            sensor_id: self.stream.id_filter.clone(),
            size: self.frame_size(),
            framerate: self.stream.framerate,
            valid_radius: self.capture.valid_radius,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ProviderConfig::default()).unwrap();
        assert!(text.contains("listen_address"));
        assert!(text.contains("name_filter"));
        assert!(text.contains("compression_level"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ProviderConfig = toml::from_str(
            r#"
            [stream]
            width = 320
            height = 240
            "#,
        )
        .unwrap();
        assert_eq!(cfg.frame_size(), FrameSize::new(320, 240));
        assert_eq!(cfg.stream.id_filter, "Source#2");
        assert_eq!(cfg.network.listen_address, "0.0.0.0:7340");
    }

    #[test]
    fn controller_config_clamps_queue() {
        let mut cfg = ProviderConfig::default();
        cfg.capture.frame_queue = 0;
        let ctrl = cfg.to_controller_config();
        assert_eq!(ctrl.frame_queue, 1);
        assert_eq!(ctrl.name_filter, "Sensor Streaming");
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = ProviderConfig::load(Path::new("/nonexistent/depthcast-provider.toml"));
        assert_eq!(cfg.logging.level, "info");
    }
}
