use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::DEFAULT_TARGETS;
use crate::ingest::CaptureSettings;

const DEFAULT_COOLDOWN_SECS: f64 = 5.0;
const DEFAULT_MODEL_NAME: &str = "yolov5s";
const DEFAULT_MODEL_PATH: &str = "yolov5s.onnx";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.45;

pub const MODEL_BACKEND_TRACT: &str = "tract";
pub const MODEL_BACKEND_STUB: &str = "stub";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    targets: Option<Vec<String>>,
    cooldown_secs: Option<f64>,
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
    audio: Option<AudioConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    backends: Option<Vec<String>>,
    device_index: Option<u32>,
    index_sweep: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    reconnect_backend: Option<String>,
    reconnect_pause_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    backend: Option<String>,
    name: Option<String>,
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AudioConfigFile {
    search_locations: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub targets: Vec<String>,
    pub cooldown_secs: f64,
    pub camera: CaptureSettings,
    pub model: ModelSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub backend: String,
    pub name: String,
    pub path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioSettings {
    /// Overrides the default search locations when set.
    pub search_locations: Option<Vec<PathBuf>>,
}

impl ModelSettings {
    /// Backend to run. `stub` is used for synthetic runs or when configured
    /// explicitly; it is never a silent default for a live camera.
    pub fn backend_for(&self, synthetic: bool) -> &str {
        if synthetic {
            MODEL_BACKEND_STUB
        } else {
            &self.backend
        }
    }
}

impl AppConfig {
    /// Load from `VEHICLE_ALERT_CONFIG` (if set), then apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VEHICLE_ALERT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = CaptureSettings::default();
        let camera_file = file.camera.unwrap_or_default();
        let camera = CaptureSettings {
            backends: camera_file.backends.unwrap_or(defaults.backends),
            device_index: camera_file.device_index.unwrap_or(defaults.device_index),
            index_sweep: camera_file.index_sweep.unwrap_or(defaults.index_sweep),
            width: camera_file.width.unwrap_or(defaults.width),
            height: camera_file.height.unwrap_or(defaults.height),
            fps: camera_file.fps.unwrap_or(defaults.fps),
            reconnect_backend: camera_file
                .reconnect_backend
                .unwrap_or(defaults.reconnect_backend),
            reconnect_pause: camera_file
                .reconnect_pause_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_pause),
        };

        let model_file = file.model.unwrap_or_default();
        let model = ModelSettings {
            backend: model_file
                .backend
                .unwrap_or_else(|| MODEL_BACKEND_TRACT.to_string()),
            name: model_file
                .name
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            path: model_file
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_width: model_file.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: model_file.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            confidence_threshold: model_file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE),
            iou_threshold: model_file.iou_threshold.unwrap_or(DEFAULT_IOU),
        };

        Self {
            targets: file
                .targets
                .unwrap_or_else(|| DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect()),
            cooldown_secs: file.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS),
            camera,
            model,
            audio: AudioSettings {
                search_locations: file.audio.and_then(|audio| audio.search_locations),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(targets) = std::env::var("VEHICLE_ALERT_TARGETS") {
            let parsed = split_csv(&targets);
            if !parsed.is_empty() {
                self.targets = parsed;
            }
        }
        if let Ok(cooldown) = std::env::var("VEHICLE_ALERT_COOLDOWN_SECS") {
            self.cooldown_secs = cooldown.trim().parse().map_err(|_| {
                anyhow!("VEHICLE_ALERT_COOLDOWN_SECS must be a number of seconds")
            })?;
        }
        if let Ok(backends) = std::env::var("VEHICLE_ALERT_CAMERA_BACKENDS") {
            let parsed = split_csv(&backends);
            if !parsed.is_empty() {
                self.camera.backends = parsed;
            }
        }
        if let Ok(index) = std::env::var("VEHICLE_ALERT_DEVICE_INDEX") {
            self.camera.device_index = index
                .trim()
                .parse()
                .map_err(|_| anyhow!("VEHICLE_ALERT_DEVICE_INDEX must be a device index"))?;
        }
        if let Ok(path) = std::env::var("VEHICLE_ALERT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("VEHICLE_ALERT_MODEL_BACKEND") {
            if !backend.trim().is_empty() {
                self.model.backend = backend.trim().to_string();
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.targets = self
            .targets
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if self.targets.is_empty() {
            return Err(anyhow!("at least one target class is required"));
        }
        if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
            return Err(anyhow!("cooldown must be a non-negative number of seconds"));
        }
        if self.camera.backends.is_empty() {
            return Err(anyhow!("at least one camera backend is required"));
        }
        if self.camera.index_sweep == 0 {
            return Err(anyhow!("camera index sweep must be at least 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 || self.camera.fps == 0 {
            return Err(anyhow!("camera width, height and fps must be greater than zero"));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        for (name, value) in [
            ("confidence_threshold", self.model.confidence_threshold),
            ("iou_threshold", self.model.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("model {} must be within 0..=1", name));
            }
        }
        if ![MODEL_BACKEND_TRACT, MODEL_BACKEND_STUB].contains(&self.model.backend.as_str()) {
            return Err(anyhow!(
                "unknown model backend '{}' (expected tract or stub)",
                self.model.backend
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vehicle_deployment() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.targets, vec!["car", "bus", "truck", "motorcycle"]);
        assert_eq!(cfg.cooldown_secs, 5.0);
        assert_eq!(cfg.camera, CaptureSettings::default());
        assert_eq!(cfg.model.name, "yolov5s");
        assert_eq!(cfg.model.input_width, 640);
        assert_eq!(cfg.audio, AudioSettings::default());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.cooldown_secs = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.targets = vec![" ".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.camera.index_sweep = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.model.backend = "torch".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stub_model_only_when_synthetic_or_explicit() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.model.backend_for(false), MODEL_BACKEND_TRACT);
        assert_eq!(cfg.model.backend_for(true), MODEL_BACKEND_STUB);

        cfg.model.backend = MODEL_BACKEND_STUB.to_string();
        assert_eq!(cfg.model.backend_for(false), MODEL_BACKEND_STUB);
    }

    #[test]
    fn validation_normalises_targets() {
        let mut cfg = AppConfig::default();
        cfg.targets = vec![" Car ".to_string(), "BUS".to_string()];
        cfg.validate().expect("valid config");
        assert_eq!(cfg.targets, vec!["car", "bus"]);
    }

    #[test]
    fn split_csv_drops_empty_entries() {
        assert_eq!(split_csv(" car, ,bus,"), vec!["car", "bus"]);
    }
}
