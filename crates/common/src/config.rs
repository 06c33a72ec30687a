//! Application configuration.
//!
//! Every tunable used by the admission pipeline lives here so that window
//! shape, thresholds, and cooldowns can be changed per deployment without
//! touching the gate logic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SigngateError, SigngateResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where samples and models live.
    pub paths: PathsConfig,

    /// Window length and landmark layout.
    pub window: WindowConfig,

    /// Capture-mode defaults.
    pub capture: CaptureDefaults,

    /// Recognition-mode defaults.
    pub recognition: RecognitionDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory for captured samples (`<root>/<label>/*.json`).
    pub samples_dir: PathBuf,

    /// Directory holding classifier artifacts and label maps.
    pub models_dir: PathBuf,
}

/// Sliding window shape.
///
/// The feature dimension is `slots * points_per_set * coords`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Number of frames per window (N).
    pub length: usize,

    /// Landmark sets per frame (e.g. 2 hands).
    pub slots: usize,

    /// Points per landmark set (21 for a hand).
    pub points_per_set: usize,

    /// Scalars per point (x, y, z).
    pub coords: usize,
}

/// Weights of the composite quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub completeness: f64,
    pub consistency: f64,
    pub motion_variance: f64,
    pub spatial_spread: f64,
}

/// Quality scorer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Sub-metric weights.
    pub weights: QualityWeights,

    /// Multiplier applied to the variance of present entries before clamping.
    pub motion_scale: f64,

    /// Multiplier applied to the standard deviation of present entries.
    pub spread_scale: f64,
}

/// What happens to the window after the gate emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterEmit {
    /// Empty the window; the next decision needs a full refill.
    Clear,
    /// Keep sliding.
    Keep,
}

/// Debounce gate tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Consecutive qualifying ticks required before emitting.
    pub stable_frames: u32,

    /// Minimum time between any two emissions (seconds).
    pub min_interval_secs: f64,

    /// Minimum time before the same key may be emitted again (seconds).
    pub repeat_cooldown_secs: f64,

    /// Window policy after an emission.
    pub after_emit: AfterEmit,
}

/// Augmentation tuning for captured samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    /// Variants written per capture (K).
    pub variants: usize,

    /// Standard deviation of the additive noise.
    pub noise_std: f32,

    /// Absolute bound applied to each noise draw.
    pub noise_clip: f32,

    /// Lower bound of the rescale factor.
    pub scale_min: f32,

    /// Upper bound of the rescale factor.
    pub scale_max: f32,

    /// Largest circular time shift, in frames.
    pub max_shift_frames: usize,

    /// Fixed seed for reproducible variants.
    pub seed: Option<u64>,
}

/// Capture-mode parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Normalize frames before they enter the window.
    pub normalize: bool,

    /// Composite score a window must exceed to qualify.
    pub quality_threshold: f64,

    /// Quality scorer tuning.
    pub quality: QualityConfig,

    /// Debounce gate tuning.
    pub gate: GateConfig,

    /// Stop the session after this many captures.
    pub target_samples: Option<u32>,

    /// Variants written per capture.
    pub augmentation: AugmentationConfig,
}

/// Recognition-mode parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionDefaults {
    /// Normalize frames before they enter the window.
    pub normalize: bool,

    /// Top probability a window must exceed.
    pub confidence_threshold: f64,

    /// Gap between top and runner-up probabilities a window must exceed.
    pub margin_threshold: f64,

    /// Windows at or below this present ratio are not classified.
    pub min_completeness: f64,

    /// Reset the window when a frame carries no landmarks at all.
    pub reset_on_empty_frame: bool,

    /// Debounce gate tuning.
    pub gate: GateConfig,

    /// Per-call classifier timeout in milliseconds.
    pub classifier_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "signgate=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            samples_dir: data.join("samples"),
            models_dir: data.join("models"),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length: 15,
            slots: 2,
            points_per_set: 21,
            coords: 3,
        }
    }
}

impl WindowConfig {
    /// Scalars per frame (D).
    pub fn feature_dim(&self) -> usize {
        self.slots * self.points_per_set * self.coords
    }
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completeness: 0.4,
            consistency: 0.2,
            motion_variance: 0.2,
            spatial_spread: 0.2,
        }
    }
}

impl QualityWeights {
    fn values(&self) -> [f64; 4] {
        [
            self.completeness,
            self.consistency,
            self.motion_variance,
            self.spatial_spread,
        ]
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            weights: QualityWeights::default(),
            motion_scale: 1000.0,
            spread_scale: 10.0,
        }
    }
}

impl GateConfig {
    /// Capture gate: 3 stable windows, 2 s between captures, window keeps sliding.
    pub fn capture() -> Self {
        Self {
            stable_frames: 3,
            min_interval_secs: 2.0,
            repeat_cooldown_secs: 2.0,
            after_emit: AfterEmit::Keep,
        }
    }

    /// Recognition gate: 3 stable windows, same label re-announced after 3 s.
    pub fn recognition() -> Self {
        Self {
            stable_frames: 3,
            min_interval_secs: 0.0,
            repeat_cooldown_secs: 3.0,
            after_emit: AfterEmit::Clear,
        }
    }
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            variants: 3,
            noise_std: 0.001,
            noise_clip: 0.004,
            scale_min: 0.98,
            scale_max: 1.02,
            max_shift_frames: 2,
            seed: None,
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            normalize: false,
            quality_threshold: 0.7,
            quality: QualityConfig::default(),
            gate: GateConfig::capture(),
            target_samples: Some(25),
            augmentation: AugmentationConfig::default(),
        }
    }
}

impl Default for RecognitionDefaults {
    fn default() -> Self {
        Self {
            normalize: true,
            confidence_threshold: 0.6,
            margin_threshold: 0.3,
            min_completeness: 0.4,
            reset_on_empty_frame: true,
            gate: GateConfig::recognition(),
            classifier_timeout_ms: 250,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit file.
    pub fn load_from(path: impl AsRef<Path>) -> SigngateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SigngateError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> SigngateResult<()> {
        if self.window.length < 2 {
            return Err(SigngateError::config(
                "window.length must be at least 2 frames",
            ));
        }
        if self.window.feature_dim() == 0 {
            return Err(SigngateError::config(
                "window layout must yield a non-zero feature dimension",
            ));
        }

        let capture = &self.capture;
        check_unit("capture.quality_threshold", capture.quality_threshold)?;
        if capture.quality.weights.values().iter().any(|w| *w < 0.0) {
            return Err(SigngateError::config("quality weights must be non-negative"));
        }
        if capture.quality.motion_scale < 0.0 || capture.quality.spread_scale < 0.0 {
            return Err(SigngateError::config("quality scales must be non-negative"));
        }
        check_gate("capture.gate", &capture.gate)?;

        let aug = &capture.augmentation;
        if aug.variants == 0 {
            return Err(SigngateError::config(
                "capture.augmentation.variants must be at least 1",
            ));
        }
        if aug.noise_std < 0.0 || aug.noise_clip < 0.0 {
            return Err(SigngateError::config(
                "augmentation noise parameters must be non-negative",
            ));
        }
        if !(aug.scale_min > 0.0 && aug.scale_min <= aug.scale_max) {
            return Err(SigngateError::config(
                "augmentation scale band must satisfy 0 < scale_min <= scale_max",
            ));
        }
        if aug.max_shift_frames == 0 || aug.max_shift_frames >= self.window.length {
            return Err(SigngateError::config(
                "augmentation max_shift_frames must be in 1..window.length",
            ));
        }

        let recognition = &self.recognition;
        check_unit(
            "recognition.confidence_threshold",
            recognition.confidence_threshold,
        )?;
        check_unit("recognition.margin_threshold", recognition.margin_threshold)?;
        check_unit("recognition.min_completeness", recognition.min_completeness)?;
        check_gate("recognition.gate", &recognition.gate)?;
        if recognition.classifier_timeout_ms == 0 {
            return Err(SigngateError::config(
                "recognition.classifier_timeout_ms must be positive",
            ));
        }

        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> SigngateResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SigngateError::config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_gate(name: &str, gate: &GateConfig) -> SigngateResult<()> {
    if gate.stable_frames == 0 {
        return Err(SigngateError::config(format!(
            "{name}.stable_frames must be at least 1"
        )));
    }
    if gate.min_interval_secs < 0.0 || gate.repeat_cooldown_secs < 0.0 {
        return Err(SigngateError::config(format!(
            "{name} intervals must be non-negative"
        )));
    }
    Ok(())
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("signgate").join("config.json")
}

/// Default data directory.
fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("signgate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window.feature_dim(), 126);
        assert_eq!(config.window.length, 15);
        assert_eq!(config.capture.gate.after_emit, AfterEmit::Keep);
        assert_eq!(config.recognition.gate.after_emit, AfterEmit::Clear);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "window": { "length": 10, "slots": 1 }, "recognition": { "margin_threshold": 0.25 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.window.length, 10);
        assert_eq!(config.window.feature_dim(), 63);
        assert!((config.recognition.margin_threshold - 0.25).abs() < 1e-12);
        assert!((config.recognition.confidence_threshold - 0.6).abs() < 1e-12);
        assert!((config.capture.quality_threshold - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = AppConfig::default();
        config.recognition.confidence_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(SigngateError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_scale_band() {
        let mut config = AppConfig::default();
        config.capture.augmentation.scale_min = 1.05;
        config.capture.augmentation.scale_max = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_stable_frames() {
        let mut config = AppConfig::default();
        config.capture.gate.stable_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("signgate_missing_config.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(SigngateError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_roundtrip() {
        let dir = std::env::temp_dir().join("signgate_test_config");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.capture.gate.stable_frames = 5;
        config.capture.augmentation.seed = Some(7);
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.capture.gate.stable_frames, 5);
        assert_eq!(loaded.capture.augmentation.seed, Some(7));

        std::fs::remove_dir_all(&dir).ok();
    }
}
