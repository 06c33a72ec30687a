//! Persisted capture samples.
//!
//! Each admitted window is written as K augmented variants under
//! `<samples_dir>/<label>/smart_{sample:03}_{variant}.json`. The
//! (sample, variant) pair is unique within a session, so names never
//! collide.

use std::path::Path;

use serde::{Deserialize, Serialize};
use signgate_common::error::{SigngateError, SigngateResult};

use crate::window::WindowSnapshot;

/// Perturbation applied to produce a sample variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Additive Gaussian noise on present entries.
    Noise,
    /// Uniform rescale of every entry.
    Scale,
    /// Circular shift along the time axis.
    TimeShift,
}

impl VariantKind {
    /// Perturbation used for the `variant`-th output of a capture.
    pub fn for_variant(variant: usize) -> Self {
        match variant % 3 {
            0 => Self::Noise,
            1 => Self::Scale,
            _ => Self::TimeShift,
        }
    }
}

/// One stored N x D sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFile {
    /// Gesture label the sample was captured for.
    pub label: String,

    /// Capture number within the label directory.
    pub sample_index: u32,

    /// Variant number within the capture.
    pub variant: usize,

    /// Perturbation applied.
    pub kind: VariantKind,

    /// Frames per sample (N).
    pub window_length: usize,

    /// Scalars per frame (D).
    pub feature_dim: usize,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Quality composite of the admitted window.
    #[serde(default)]
    pub quality: Option<f64>,

    /// Frame data, oldest first.
    pub frames: Vec<Vec<f32>>,
}

impl SampleFile {
    /// Build a sample from a window variant.
    pub fn new(
        label: impl Into<String>,
        sample_index: u32,
        variant: usize,
        kind: VariantKind,
        window: &WindowSnapshot,
    ) -> Self {
        Self {
            label: label.into(),
            sample_index,
            variant,
            kind,
            window_length: window.len(),
            feature_dim: window.feature_dim(),
            created_at: chrono::Utc::now().to_rfc3339(),
            quality: None,
            frames: window.to_rows(),
        }
    }

    pub fn with_quality(mut self, composite: f64) -> Self {
        self.quality = Some(composite);
        self
    }

    /// File name inside the label directory.
    pub fn file_name(&self) -> String {
        format!("smart_{:03}_{}.json", self.sample_index, self.variant)
    }

    /// Read a sample file.
    pub fn load(path: impl AsRef<Path>) -> SigngateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SigngateError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The stored frames as a window.
    pub fn to_window(&self) -> SigngateResult<WindowSnapshot> {
        WindowSnapshot::from_rows(self.frames.clone())
    }

    /// Check the declared and actual shapes. Returns a list of problems.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.frames.len() != self.window_length {
            errors.push(format!(
                "Declares {} frames but holds {}",
                self.window_length,
                self.frames.len()
            ));
        }
        for (i, row) in self.frames.iter().enumerate() {
            if row.len() != self.feature_dim {
                errors.push(format!(
                    "Frame {i} has {} values, expected {}",
                    row.len(),
                    self.feature_dim
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                errors.push(format!("Frame {i} contains non-finite values"));
            }
        }
        if self.kind != VariantKind::for_variant(self.variant) {
            errors.push(format!(
                "Variant {} should be {:?}, found {:?}",
                self.variant,
                VariantKind::for_variant(self.variant),
                self.kind
            ));
        }

        errors
    }
}

/// Sample index encoded in a file name such as `smart_007_2.json`.
pub fn parse_sample_index(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_prefix("smart_")?.strip_suffix(".json")?;
    let (index, variant) = stem.split_once('_')?;
    variant.parse::<usize>().ok()?;
    index.parse().ok()
}

/// First unused sample index in a label directory (0 if it is empty or absent).
pub fn next_sample_index(label_dir: impl AsRef<Path>) -> SigngateResult<u32> {
    let label_dir = label_dir.as_ref();
    if !label_dir.exists() {
        return Ok(0);
    }
    let mut next = 0;
    for entry in std::fs::read_dir(label_dir)? {
        let entry = entry?;
        if let Some(index) = entry.file_name().to_str().and_then(parse_sample_index) {
            next = next.max(index + 1);
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> WindowSnapshot {
        WindowSnapshot::from_rows(vec![vec![0.5; 6]; 4]).unwrap()
    }

    #[test]
    fn test_file_name_is_zero_padded() {
        let sample = SampleFile::new("hola", 7, 2, VariantKind::TimeShift, &window());
        assert_eq!(sample.file_name(), "smart_007_2.json");
        assert!(sample.validate().is_empty());
    }

    #[test]
    fn test_parse_sample_index() {
        assert_eq!(parse_sample_index("smart_007_2.json"), Some(7));
        assert_eq!(parse_sample_index("smart_123_0.json"), Some(123));
        assert_eq!(parse_sample_index("smart_abc_0.json"), None);
        assert_eq!(parse_sample_index("smart_001.json"), None);
        assert_eq!(parse_sample_index("notes.txt"), None);
    }

    #[test]
    fn test_validate_reports_bad_shape() {
        let mut sample = SampleFile::new("si", 0, 0, VariantKind::Noise, &window());
        sample.frames[2].pop();
        sample.window_length = 5;
        let errors = sample.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("Frame 2")));
    }

    #[test]
    fn test_variant_kinds_cycle() {
        assert_eq!(VariantKind::for_variant(0), VariantKind::Noise);
        assert_eq!(VariantKind::for_variant(1), VariantKind::Scale);
        assert_eq!(VariantKind::for_variant(2), VariantKind::TimeShift);
        assert_eq!(VariantKind::for_variant(3), VariantKind::Noise);
    }

    #[test]
    fn test_next_sample_index_scans_directory() {
        let dir = std::env::temp_dir().join("signgate_test_next_index");
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(next_sample_index(&dir).unwrap(), 0);

        std::fs::create_dir_all(&dir).unwrap();
        for name in ["smart_000_0.json", "smart_004_2.json", "readme.md"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
        assert_eq!(next_sample_index(&dir).unwrap(), 5);

        std::fs::remove_dir_all(&dir).ok();
    }
}
