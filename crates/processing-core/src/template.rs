//! Nearest-template classifier.
//!
//! Each label has one N x D reference window. A window is scored by its mean
//! absolute distance to every template, and the negated distances (divided
//! by `temperature`) go through a softmax to give a probability
//! distribution indexed like the label map.
//!
//! Artifact format:
//!
//! ```json
//! { "window_length": 15, "feature_dim": 126, "temperature": 0.05,
//!   "templates": [ [[...126 values...], ...15 frames...], ... ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_sequence_model::window::WindowSnapshot;

use crate::recognition::Classifier;

/// Template-matching classifier loaded from a JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateClassifier {
    pub window_length: usize,
    pub feature_dim: usize,
    /// Softmax temperature; smaller values sharpen the distribution.
    pub temperature: f32,
    /// One N x D window per class index.
    pub templates: Vec<Vec<Vec<f32>>>,
}

impl TemplateClassifier {
    pub fn new(templates: Vec<Vec<Vec<f32>>>, temperature: f32) -> SigngateResult<Self> {
        let window_length = templates.first().map(Vec::len).unwrap_or(0);
        let feature_dim = templates
            .first()
            .and_then(|t| t.first())
            .map(Vec::len)
            .unwrap_or(0);
        let classifier = Self {
            window_length,
            feature_dim,
            temperature,
            templates,
        };
        classifier.check()?;
        Ok(classifier)
    }

    /// Read and check a template artifact.
    pub fn load(path: impl AsRef<Path>) -> SigngateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SigngateError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let classifier: Self = serde_json::from_str(&content)?;
        classifier.check()?;
        tracing::debug!(
            classes = classifier.templates.len(),
            window_length = classifier.window_length,
            feature_dim = classifier.feature_dim,
            "Loaded template classifier"
        );
        Ok(classifier)
    }

    pub fn class_count(&self) -> usize {
        self.templates.len()
    }

    fn check(&self) -> SigngateResult<()> {
        if self.templates.is_empty() {
            return Err(SigngateError::model("template artifact has no templates"));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(SigngateError::model(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        for (k, template) in self.templates.iter().enumerate() {
            if template.len() != self.window_length {
                return Err(SigngateError::model(format!(
                    "template {k} has {} frames, expected {}",
                    template.len(),
                    self.window_length
                )));
            }
            if let Some(row) = template.iter().find(|r| r.len() != self.feature_dim) {
                return Err(SigngateError::model(format!(
                    "template {k} has a frame of {} values, expected {}",
                    row.len(),
                    self.feature_dim
                )));
            }
        }
        Ok(())
    }

    fn distance(template: &[Vec<f32>], window: &WindowSnapshot) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for (t_row, frame) in template.iter().zip(window.frames()) {
            for (t, v) in t_row.iter().zip(frame.values()) {
                sum += (t - v).abs();
                count += 1;
            }
        }
        sum / count.max(1) as f32
    }
}

impl Classifier for TemplateClassifier {
    fn predict(&self, window: &WindowSnapshot) -> SigngateResult<Vec<f32>> {
        if window.len() != self.window_length {
            return Err(SigngateError::Shape {
                expected: self.window_length * self.feature_dim,
                actual: window.len() * window.feature_dim(),
            });
        }
        if window.feature_dim() != self.feature_dim {
            return Err(SigngateError::Shape {
                expected: self.feature_dim,
                actual: window.feature_dim(),
            });
        }

        let logits: Vec<f32> = self
            .templates
            .iter()
            .map(|t| -Self::distance(t, window) / self.temperature)
            .collect();
        Ok(softmax(&logits))
    }

    fn name(&self) -> &str {
        "templates"
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Vec<Vec<Vec<f32>>> {
        vec![vec![vec![1.0; 4]; 3], vec![vec![-1.0; 4]; 3]]
    }

    #[test]
    fn test_nearest_template_wins() {
        let classifier = TemplateClassifier::new(templates(), 0.1).unwrap();
        let window = WindowSnapshot::from_rows(vec![vec![0.9; 4]; 3]).unwrap();
        let probs = classifier.predict(&window).unwrap();
        assert_eq!(probs.len(), 2);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[0] > 0.99);
    }

    #[test]
    fn test_equidistant_window_is_ambiguous() {
        let classifier = TemplateClassifier::new(templates(), 0.1).unwrap();
        let window = WindowSnapshot::from_rows(vec![vec![0.0; 4]; 3]).unwrap();
        let probs = classifier.predict(&window).unwrap();
        assert!((probs[0] - probs[1]).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let classifier = TemplateClassifier::new(templates(), 0.1).unwrap();
        let short = WindowSnapshot::from_rows(vec![vec![0.5; 4]; 2]).unwrap();
        assert!(matches!(
            classifier.predict(&short),
            Err(SigngateError::Shape { .. })
        ));
        let narrow = WindowSnapshot::from_rows(vec![vec![0.5; 3]; 3]).unwrap();
        assert!(classifier.predict(&narrow).is_err());
    }

    #[test]
    fn test_invalid_artifacts() {
        assert!(TemplateClassifier::new(Vec::new(), 0.1).is_err());
        assert!(TemplateClassifier::new(templates(), 0.0).is_err());

        let mut ragged = templates();
        ragged[1].pop();
        assert!(TemplateClassifier::new(ragged, 0.1).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join("signgate_test_templates");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("templates.json");
        let classifier = TemplateClassifier::new(templates(), 0.2).unwrap();
        std::fs::write(&path, serde_json::to_string(&classifier).unwrap()).unwrap();

        let loaded = TemplateClassifier::load(&path).unwrap();
        assert_eq!(loaded, classifier);
        assert!(TemplateClassifier::load(dir.join("missing.json")).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
