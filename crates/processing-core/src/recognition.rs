//! Recognition scoring around an injected classifier.
//!
//! The classifier is an opaque collaborator: N x D window in, K
//! probabilities out. The scorer turns that distribution into a
//! [`RecognitionResult`] with the top label, the runner-up probability and
//! the margin between them. Every failure on the classifier side surfaces
//! as `ClassifierUnavailable` so the session can skip the tick.

use std::sync::Arc;

use serde::Serialize;
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_sequence_model::labels::LabelMap;
use signgate_sequence_model::window::WindowSnapshot;

/// A gesture classifier over complete windows.
///
/// Calls may block; sessions run them on the blocking pool.
pub trait Classifier: Send + Sync {
    /// Probability of each class index for `window`.
    fn predict(&self, window: &WindowSnapshot) -> SigngateResult<Vec<f32>>;

    /// Short description for logs.
    fn name(&self) -> &str {
        "classifier"
    }
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn predict(&self, window: &WindowSnapshot) -> SigngateResult<Vec<f32>> {
        (**self).predict(window)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Decision-ready view of one classifier output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    /// Class index of the top probability.
    pub index: usize,
    pub label: String,
    pub top_probability: f64,
    /// Second-highest probability (0 with a single class).
    pub runner_up: f64,
    /// `top_probability - runner_up`.
    pub margin: f64,
    pub distribution: Vec<f32>,
}

impl RecognitionResult {
    /// Build a result from a raw distribution and its labels.
    pub fn from_distribution(distribution: Vec<f32>, labels: &LabelMap) -> SigngateResult<Self> {
        if distribution.is_empty() {
            return Err(SigngateError::classifier("empty probability distribution"));
        }
        if distribution.len() != labels.len() {
            return Err(SigngateError::classifier(format!(
                "classifier returned {} probabilities for {} labels",
                distribution.len(),
                labels.len()
            )));
        }
        if let Some(i) = distribution.iter().position(|p| !p.is_finite()) {
            return Err(SigngateError::classifier(format!(
                "probability at index {i} is not finite"
            )));
        }

        let mut top = (0usize, f64::NEG_INFINITY);
        let mut runner_up = f64::NEG_INFINITY;
        for (i, p) in distribution.iter().map(|p| f64::from(*p)).enumerate() {
            if p > top.1 {
                runner_up = top.1;
                top = (i, p);
            } else if p > runner_up {
                runner_up = p;
            }
        }
        if !runner_up.is_finite() {
            runner_up = 0.0;
        }

        let label = labels
            .label(top.0)
            .ok_or_else(|| SigngateError::classifier(format!("no label for index {}", top.0)))?
            .to_string();

        Ok(Self {
            index: top.0,
            label,
            top_probability: top.1,
            runner_up,
            margin: top.1 - runner_up,
            distribution,
        })
    }
}

/// Runs the classifier and interprets its output.
///
/// Cloning is cheap; clones share the classifier and label map.
#[derive(Clone)]
pub struct RecognitionScorer {
    classifier: Arc<dyn Classifier>,
    labels: Arc<LabelMap>,
}

impl RecognitionScorer {
    pub fn new(classifier: Arc<dyn Classifier>, labels: LabelMap) -> Self {
        Self {
            classifier,
            labels: Arc::new(labels),
        }
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify a complete window.
    pub fn classify(&self, window: &WindowSnapshot) -> SigngateResult<RecognitionResult> {
        let distribution = self.classifier.predict(window).map_err(|e| match e {
            e @ SigngateError::ClassifierUnavailable { .. } => e,
            other => SigngateError::classifier(other.to_string()),
        })?;
        RecognitionResult::from_distribution(distribution, &self.labels)
    }
}

impl std::fmt::Debug for RecognitionScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionScorer")
            .field("classifier", &self.classifier.name())
            .field("labels", &self.labels.labels())
            .finish()
    }
}
