//! Capture-mode window quality.
//!
//! A window is scored on four sub-metrics, each in `[0, 1]`:
//!
//! - **completeness**: fraction of the N x D entries that were detected
//! - **consistency**: how evenly the signal changes between adjacent frames
//! - **motion variance**: variance of detected entries, scaled; static
//!   poses score low
//! - **spatial spread**: standard deviation of detected entries, scaled;
//!   hands pinned in one spot score low
//!
//! The composite is their weighted sum using [`QualityWeights`].

use signgate_common::config::{QualityConfig, QualityWeights};
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_sequence_model::event::QualityMetrics;
use signgate_sequence_model::window::{SequenceBuffer, WindowSnapshot};

/// Stateless quality scorer.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: QualityConfig,
}

impl QualityScorer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn weights(&self) -> &QualityWeights {
        &self.config.weights
    }

    /// Score a complete window.
    pub fn score(&self, window: &WindowSnapshot) -> QualityMetrics {
        let total = window.len() * window.feature_dim();
        if total == 0 {
            return QualityMetrics::ZERO;
        }

        let present: Vec<f64> = window.present_values().map(f64::from).collect();
        if present.is_empty() {
            return QualityMetrics::ZERO;
        }

        let completeness = present.len() as f64 / total as f64;
        // A single frame has no adjacent pair to be consistent with.
        let differences = adjacent_differences(window);
        let consistency = if differences.is_empty() {
            0.0
        } else {
            (1.0 - std_dev(&differences)).clamp(0.0, 1.0)
        };

        let variance = population_variance(&present);
        let motion_variance = (variance * self.config.motion_scale).clamp(0.0, 1.0);
        let spatial_spread = (variance.sqrt() * self.config.spread_scale).clamp(0.0, 1.0);

        let w = &self.config.weights;
        let composite = w.completeness * completeness
            + w.consistency * consistency
            + w.motion_variance * motion_variance
            + w.spatial_spread * spatial_spread;

        QualityMetrics {
            completeness,
            consistency,
            motion_variance,
            spatial_spread,
            composite,
        }
    }

    /// Score the buffer, or all-zero metrics when it is not yet complete.
    pub fn score_buffer(&self, buffer: &SequenceBuffer) -> QualityMetrics {
        match buffer.snapshot() {
            Some(window) => self.score(&window),
            None => QualityMetrics::ZERO,
        }
    }

    /// Score the buffer, failing with `IncompleteBuffer` when it is short.
    pub fn try_score_buffer(&self, buffer: &SequenceBuffer) -> SigngateResult<QualityMetrics> {
        let window = buffer
            .snapshot()
            .ok_or(SigngateError::IncompleteBuffer {
                len: buffer.len(),
                capacity: buffer.capacity(),
            })?;
        Ok(self.score(&window))
    }
}

/// Mean absolute difference between each pair of adjacent frames, over all
/// entries (missing included).
fn adjacent_differences(window: &WindowSnapshot) -> Vec<f64> {
    window
        .frames()
        .windows(2)
        .map(|pair| {
            let (prev, next) = (pair[0].values(), pair[1].values());
            let sum: f64 = prev
                .iter()
                .zip(next)
                .map(|(a, b)| (f64::from(*b) - f64::from(*a)).abs())
                .sum();
            sum / prev.len().max(1) as f64
        })
        .collect()
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn std_dev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}
