//! Events emitted by the admission pipeline.

use serde::{Deserialize, Serialize};

use crate::stream::TimestampNs;
use crate::window::WindowSnapshot;

/// Sub-scores and composite quality of one complete window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Present entries over N x D.
    pub completeness: f64,
    /// 1 - std of adjacent-frame mean absolute differences.
    pub consistency: f64,
    /// Scaled variance of present entries.
    pub motion_variance: f64,
    /// Scaled standard deviation of present entries.
    pub spatial_spread: f64,
    /// Weighted sum of the four sub-scores.
    pub composite: f64,
}

impl QualityMetrics {
    /// The score of a window that cannot be judged.
    pub const ZERO: Self = Self {
        completeness: 0.0,
        consistency: 0.0,
        motion_variance: 0.0,
        spatial_spread: 0.0,
        composite: 0.0,
    };
}

/// A window admitted as a high-quality exemplar.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvent {
    /// Session-unique, monotonically increasing sample number.
    pub sample_index: u32,
    /// Timestamp of the frame that completed the window.
    pub timestamp_ns: TimestampNs,
    /// Quality of the admitted window.
    pub metrics: QualityMetrics,
    /// The admitted window.
    pub window: WindowSnapshot,
}

/// A window recognized as a gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    /// Recognized label.
    pub label: String,
    /// Top class probability.
    pub confidence: f64,
    /// Gap to the runner-up probability.
    pub margin: f64,
    /// Timestamp of the frame that completed the window.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,
}

impl RecognitionEvent {
    /// Confidence as a whole percentage, as shown to users.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).clamp(0.0, 100.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_event_wire_format() {
        let event = RecognitionEvent {
            label: "hola".to_string(),
            confidence: 0.874,
            margin: 0.61,
            timestamp_ns: 2_000_000_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["label"], "hola");
        assert_eq!(json["t"], 2_000_000_000u64);
        assert_eq!(event.confidence_percent(), 87);
    }

    #[test]
    fn test_zero_metrics() {
        assert_eq!(QualityMetrics::ZERO, QualityMetrics::default());
    }
}
