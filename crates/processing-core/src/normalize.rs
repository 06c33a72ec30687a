//! Per-frame standardization.
//!
//! Frames are normalized independently because consecutive frames may have
//! different subsets of landmarks present. Only present (non-zero) entries
//! take part; zeros stay zero so "missing" survives normalization.

use signgate_sequence_model::frame::{is_present, FrameVector};
use signgate_sequence_model::window::WindowSnapshot;

/// Rescale the present entries of `frame` to zero mean and unit variance.
///
/// Frames with no present entries, or whose present entries are all equal,
/// are returned unchanged.
pub fn normalize(frame: &FrameVector) -> FrameVector {
    let (count, sum) = frame
        .values()
        .iter()
        .filter(|v| is_present(**v))
        .fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + *v as f64));
    if count == 0 {
        return frame.clone();
    }

    let mean = sum / count as f64;
    let variance = frame
        .values()
        .iter()
        .filter(|v| is_present(**v))
        .map(|v| (*v as f64 - mean).powi(2))
        .sum::<f64>()
        / count as f64;
    let std = variance.sqrt();
    if std <= 0.0 {
        return frame.clone();
    }

    let values = frame
        .values()
        .iter()
        .map(|v| {
            if is_present(*v) {
                ((*v as f64 - mean) / std) as f32
            } else {
                0.0
            }
        })
        .collect();
    FrameVector::from_values(values)
}

/// Normalize every frame of a window.
pub fn normalize_window(window: &WindowSnapshot) -> WindowSnapshot {
    window.map_frames(normalize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_std(values: &[f32]) -> (f64, f64) {
        let present: Vec<f64> = values
            .iter()
            .filter(|v| **v != 0.0)
            .map(|v| *v as f64)
            .collect();
        let n = present.len() as f64;
        let mean = present.iter().sum::<f64>() / n;
        let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_all_zero_frame_unchanged() {
        let frame = FrameVector::zeros(126);
        assert_eq!(normalize(&frame), frame);
    }

    #[test]
    fn test_constant_frame_unchanged() {
        let frame = FrameVector::from_values(vec![0.5; 10]);
        assert_eq!(normalize(&frame), frame);
    }

    #[test]
    fn test_present_entries_standardized() {
        let frame = FrameVector::from_values(vec![0.2, 0.0, 0.4, 0.6, 0.0, 0.8]);
        let normalized = normalize(&frame);
        let (mean, std) = mean_std(normalized.values());
        assert!(mean.abs() < 1e-6);
        assert!((std - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_missing_entries_stay_zero() {
        let frame = FrameVector::from_values(vec![0.2, 0.0, 0.4, 0.0]);
        let normalized = normalize(&frame);
        assert_eq!(normalized.values()[1], 0.0);
        assert_eq!(normalized.values()[3], 0.0);
        assert!((normalized.values()[0] + 1.0).abs() < 1e-6);
        assert!((normalized.values()[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_window_is_per_frame() {
        let window = WindowSnapshot::from_rows(vec![
            vec![1.0, 3.0, 0.0],
            vec![10.0, 30.0, 0.0],
        ])
        .unwrap();
        let normalized = normalize_window(&window);
        assert_eq!(normalized.frames()[0], normalized.frames()[1]);
    }
}
