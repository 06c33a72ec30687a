//! Per-frame feature vectors and the landmark layout that produces them.
//!
//! A frame vector is the flattened output of the landmark extractor for one
//! video frame. Its length is fixed by the [`LandmarkLayout`]; landmark sets
//! that were not detected leave their sub-range filled with `0.0`, which is
//! the "missing" encoding used by every downstream stage.

use serde::{Deserialize, Serialize};
use signgate_common::config::WindowConfig;
use signgate_common::error::{SigngateError, SigngateResult};

/// Whether a scalar carries a detection (`0.0` means missing).
#[inline]
pub fn is_present(value: f32) -> bool {
    value != 0.0
}

/// How landmark sets are packed into a frame vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkLayout {
    /// Landmark sets per frame.
    pub slots: usize,
    /// Points per set.
    pub points_per_set: usize,
    /// Scalars kept per point.
    pub coords: usize,
}

impl LandmarkLayout {
    /// Two hands, 21 points each, xyz: D = 126.
    pub const TWO_HANDS: Self = Self::new(2, 21, 3);

    /// One hand, 21 points, xyz: D = 63.
    pub const ONE_HAND: Self = Self::new(1, 21, 3);

    pub const fn new(slots: usize, points_per_set: usize, coords: usize) -> Self {
        Self {
            slots,
            points_per_set,
            coords,
        }
    }

    /// Scalars per frame (D).
    pub fn feature_dim(&self) -> usize {
        self.slots * self.slot_width()
    }

    /// Scalars per landmark set.
    pub fn slot_width(&self) -> usize {
        self.points_per_set * self.coords
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::TWO_HANDS
    }
}

impl From<&WindowConfig> for LandmarkLayout {
    fn from(config: &WindowConfig) -> Self {
        Self::new(config.slots, config.points_per_set, config.coords)
    }
}

/// Which hand a landmark set belongs to, when the extractor knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    fn preferred_slot(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// One detected set of 3D landmarks (a hand, a body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    /// Handedness label if the extractor provides one.
    #[serde(default)]
    pub handedness: Option<Handedness>,

    /// Points as `[x, y, z]`, in the extractor's normalized image coordinates.
    pub points: Vec<[f32; 3]>,
}

impl LandmarkSet {
    pub fn new(points: Vec<[f32; 3]>) -> Self {
        Self {
            handedness: None,
            points,
        }
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }
}

/// Fixed-length feature vector for a single frame. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameVector {
    values: Box<[f32]>,
}

impl FrameVector {
    /// Build a frame from raw values, checking the expected dimension.
    pub fn new(values: Vec<f32>, feature_dim: usize) -> SigngateResult<Self> {
        if values.len() != feature_dim {
            return Err(SigngateError::Shape {
                expected: feature_dim,
                actual: values.len(),
            });
        }
        Ok(Self::from_values(values))
    }

    /// Build a frame whose dimension is the length of `values`.
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    /// An all-missing frame.
    pub fn zeros(feature_dim: usize) -> Self {
        Self::from_values(vec![0.0; feature_dim])
    }

    /// Flatten extractor output into a frame.
    ///
    /// Sets tagged left/right land in slots 0/1 when the layout has at
    /// least two slots; untagged sets (or tags whose slot is taken) fill
    /// the first free slot in order. Sets beyond the slot count are
    /// dropped, missing points and coordinates stay zero.
    pub fn from_landmarks(sets: &[LandmarkSet], layout: &LandmarkLayout) -> Self {
        let mut values = vec![0.0f32; layout.feature_dim()];
        let mut taken = vec![false; layout.slots];

        let place = |slot: usize, set: &LandmarkSet, values: &mut [f32]| {
            let base = slot * layout.slot_width();
            for (p, point) in set.points.iter().take(layout.points_per_set).enumerate() {
                for (c, coord) in point.iter().take(layout.coords).enumerate() {
                    values[base + p * layout.coords + c] = *coord;
                }
            }
        };

        let mut deferred = Vec::new();
        if layout.slots >= 2 {
            for set in sets {
                match set.handedness.map(Handedness::preferred_slot) {
                    Some(slot) if !taken[slot] => {
                        taken[slot] = true;
                        place(slot, set, &mut values);
                    }
                    _ => deferred.push(set),
                }
            }
        } else {
            deferred.extend(sets.iter());
        }

        for set in deferred {
            let Some(slot) = taken.iter().position(|t| !t) else {
                break;
            };
            taken[slot] = true;
            place(slot, set, &mut values);
        }

        Self::from_values(values)
    }

    /// Number of scalars (D).
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of present (non-zero) scalars.
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| is_present(**v)).count()
    }

    /// True when nothing was detected in this frame.
    pub fn is_blank(&self) -> bool {
        self.present_count() == 0
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(value: f32) -> LandmarkSet {
        LandmarkSet::new(vec![[value, value, value]; 21])
    }

    #[test]
    fn test_layout_dims() {
        assert_eq!(LandmarkLayout::TWO_HANDS.feature_dim(), 126);
        assert_eq!(LandmarkLayout::ONE_HAND.feature_dim(), 63);
        assert_eq!(LandmarkLayout::new(1, 33, 4).feature_dim(), 132);
    }

    #[test]
    fn test_new_rejects_wrong_dimension() {
        let err = FrameVector::new(vec![0.5; 62], 63).unwrap_err();
        assert!(matches!(
            err,
            SigngateError::Shape {
                expected: 63,
                actual: 62
            }
        ));
    }

    #[test]
    fn test_no_landmarks_is_blank() {
        let frame = FrameVector::from_landmarks(&[], &LandmarkLayout::TWO_HANDS);
        assert_eq!(frame.dim(), 126);
        assert!(frame.is_blank());
    }

    #[test]
    fn test_single_untagged_hand_fills_first_slot() {
        let frame = FrameVector::from_landmarks(&[hand(0.5)], &LandmarkLayout::TWO_HANDS);
        assert_eq!(frame.present_count(), 63);
        assert!(frame.values()[..63].iter().all(|v| *v == 0.5));
        assert!(frame.values()[63..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_right_hand_goes_to_second_slot() {
        let sets = [hand(0.7).with_handedness(Handedness::Right)];
        let frame = FrameVector::from_landmarks(&sets, &LandmarkLayout::TWO_HANDS);
        assert!(frame.values()[..63].iter().all(|v| *v == 0.0));
        assert!(frame.values()[63..].iter().all(|v| *v == 0.7));
    }

    #[test]
    fn test_extra_sets_are_dropped() {
        let sets = [hand(0.1), hand(0.2), hand(0.3)];
        let frame = FrameVector::from_landmarks(&sets, &LandmarkLayout::TWO_HANDS);
        assert_eq!(frame.values()[0], 0.1);
        assert_eq!(frame.values()[63], 0.2);
        assert!(!frame.values().contains(&0.3));
    }

    #[test]
    fn test_short_set_is_zero_padded() {
        let sets = [LandmarkSet::new(vec![[0.4, 0.5, 0.6]; 5])];
        let frame = FrameVector::from_landmarks(&sets, &LandmarkLayout::ONE_HAND);
        assert_eq!(frame.dim(), 63);
        assert_eq!(frame.present_count(), 15);
    }

    #[test]
    fn test_serde_is_a_plain_array() {
        let frame = FrameVector::from_values(vec![0.0, 1.5, -2.0]);
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, "[0.0,1.5,-2.0]");
        let parsed: FrameVector = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }
}
