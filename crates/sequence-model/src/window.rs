//! Sliding window of frame vectors.
//!
//! [`SequenceBuffer`] is the mutable ring owned by the ingestion loop;
//! [`WindowSnapshot`] is the immutable N x D copy handed to scorers,
//! classifiers, augmentation, and persistence.

use std::collections::VecDeque;

use signgate_common::error::{SigngateError, SigngateResult};

use crate::frame::{is_present, FrameVector};

/// Fixed-capacity FIFO window of the most recent frames, oldest first.
#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    frames: VecDeque<FrameVector>,
    capacity: usize,
    feature_dim: usize,
}

impl SequenceBuffer {
    /// Create an empty window holding `capacity` frames of `feature_dim` scalars.
    pub fn new(capacity: usize, feature_dim: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
            feature_dim,
        }
    }

    /// Append a frame, evicting the oldest once the window is full.
    pub fn push(&mut self, frame: FrameVector) -> SigngateResult<()> {
        if frame.dim() != self.feature_dim {
            return Err(SigngateError::Shape {
                expected: self.feature_dim,
                actual: frame.dim(),
            });
        }
        self.frames.push_back(frame);
        if self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
        Ok(())
    }

    /// True when the window holds exactly `capacity` frames.
    pub fn is_complete(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Copy of the full window, or `None` while it is still filling.
    pub fn snapshot(&self) -> Option<WindowSnapshot> {
        if !self.is_complete() {
            return None;
        }
        Some(WindowSnapshot {
            frames: self.frames.iter().cloned().collect(),
            feature_dim: self.feature_dim,
        })
    }

    /// Drop every frame.
    pub fn reset(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Frames oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FrameVector> {
        self.frames.iter()
    }

    /// Present ratio over the frames currently held.
    pub fn completeness(&self) -> f64 {
        let total = self.frames.len() * self.feature_dim;
        if total == 0 {
            return 0.0;
        }
        let present: usize = self.frames.iter().map(FrameVector::present_count).sum();
        present as f64 / total as f64
    }
}

/// Immutable copy of a complete window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    frames: Vec<FrameVector>,
    feature_dim: usize,
}

impl WindowSnapshot {
    /// Build a snapshot from frames that must all share one dimension.
    pub fn new(frames: Vec<FrameVector>) -> SigngateResult<Self> {
        let Some(first) = frames.first() else {
            return Err(SigngateError::IncompleteBuffer {
                len: 0,
                capacity: 1,
            });
        };
        let feature_dim = first.dim();
        if let Some(bad) = frames.iter().find(|f| f.dim() != feature_dim) {
            return Err(SigngateError::Shape {
                expected: feature_dim,
                actual: bad.dim(),
            });
        }
        Ok(Self {
            frames,
            feature_dim,
        })
    }

    /// Build a snapshot from an N x D matrix.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> SigngateResult<Self> {
        Self::new(rows.into_iter().map(FrameVector::from_values).collect())
    }

    /// Number of frames (N).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Scalars per frame (D).
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn frames(&self) -> &[FrameVector] {
        &self.frames
    }

    /// Every scalar, frame by frame.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.frames.iter().flat_map(|f| f.values().iter().copied())
    }

    /// Every present scalar, frame by frame.
    pub fn present_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values().filter(|v| is_present(*v))
    }

    /// Present ratio over N x D.
    pub fn completeness(&self) -> f64 {
        let total = self.frames.len() * self.feature_dim;
        if total == 0 {
            return 0.0;
        }
        self.present_values().count() as f64 / total as f64
    }

    /// Apply a per-frame transform, keeping order.
    pub fn map_frames(&self, f: impl FnMut(&FrameVector) -> FrameVector) -> Self {
        Self {
            frames: self.frames.iter().map(f).collect(),
            feature_dim: self.feature_dim,
        }
    }

    /// The window as an N x D matrix.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.frames.iter().map(|f| f.values().to_vec()).collect()
    }
}
