//! Variants of an admitted capture window.
//!
//! Variant `i` applies exactly one perturbation, cycling through
//! [`VariantKind`]: clipped Gaussian noise on present entries, a uniform
//! rescale, or a circular shift along the time axis. Missing entries stay
//! zero under every perturbation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use signgate_common::config::AugmentationConfig;
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_sequence_model::frame::{is_present, FrameVector};
use signgate_sequence_model::sample::VariantKind;
use signgate_sequence_model::window::WindowSnapshot;

/// Seedable augmentation sampler.
pub struct Augmenter {
    config: AugmentationConfig,
    noise: Normal<f32>,
    rng: StdRng,
}

impl Augmenter {
    /// Build a sampler; seeded from `config.seed` when set, otherwise from
    /// the OS.
    pub fn new(config: AugmentationConfig) -> SigngateResult<Self> {
        if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
            return Err(SigngateError::config(format!(
                "noise_std must be a non-negative number, got {}",
                config.noise_std
            )));
        }
        if !(config.noise_clip.is_finite() && config.noise_clip >= 0.0) {
            return Err(SigngateError::config(format!(
                "noise_clip must be a non-negative number, got {}",
                config.noise_clip
            )));
        }
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| {
            SigngateError::config(format!("invalid noise_std {}: {e}", config.noise_std))
        })?;
        let band_ok = config.scale_min.is_finite()
            && config.scale_max.is_finite()
            && config.scale_min <= config.scale_max;
        if !band_ok {
            return Err(SigngateError::config(format!(
                "scale band {}..{} is inverted",
                config.scale_min, config.scale_max
            )));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { config, noise, rng })
    }

    pub fn config(&self) -> &AugmentationConfig {
        &self.config
    }

    /// Produce `config.variants` perturbed copies of `window`.
    pub fn augment(&mut self, window: &WindowSnapshot) -> Vec<(VariantKind, WindowSnapshot)> {
        (0..self.config.variants)
            .map(|i| {
                let kind = VariantKind::for_variant(i);
                let variant = match kind {
                    VariantKind::Noise => self.add_noise(window),
                    VariantKind::Scale => self.rescale(window),
                    VariantKind::TimeShift => self.time_shift(window),
                };
                (kind, variant)
            })
            .collect()
    }

    fn add_noise(&mut self, window: &WindowSnapshot) -> WindowSnapshot {
        let clip = self.config.noise_clip;
        window.map_frames(|frame| {
            let values = frame
                .values()
                .iter()
                .map(|v| {
                    if is_present(*v) {
                        let delta = self.noise.sample(&mut self.rng).clamp(-clip, clip);
                        nonzero(*v + delta, *v)
                    } else {
                        0.0
                    }
                })
                .collect();
            FrameVector::from_values(values)
        })
    }

    fn rescale(&mut self, window: &WindowSnapshot) -> WindowSnapshot {
        let factor = if self.config.scale_min < self.config.scale_max {
            self.rng
                .random_range(self.config.scale_min..=self.config.scale_max)
        } else {
            self.config.scale_min
        };
        window.map_frames(|frame| {
            FrameVector::from_values(frame.values().iter().map(|v| v * factor).collect())
        })
    }

    fn time_shift(&mut self, window: &WindowSnapshot) -> WindowSnapshot {
        let len = window.len();
        let max_shift = self.config.max_shift_frames.min(len.saturating_sub(1));
        if max_shift == 0 {
            return window.clone();
        }
        let shift = self.rng.random_range(1..=max_shift);
        shift_frames(window, shift)
    }
}

impl std::fmt::Debug for Augmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Augmenter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Rotate frames forward in time: frame `i` moves to `(i + shift) % len`.
pub fn shift_frames(window: &WindowSnapshot, shift: usize) -> WindowSnapshot {
    let mut frames = window.frames().to_vec();
    if !frames.is_empty() {
        let len = frames.len();
        frames.rotate_right(shift % len);
    }
    WindowSnapshot::new(frames).unwrap_or_else(|_| window.clone())
}

/// Keep a perturbed present value from collapsing onto the missing marker.
fn nonzero(value: f32, original: f32) -> f32 {
    if value == 0.0 {
        original
    } else {
        value
    }
}
