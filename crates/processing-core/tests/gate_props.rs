use proptest::prelude::*;
use signgate_common::config::{AfterEmit, AugmentationConfig, GateConfig};
use signgate_processing_core::augment::Augmenter;
use signgate_processing_core::debounce::{AdmissionPolicy, DebounceGate};
use signgate_processing_core::normalize::normalize;
use signgate_sequence_model::frame::FrameVector;
use signgate_sequence_model::sample::VariantKind;
use signgate_sequence_model::window::WindowSnapshot;

/// Observation is `Some(label)` when the tick qualifies.
struct Labelled;

impl AdmissionPolicy for Labelled {
    type Observation = Option<u8>;
    type Key = u8;
    type Event = u8;

    fn admits(&self, observation: &Option<u8>) -> bool {
        observation.is_some()
    }

    fn key(&self, observation: &Option<u8>) -> Option<u8> {
        *observation
    }

    fn emit(&mut self, observation: Option<u8>) -> u8 {
        observation.unwrap_or_default()
    }
}

/// Qualifies when the score beats 0.7; no repeat key.
struct Threshold;

impl AdmissionPolicy for Threshold {
    type Observation = f64;
    type Key = ();
    type Event = ();

    fn admits(&self, score: &f64) -> bool {
        *score > 0.7
    }

    fn key(&self, _score: &f64) -> Option<()> {
        None
    }

    fn emit(&mut self, _score: f64) {}
}

fn config(stable: u32, interval: f64, cooldown: f64) -> GateConfig {
    GateConfig {
        stable_frames: stable,
        min_interval_secs: interval,
        repeat_cooldown_secs: cooldown,
        after_emit: AfterEmit::Keep,
    }
}

proptest! {
    #[test]
    fn captures_respect_min_interval(
        scores in prop::collection::vec(0.0f64..1.0, 1..400),
        stable in 1u32..6,
        interval in 0.1f64..3.0,
        fps in 5.0f64..60.0,
    ) {
        let mut gate = DebounceGate::new(Threshold, config(stable, interval, interval));
        let mut last: Option<f64> = None;
        for (tick, score) in scores.into_iter().enumerate() {
            let now = tick as f64 / fps;
            if gate.observe(score, now).is_some() {
                if let Some(prev) = last {
                    prop_assert!(now - prev >= interval);
                }
                last = Some(now);
            }
        }
    }

    #[test]
    fn same_label_needs_break_or_cooldown(
        ticks in prop::collection::vec(prop::option::weighted(0.8, 0u8..3), 1..400),
        stable in 1u32..5,
        cooldown in 0.5f64..4.0,
    ) {
        let mut gate = DebounceGate::new(Labelled, config(stable, 0.0, cooldown));
        let mut last: Option<(u8, f64)> = None;
        for (tick, observation) in ticks.into_iter().enumerate() {
            let now = tick as f64 / 30.0;
            if let Some(label) = gate.observe(observation, now) {
                if let Some((prev_label, prev_at)) = last {
                    prop_assert!(label != prev_label || now - prev_at >= cooldown);
                }
                last = Some((label, now));
            }
        }
    }

    #[test]
    fn short_streak_never_emits(stable in 2u32..10, start in 0.0f64..100.0) {
        let mut gate = DebounceGate::new(Threshold, config(stable, 2.0, 2.0));
        let mut events = 0;
        for tick in 0..(stable - 1) {
            events += gate.observe(0.9, start + tick as f64 * 0.1).iter().count();
        }
        events += gate.observe(0.1, start + stable as f64 * 0.1).iter().count();
        prop_assert_eq!(events, 0);
    }

    #[test]
    fn exact_streak_emits_once_on_last_tick(stable in 1u32..10) {
        let mut gate = DebounceGate::new(Threshold, config(stable, 2.0, 2.0));
        for tick in 0..stable {
            let emitted = gate.observe(0.9, tick as f64 * 0.1).is_some();
            prop_assert_eq!(emitted, tick + 1 == stable);
        }
        prop_assert!(gate.observe(0.1, stable as f64 * 0.1).is_none());
        prop_assert_eq!(gate.emitted(), 1);
    }

    #[test]
    fn normalize_keeps_missing_entries(values in prop::collection::vec(
        prop_oneof![Just(0.0f32), -1.0f32..1.0], 1..200,
    )) {
        let frame = FrameVector::from_values(values.clone());
        let normalized = normalize(&frame);
        prop_assert_eq!(normalized.dim(), values.len());
        for (before, after) in values.iter().zip(normalized.values()) {
            if *before == 0.0 {
                prop_assert_eq!(*after, 0.0);
            }
            prop_assert!(after.is_finite());
        }
    }

    #[test]
    fn augmentation_stays_within_bounds(
        seed in any::<u64>(),
        variants in 1usize..7,
        rows in prop::collection::vec(
            prop::collection::vec(prop_oneof![Just(0.0f32), 0.05f32..1.0], 12),
            15,
        ),
    ) {
        let config = AugmentationConfig {
            variants,
            seed: Some(seed),
            ..AugmentationConfig::default()
        };
        let window = WindowSnapshot::from_rows(rows).unwrap();
        let outputs = Augmenter::new(config).unwrap().augment(&window);
        prop_assert_eq!(outputs.len(), variants);

        let scale_bound = (1.0 - config.scale_min).max(config.scale_max - 1.0) + 1e-6;
        for (kind, variant) in &outputs {
            prop_assert_eq!(variant.len(), window.len());
            prop_assert_eq!(variant.feature_dim(), window.feature_dim());
            match kind {
                VariantKind::Noise => {
                    for (a, b) in window.values().zip(variant.values()) {
                        prop_assert!((a - b).abs() <= config.noise_clip + 1e-6);
                    }
                }
                VariantKind::Scale => {
                    for (a, b) in window.values().zip(variant.values()) {
                        prop_assert!((a - b).abs() <= a.abs() * scale_bound);
                    }
                }
                VariantKind::TimeShift => {
                    let shifted = (1..=config.max_shift_frames).any(|k| {
                        (0..window.len()).all(|i| {
                            variant.frames()[(i + k) % window.len()] == window.frames()[i]
                        })
                    });
                    prop_assert!(shifted);
                }
            }
        }
    }
}
