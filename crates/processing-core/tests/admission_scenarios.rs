use std::sync::Arc;

use signgate_common::config::{GateConfig, QualityConfig};
use signgate_processing_core::debounce::{
    CaptureObservation, CapturePolicy, DebounceGate, RecognitionObservation, RecognitionPolicy,
};
use signgate_processing_core::normalize::normalize;
use signgate_processing_core::quality::QualityScorer;
use signgate_processing_core::recognition::RecognitionScorer;
use signgate_processing_core::template::TemplateClassifier;
use signgate_sequence_model::frame::FrameVector;
use signgate_sequence_model::labels::LabelMap;
use signgate_sequence_model::window::SequenceBuffer;

const N: usize = 15;
const D: usize = 126;

/// Deterministic pseudo-noise in [-amplitude, amplitude].
fn jitter(seed: usize, amplitude: f32) -> f32 {
    let x = ((seed as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)
        >> 33) as f32
        / (1u64 << 31) as f32;
    (x * 2.0 - 1.0) * amplitude
}

fn run_capture(frames: impl IntoIterator<Item = FrameVector>) -> (Vec<f64>, usize) {
    let scorer = QualityScorer::new(QualityConfig::default());
    let mut gate = DebounceGate::new(CapturePolicy::new(0.7, 0), GateConfig::capture());
    let mut buffer = SequenceBuffer::new(N, D);
    let mut composites = Vec::new();
    let mut events = 0;

    for (tick, frame) in frames.into_iter().enumerate() {
        buffer.push(frame).unwrap();
        let Some(window) = buffer.snapshot() else {
            composites.push(scorer.score_buffer(&buffer).composite);
            continue;
        };
        let metrics = scorer.score(&window);
        composites.push(metrics.composite);
        let observation = CaptureObservation {
            metrics,
            window,
            timestamp_ns: tick as u64 * 33_333_333,
        };
        if gate.observe(observation, tick as f64 / 30.0).is_some() {
            events += 1;
        }
    }
    (composites, events)
}

#[test]
fn all_zero_frames_never_capture() {
    let (composites, events) = run_capture((0..N).map(|_| FrameVector::zeros(D)));
    assert_eq!(composites.len(), N);
    assert!(composites.iter().all(|c| *c == 0.0));
    assert_eq!(events, 0);
}

#[test]
fn near_static_pose_is_rejected() {
    let scorer = QualityScorer::default();
    let mut buffer = SequenceBuffer::new(N, D);
    for t in 0..N {
        let values = (0..D).map(|i| 0.5 + jitter(t * D + i, 0.001)).collect();
        buffer.push(FrameVector::from_values(values)).unwrap();
    }
    let metrics = scorer.try_score_buffer(&buffer).unwrap();

    assert!(metrics.completeness > 0.999);
    assert!(metrics.consistency > 0.99);
    assert!(metrics.motion_variance < 0.01);
    assert!(metrics.composite < 0.7, "composite {}", metrics.composite);

    let held: Vec<FrameVector> = buffer.iter().cloned().collect();
    let (_, events) = run_capture(held.iter().cloned().cycle().take(N * 10));
    assert_eq!(events, 0);
}

#[test]
fn moving_hand_captures_at_rate_limit() {
    // Two seconds at 30 fps of a sweeping hand spread over the image.
    let frames = (0..180).map(|t| {
        let values = (0..D)
            .map(|i| {
                let base = 0.15 + (i % 21) as f32 * 0.03;
                base + 0.1 * ((t as f32 / 6.0) + i as f32).sin()
            })
            .collect();
        FrameVector::from_values(values)
    });
    let (composites, events) = run_capture(frames);

    assert!(composites[N - 1..].iter().all(|c| *c > 0.7));
    // First capture after three stable windows, then one per 2 s.
    assert_eq!(events, 3);
}

#[test]
fn recognition_announces_each_held_gesture_once() {
    // Each gesture is a held hand shape.
    let hola: Vec<Vec<f32>> = vec![(0..D).map(|i| (i % 9) as f32 * 0.1 + 0.05).collect(); N];
    let gracias: Vec<Vec<f32>> =
        vec![(0..D).map(|i| ((i * 5) % 11) as f32 * 0.08 + 0.05).collect(); N];
    let normalize_rows = |rows: &Vec<Vec<f32>>| -> Vec<Vec<f32>> {
        rows.iter()
            .map(|r| normalize(&FrameVector::from_values(r.clone())).into_values())
            .collect()
    };
    let classifier = TemplateClassifier::new(
        vec![normalize_rows(&hola), normalize_rows(&gracias)],
        0.05,
    )
    .unwrap();
    let labels = LabelMap::from_labels(["hola", "gracias"]).unwrap();
    let scorer = RecognitionScorer::new(Arc::new(classifier), labels);
    let mut gate = DebounceGate::new(
        RecognitionPolicy {
            confidence_threshold: 0.6,
            margin_threshold: 0.3,
        },
        GateConfig::recognition(),
    );
    let mut buffer = SequenceBuffer::new(N, D);

    // Perform "hola" three times in a row, then "gracias" once.
    let performance = hola
        .iter()
        .cycle()
        .take(N * 3)
        .chain(gracias.iter().cycle().take(N * 2));

    let mut announced = Vec::new();
    for (tick, row) in performance.enumerate() {
        buffer
            .push(normalize(&FrameVector::from_values(row.clone())))
            .unwrap();
        let Some(window) = buffer.snapshot() else {
            continue;
        };
        let result = scorer.classify(&window).unwrap();
        let observation = RecognitionObservation {
            result,
            timestamp_ns: tick as u64,
        };
        if let Some(event) = gate.observe(observation, tick as f64 / 30.0) {
            announced.push(event.label);
            buffer.reset();
        }
    }

    assert_eq!(announced, vec!["hola".to_string(), "gracias".to_string()]);
}
