//! SignGate Processing Core: the admission pipeline
//!
//! Decides, window by window, when a landmark stream holds enough evidence
//! to commit to a decision:
//! - **Normalize:** per-frame standardization of present landmarks
//! - **Quality:** capture-mode composite score of a complete window
//! - **Recognition:** classifier distribution to top label and margin
//! - **Debounce:** stability and cooldown gate shared by both modes
//! - **Augment:** perturbed variants of an admitted capture
//!
//! This crate is pure computation with no I/O beyond loading the template
//! artifact. All inputs are data; all outputs are data.

pub mod augment;
pub mod debounce;
pub mod normalize;
pub mod quality;
pub mod recognition;
pub mod template;

pub use augment::Augmenter;
pub use debounce::{
    AdmissionPolicy, CaptureObservation, CapturePolicy, DebounceGate, GateState,
    RecognitionObservation, RecognitionPolicy,
};
pub use normalize::{normalize, normalize_window};
pub use quality::QualityScorer;
pub use recognition::{Classifier, RecognitionResult, RecognitionScorer};
pub use template::TemplateClassifier;
