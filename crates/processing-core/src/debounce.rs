//! Debounce gate: turns a per-window stream of observations into discrete,
//! rate-limited events.
//!
//! The gate is generic over an [`AdmissionPolicy`], which supplies the
//! qualifying predicate, the repeat key and the event payload. Capture and
//! recognition share the same state machine:
//!
//! ```text
//!            predicate false
//!   ┌──────────────────────────────┐
//!   v                              │
//! Idle ──predicate true──> Priming{held} ──held >= stable
//!   ^                         │            && interval ok
//!   │                         │            && (new key || cooldown ok)
//!   │                         v
//!   └────────next tick──── Emitted
//! ```
//!
//! Time is passed in by the caller as seconds on the session time base.

use signgate_common::config::{AfterEmit, GateConfig};
use signgate_sequence_model::event::{CaptureEvent, QualityMetrics, RecognitionEvent};
use signgate_sequence_model::stream::TimestampNs;
use signgate_sequence_model::window::WindowSnapshot;

use crate::recognition::RecognitionResult;

/// Strategy deciding what qualifies and what gets emitted.
pub trait AdmissionPolicy {
    type Observation;
    type Key: PartialEq + Clone + std::fmt::Debug;
    type Event;

    /// Whether this tick counts toward an emission.
    fn admits(&self, observation: &Self::Observation) -> bool;

    /// Identity used to suppress repeats (`None` when the policy has none).
    fn key(&self, observation: &Self::Observation) -> Option<Self::Key>;

    /// Build the event for an admitted observation.
    fn emit(&mut self, observation: Self::Observation) -> Self::Event;
}

/// Where the gate stands after the latest tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    /// Qualifying for `held` consecutive ticks without emitting yet.
    Priming { held: u32 },
    /// An event fired on the latest tick.
    Emitted,
}

/// Generic debounce state machine.
#[derive(Debug)]
pub struct DebounceGate<P: AdmissionPolicy> {
    policy: P,
    config: GateConfig,
    state: GateState,
    held: u32,
    armed: Option<P::Key>,
    last_emit_secs: Option<f64>,
    last_key: Option<P::Key>,
    emitted: u64,
}

impl<P: AdmissionPolicy> DebounceGate<P> {
    pub fn new(policy: P, config: GateConfig) -> Self {
        Self {
            policy,
            config,
            state: GateState::Idle,
            held: 0,
            armed: None,
            last_emit_secs: None,
            last_key: None,
            emitted: 0,
        }
    }

    /// Feed one complete-window observation taken at `now_secs`.
    pub fn observe(&mut self, observation: P::Observation, now_secs: f64) -> Option<P::Event> {
        if !self.policy.admits(&observation) {
            self.disqualify();
            return None;
        }

        // A streak belongs to one key; a different candidate starts over.
        let key = self.policy.key(&observation);
        if key != self.armed {
            self.held = 0;
            self.armed = key.clone();
        }
        self.held = self.held.saturating_add(1);
        if self.held < self.config.stable_frames {
            self.state = GateState::Priming { held: self.held };
            return None;
        }

        if !self.cooled_down(key.as_ref(), now_secs) {
            self.state = GateState::Priming { held: self.held };
            return None;
        }

        let event = self.policy.emit(observation);
        tracing::debug!(
            key = ?key,
            held = self.held,
            at_secs = now_secs,
            "Gate emitted"
        );
        self.held = 0;
        self.armed = None;
        self.last_emit_secs = Some(now_secs);
        self.last_key = key;
        self.emitted += 1;
        self.state = GateState::Emitted;
        Some(event)
    }

    /// Record a tick that fails the predicate without building an observation.
    pub fn disqualify(&mut self) {
        self.held = 0;
        self.armed = None;
        self.state = GateState::Idle;
    }

    /// Forget everything, including the last emission.
    pub fn reset(&mut self) {
        self.held = 0;
        self.armed = None;
        self.state = GateState::Idle;
        self.last_emit_secs = None;
        self.last_key = None;
    }

    fn cooled_down(&self, key: Option<&P::Key>, now_secs: f64) -> bool {
        let Some(last) = self.last_emit_secs else {
            return true;
        };
        let elapsed = now_secs - last;
        if elapsed < self.config.min_interval_secs {
            return false;
        }
        key != self.last_key.as_ref() || elapsed >= self.config.repeat_cooldown_secs
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Consecutive qualifying ticks so far.
    pub fn held(&self) -> u32 {
        self.held
    }

    pub fn after_emit(&self) -> AfterEmit {
        self.config.after_emit
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn last_key(&self) -> Option<&P::Key> {
        self.last_key.as_ref()
    }

    /// Events emitted since construction.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }
}

/// One scored capture window.
#[derive(Debug, Clone)]
pub struct CaptureObservation {
    pub metrics: QualityMetrics,
    pub window: WindowSnapshot,
    pub timestamp_ns: TimestampNs,
}

/// Capture admission: composite quality above a threshold. Events are
/// numbered from `next_index` upward.
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    pub quality_threshold: f64,
    next_index: u32,
}

impl CapturePolicy {
    pub fn new(quality_threshold: f64, first_index: u32) -> Self {
        Self {
            quality_threshold,
            next_index: first_index,
        }
    }

    /// Index the next capture will carry.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }
}

impl AdmissionPolicy for CapturePolicy {
    type Observation = CaptureObservation;
    type Key = ();
    type Event = CaptureEvent;

    fn admits(&self, observation: &CaptureObservation) -> bool {
        observation.metrics.composite > self.quality_threshold
    }

    fn key(&self, _observation: &CaptureObservation) -> Option<()> {
        None
    }

    fn emit(&mut self, observation: CaptureObservation) -> CaptureEvent {
        let sample_index = self.next_index;
        self.next_index += 1;
        CaptureEvent {
            sample_index,
            timestamp_ns: observation.timestamp_ns,
            metrics: observation.metrics,
            window: observation.window,
        }
    }
}

/// One classified recognition window.
#[derive(Debug, Clone)]
pub struct RecognitionObservation {
    pub result: RecognitionResult,
    pub timestamp_ns: TimestampNs,
}

/// Recognition admission: confident and unambiguous top label.
#[derive(Debug, Clone, Copy)]
pub struct RecognitionPolicy {
    pub confidence_threshold: f64,
    pub margin_threshold: f64,
}

impl AdmissionPolicy for RecognitionPolicy {
    type Observation = RecognitionObservation;
    type Key = String;
    type Event = RecognitionEvent;

    fn admits(&self, observation: &RecognitionObservation) -> bool {
        observation.result.top_probability > self.confidence_threshold
            && observation.result.margin > self.margin_threshold
    }

    fn key(&self, observation: &RecognitionObservation) -> Option<String> {
        Some(observation.result.label.clone())
    }

    fn emit(&mut self, observation: RecognitionObservation) -> RecognitionEvent {
        RecognitionEvent {
            label: observation.result.label,
            confidence: observation.result.top_probability,
            margin: observation.result.margin,
            timestamp_ns: observation.timestamp_ns,
        }
    }
}
