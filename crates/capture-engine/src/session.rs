//! Capture and recognition sessions.
//!
//! A session runs one ingestion loop on the current task: pull a frame,
//! extract and push it, score the window, feed the gate. Emitted events go
//! to a [`Dispatcher`] so persistence and notification never stall the
//! loop. Decisions are made strictly in frame order.

use std::time::Duration;

use serde::Serialize;
use signgate_common::clock::{RateController, SessionClock};
use signgate_common::config::{AfterEmit, AppConfig, CaptureDefaults, RecognitionDefaults};
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_processing_core::augment::Augmenter;
use signgate_processing_core::debounce::{
    CaptureObservation, CapturePolicy, DebounceGate, RecognitionObservation, RecognitionPolicy,
};
use signgate_processing_core::quality::QualityScorer;
use signgate_processing_core::recognition::{RecognitionResult, RecognitionScorer};
use signgate_sequence_model::frame::LandmarkLayout;
use signgate_sequence_model::window::WindowSnapshot;
use tokio::task::JoinHandle;

use crate::dispatch::{CaptureConsumer, DispatchStats, Dispatcher, RecognitionConsumer};
use crate::ingest::{Ingest, Tick};
use crate::sink::{NotificationSink, SamplePersistence};
use crate::source::{LandmarkExtractor, VideoSource};
use crate::stop::StopHandle;

/// Interval between progress log lines, on the frame time base.
const PROGRESS_INTERVAL_NS: u64 = 1_000_000_000;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet run.
    Idle,
    /// Ingestion loop active.
    Running,
    /// Loop ended and dispatcher drained.
    Finished,
}

/// Which pipeline a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Capture,
    Recognition,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The source ran out of frames.
    SourceExhausted,
    /// A stop was requested.
    Stopped,
    /// Capture reached its target sample count.
    TargetReached,
}

/// End-of-session statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub mode: SessionMode,
    pub end: SessionEnd,
    /// Frames pulled from the source.
    pub frames_processed: u64,
    /// Frames with no landmark set.
    pub empty_frames: u64,
    /// Frames dropped by a source, extraction or shape error.
    pub skipped_frames: u64,
    /// Complete windows scored or classified.
    pub windows_scored: u64,
    /// Complete windows too sparse to classify.
    pub sparse_windows: u64,
    /// Captures or recognitions emitted.
    pub events_emitted: u64,
    pub average_quality: Option<f64>,
    pub average_confidence: Option<f64>,
    /// Classifier errors and timeouts.
    pub classifier_failures: u64,
    pub dispatch: DispatchStats,
    /// Recognized labels in order.
    pub sentence: Vec<String>,
    pub duration_secs: f64,
}

impl SessionSummary {
    fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            end: SessionEnd::SourceExhausted,
            frames_processed: 0,
            empty_frames: 0,
            skipped_frames: 0,
            windows_scored: 0,
            sparse_windows: 0,
            events_emitted: 0,
            average_quality: None,
            average_confidence: None,
            classifier_failures: 0,
            dispatch: DispatchStats::default(),
            sentence: Vec::new(),
            duration_secs: 0.0,
        }
    }

    /// Emitted events per 100 frames processed.
    pub fn events_per_100_frames(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        self.events_emitted as f64 * 100.0 / self.frames_processed as f64
    }

    /// The last `n` recognized words, space separated.
    pub fn recent_sentence(&self, n: usize) -> String {
        let start = self.sentence.len().saturating_sub(n);
        self.sentence[start..].join(" ")
    }
}

fn mean(sum: f64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Parameters of a capture session.
#[derive(Debug, Clone)]
pub struct CaptureSessionConfig {
    /// Gesture being recorded; also the sample directory name.
    pub label: String,
    pub window_length: usize,
    pub layout: LandmarkLayout,
    pub capture: CaptureDefaults,
}

impl CaptureSessionConfig {
    pub fn from_app(label: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            label: label.into(),
            window_length: config.window.length,
            layout: LandmarkLayout::from(&config.window),
            capture: config.capture.clone(),
        }
    }
}

/// Watches a landmark stream for high-quality windows and stores each one
/// as augmented samples.
pub struct CaptureSession<S, X, P> {
    config: CaptureSessionConfig,
    state: SessionState,
    stop: StopHandle,
    parts: Option<(S, X, P)>,
}

impl<S, X, P> CaptureSession<S, X, P>
where
    S: VideoSource,
    X: LandmarkExtractor<S::Frame>,
    P: SamplePersistence + 'static,
{
    pub fn new(config: CaptureSessionConfig, source: S, extractor: X, store: P) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            stop: StopHandle::new(),
            parts: Some((source, extractor, store)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle for stopping the session from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until the source ends, a stop is requested, or the target is met.
    pub async fn run(&mut self) -> SigngateResult<SessionSummary> {
        let Some((source, extractor, store)) = self.parts.take() else {
            return Err(SigngateError::session("Session already started"));
        };
        let config = &self.config;
        let capture = &config.capture;

        let first_index = store.next_index(&config.label)?;
        let augmenter = Augmenter::new(capture.augmentation)?;
        let dispatcher = Dispatcher::spawn(CaptureConsumer::new(
            config.label.clone(),
            augmenter,
            store,
        ));

        let scorer = QualityScorer::new(capture.quality);
        let mut gate = DebounceGate::new(
            CapturePolicy::new(capture.quality_threshold, first_index),
            capture.gate,
        );
        let mut ingest = Ingest::new(
            source,
            extractor,
            config.layout,
            config.window_length,
            capture.normalize,
            self.stop.clone(),
        );

        let clock = SessionClock::start();
        let mut progress = RateController::every_ns(PROGRESS_INTERVAL_NS);
        let mut summary = SessionSummary::new(SessionMode::Capture);
        let mut quality_sum = 0.0;
        self.state = SessionState::Running;

        tracing::info!(
            label = %config.label,
            source = ingest.source_name(),
            first_index,
            target = ?capture.target_samples,
            epoch_wall = %clock.epoch_wall(),
            "Capture session started"
        );

        let end = loop {
            let (timestamp_ns, vector) = match ingest.next().await {
                Tick::End(end) => break end,
                Tick::Skipped => continue,
                Tick::Frame {
                    timestamp_ns,
                    vector,
                    ..
                } => (timestamp_ns, vector),
            };
            if !ingest.push(vector) {
                continue;
            }

            let Some(window) = ingest.buffer.snapshot() else {
                continue;
            };
            let metrics = scorer.score(&window);
            summary.windows_scored += 1;
            quality_sum += metrics.composite;

            if progress.should_tick(timestamp_ns) {
                tracing::debug!(
                    frames = ingest.frames,
                    quality = metrics.composite,
                    gate = ?gate.state(),
                    captures = summary.events_emitted,
                    "Capture progress"
                );
            }

            let observation = CaptureObservation {
                metrics,
                window,
                timestamp_ns,
            };
            let Some(event) = gate.observe(observation, SessionClock::ns_to_secs(timestamp_ns))
            else {
                continue;
            };

            summary.events_emitted += 1;
            tracing::info!(
                sample = event.sample_index,
                quality = event.metrics.composite,
                t_secs = SessionClock::ns_to_secs(timestamp_ns),
                "Auto-capture"
            );
            if gate.after_emit() == AfterEmit::Clear {
                ingest.buffer.reset();
            }
            if let Err(e) = dispatcher.send(event) {
                tracing::warn!(error = %e, "Capture not dispatched");
            }

            if let Some(target) = capture.target_samples {
                if summary.events_emitted >= u64::from(target) {
                    break SessionEnd::TargetReached;
                }
            }
        };

        let _ = ingest.release().await;
        summary.dispatch = dispatcher.drain().await;
        summary.end = end;
        summary.frames_processed = ingest.frames;
        summary.empty_frames = ingest.empty_frames;
        summary.skipped_frames = ingest.skipped_frames;
        summary.average_quality = mean(quality_sum, summary.windows_scored);
        summary.duration_secs = clock.elapsed_secs();
        self.state = SessionState::Finished;

        tracing::info!(
            label = %config.label,
            end = ?end,
            captures = summary.events_emitted,
            files_failed = summary.dispatch.failed,
            frames = summary.frames_processed,
            "Capture session finished"
        );
        Ok(summary)
    }
}

/// Parameters of a recognition session.
#[derive(Debug, Clone)]
pub struct RecognitionSessionConfig {
    pub window_length: usize,
    pub layout: LandmarkLayout,
    pub recognition: RecognitionDefaults,
}

impl RecognitionSessionConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            window_length: config.window.length,
            layout: LandmarkLayout::from(&config.window),
            recognition: config.recognition.clone(),
        }
    }
}

/// Classifies a landmark stream and announces each held gesture once.
pub struct RecognitionSession<S, X> {
    config: RecognitionSessionConfig,
    scorer: RecognitionScorer,
    state: SessionState,
    stop: StopHandle,
    parts: Option<(S, X, Vec<Box<dyn NotificationSink>>)>,
}

impl<S, X> RecognitionSession<S, X>
where
    S: VideoSource,
    X: LandmarkExtractor<S::Frame>,
{
    pub fn new(
        config: RecognitionSessionConfig,
        scorer: RecognitionScorer,
        source: S,
        extractor: X,
        sinks: Vec<Box<dyn NotificationSink>>,
    ) -> Self {
        Self {
            config,
            scorer,
            state: SessionState::Idle,
            stop: StopHandle::new(),
            parts: Some((source, extractor, sinks)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until the source ends or a stop is requested.
    pub async fn run(&mut self) -> SigngateResult<SessionSummary> {
        let Some((source, extractor, sinks)) = self.parts.take() else {
            return Err(SigngateError::session("Session already started"));
        };
        let config = &self.config;
        let rec = &config.recognition;
        let mut classifier = ClassifierCall::new(
            self.scorer.clone(),
            Duration::from_millis(rec.classifier_timeout_ms),
        );

        let dispatcher = Dispatcher::spawn(RecognitionConsumer::new(sinks));
        let mut gate = DebounceGate::new(
            RecognitionPolicy {
                confidence_threshold: rec.confidence_threshold,
                margin_threshold: rec.margin_threshold,
            },
            rec.gate,
        );
        let mut ingest = Ingest::new(
            source,
            extractor,
            config.layout,
            config.window_length,
            rec.normalize,
            self.stop.clone(),
        );

        let clock = SessionClock::start();
        let mut progress = RateController::every_ns(PROGRESS_INTERVAL_NS);
        let mut summary = SessionSummary::new(SessionMode::Recognition);
        let mut confidence_sum = 0.0;
        self.state = SessionState::Running;

        tracing::info!(
            classifier = self.scorer.classifier_name(),
            labels = self.scorer.labels().len(),
            source = ingest.source_name(),
            epoch_wall = %clock.epoch_wall(),
            "Recognition session started"
        );

        let end = loop {
            let (timestamp_ns, vector, empty) = match ingest.next().await {
                Tick::End(end) => break end,
                Tick::Skipped => continue,
                Tick::Frame {
                    timestamp_ns,
                    vector,
                    empty,
                } => (timestamp_ns, vector, empty),
            };

            if empty && rec.reset_on_empty_frame {
                if !ingest.buffer.is_empty() {
                    tracing::debug!(t_ns = timestamp_ns, "No hands in frame, window reset");
                }
                ingest.buffer.reset();
                gate.disqualify();
                continue;
            }
            if !ingest.push(vector) {
                continue;
            }
            let Some(window) = ingest.buffer.snapshot() else {
                continue;
            };

            if window.completeness() <= rec.min_completeness {
                summary.sparse_windows += 1;
                gate.disqualify();
                continue;
            }

            let result = tokio::select! {
                biased;
                _ = self.stop.stopped() => break SessionEnd::Stopped,
                result = classifier.classify(window) => result,
            };
            let result = match result {
                Ok(result) => result,
                Err(e) => {
                    summary.classifier_failures += 1;
                    tracing::warn!(t_ns = timestamp_ns, error = %e, "No decision this tick");
                    continue;
                }
            };
            summary.windows_scored += 1;
            confidence_sum += result.top_probability;

            if progress.should_tick(timestamp_ns) {
                tracing::debug!(
                    frames = ingest.frames,
                    top = %result.label,
                    confidence = result.top_probability,
                    margin = result.margin,
                    gate = ?gate.state(),
                    "Recognition progress"
                );
            }

            let observation = RecognitionObservation {
                result,
                timestamp_ns,
            };
            let Some(event) = gate.observe(observation, SessionClock::ns_to_secs(timestamp_ns))
            else {
                continue;
            };

            summary.events_emitted += 1;
            summary.sentence.push(event.label.clone());
            tracing::info!(
                label = %event.label,
                confidence = event.confidence_percent(),
                sentence = %summary.recent_sentence(5),
                "Recognized"
            );
            if gate.after_emit() == AfterEmit::Clear {
                ingest.buffer.reset();
            }
            if let Err(e) = dispatcher.send(event) {
                tracing::warn!(error = %e, "Recognition not dispatched");
            }
        };

        let _ = ingest.release().await;
        summary.dispatch = dispatcher.drain().await;
        summary.end = end;
        summary.frames_processed = ingest.frames;
        summary.empty_frames = ingest.empty_frames;
        summary.skipped_frames = ingest.skipped_frames;
        summary.average_confidence = mean(confidence_sum, summary.windows_scored);
        summary.duration_secs = clock.elapsed_secs();
        self.state = SessionState::Finished;

        tracing::info!(
            end = ?end,
            recognized = summary.events_emitted,
            classifier_failures = summary.classifier_failures,
            classifier_busy = classifier.is_busy(),
            frames = summary.frames_processed,
            "Recognition session finished"
        );
        Ok(summary)
    }
}

/// Runs the classifier on the blocking pool, one call at a time.
///
/// A call that overruns its deadline is left to finish in the background;
/// until it does, ticks are reported unavailable instead of starting
/// another call. Its late result is discarded.
struct ClassifierCall {
    scorer: RecognitionScorer,
    timeout: Duration,
    in_flight: Option<JoinHandle<SigngateResult<RecognitionResult>>>,
}

impl ClassifierCall {
    fn new(scorer: RecognitionScorer, timeout: Duration) -> Self {
        Self {
            scorer,
            timeout,
            in_flight: None,
        }
    }

    async fn classify(&mut self, window: WindowSnapshot) -> SigngateResult<RecognitionResult> {
        if let Some(previous) = &self.in_flight {
            if !previous.is_finished() {
                return Err(SigngateError::classifier("previous call still running"));
            }
            self.in_flight = None;
        }

        let scorer = self.scorer.clone();
        let mut call = tokio::task::spawn_blocking(move || scorer.classify(&window));
        match tokio::time::timeout(self.timeout, &mut call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SigngateError::classifier(format!(
                "classifier task failed: {join}"
            ))),
            Err(_) => {
                self.in_flight = Some(call);
                Err(SigngateError::classifier(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Whether an abandoned call is still running.
    fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rates_and_sentence() {
        let mut summary = SessionSummary::new(SessionMode::Recognition);
        assert_eq!(summary.events_per_100_frames(), 0.0);
        assert_eq!(summary.recent_sentence(5), "");

        summary.frames_processed = 400;
        summary.events_emitted = 6;
        summary.sentence = ["yo", "hola", "gracias", "si", "no", "hola"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!((summary.events_per_100_frames() - 1.5).abs() < 1e-9);
        assert_eq!(summary.recent_sentence(5), "hola gracias si no hola");
        assert_eq!(summary.recent_sentence(2), "no hola");
    }

    #[test]
    fn test_config_from_app() {
        let app = AppConfig::default();
        let capture = CaptureSessionConfig::from_app("hola", &app);
        assert_eq!(capture.window_length, 15);
        assert_eq!(capture.layout.feature_dim(), 126);
        assert!(!capture.capture.normalize);

        let recognition = RecognitionSessionConfig::from_app(&app);
        assert!(recognition.recognition.normalize);
        assert_eq!(recognition.recognition.gate.after_emit, AfterEmit::Clear);
    }

    #[test]
    fn test_summary_serializes_with_dispatch_stats() {
        let mut summary = SessionSummary::new(SessionMode::Capture);
        summary.end = SessionEnd::TargetReached;
        summary.dispatch.delivered = 3;
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["mode"], "capture");
        assert_eq!(value["end"], "target_reached");
        assert_eq!(value["dispatch"]["delivered"], 3);
    }
}
