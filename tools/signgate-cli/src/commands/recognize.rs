//! Recognize gestures in a landmark stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use signgate_capture_engine::{
    LogNotifier, NotificationSink, RecognitionSession, RecognitionSessionConfig,
    RecordedLandmarks, ReplaySource, TranscriptHeader, TranscriptWriter,
};
use signgate_common::clock::SessionClock;
use signgate_common::config::AppConfig;
use signgate_processing_core::recognition::RecognitionScorer;
use signgate_processing_core::template::TemplateClassifier;
use signgate_sequence_model::labels::LabelMap;

pub struct RecognizeArgs {
    pub stream: PathBuf,
    pub model: PathBuf,
    pub labels: PathBuf,
    pub transcript: Option<PathBuf>,
    pub confidence: Option<f64>,
    pub margin: Option<f64>,
    pub paced: bool,
}

pub async fn run(mut config: AppConfig, args: RecognizeArgs) -> anyhow::Result<()> {
    if let Some(confidence) = args.confidence {
        config.recognition.confidence_threshold = confidence;
    }
    if let Some(margin) = args.margin {
        config.recognition.margin_threshold = margin;
    }
    config.validate().context("Invalid recognition settings")?;

    let classifier = TemplateClassifier::load(&args.model)
        .with_context(|| format!("Failed to load model {}", args.model.display()))?;
    let labels = LabelMap::load(&args.labels)
        .with_context(|| format!("Failed to load labels {}", args.labels.display()))?;
    if classifier.class_count() != labels.len() {
        anyhow::bail!(
            "Model has {} classes but the label map has {}",
            classifier.class_count(),
            labels.len()
        );
    }
    if classifier.window_length != config.window.length
        || classifier.feature_dim != config.window.feature_dim()
    {
        anyhow::bail!(
            "Model expects {}x{} windows, configuration gives {}x{}",
            classifier.window_length,
            classifier.feature_dim,
            config.window.length,
            config.window.feature_dim()
        );
    }

    let source = ReplaySource::open(&args.stream)
        .with_context(|| format!("Failed to open stream {}", args.stream.display()))?
        .paced(args.paced);

    let mut sinks: Vec<Box<dyn NotificationSink>> = vec![Box::new(LogNotifier)];
    if let Some(path) = &args.transcript {
        let header = TranscriptHeader {
            schema_version: "1.0".to_string(),
            epoch_wall: SessionClock::start().epoch_wall().to_string(),
            labels: labels.labels().to_vec(),
        };
        let writer = TranscriptWriter::create(path, &header)
            .with_context(|| format!("Failed to create transcript {}", path.display()))?;
        sinks.push(Box::new(writer));
    }

    println!("Recognizing {}", args.stream.display());
    println!("  Labels: {}", labels.labels().join(", "));
    println!(
        "  Confidence > {:.2}  Margin > {:.2}",
        config.recognition.confidence_threshold, config.recognition.margin_threshold
    );
    println!();

    let scorer = RecognitionScorer::new(Arc::new(classifier), labels);
    let mut session = RecognitionSession::new(
        RecognitionSessionConfig::from_app(&config),
        scorer,
        source,
        RecordedLandmarks,
        sinks,
    );
    super::stop_on_ctrl_c(session.stop_handle());

    let summary = session.run().await.context("Recognition session failed")?;

    println!("Session ended: {:?}", summary.end);
    println!("  Frames: {}", summary.frames_processed);
    println!("  Windows classified: {}", summary.windows_scored);
    if let Some(confidence) = summary.average_confidence {
        println!("  Average confidence: {:.0}%", confidence * 100.0);
    }
    if summary.classifier_failures > 0 {
        println!("  Classifier failures: {}", summary.classifier_failures);
    }
    println!("  Recognized: {}", summary.events_emitted);
    if !summary.sentence.is_empty() {
        println!();
        println!("Sentence: {}", summary.recent_sentence(5));
    }
    if let Some(path) = &args.transcript {
        println!("Transcript: {}", path.display());
    }

    Ok(())
}
