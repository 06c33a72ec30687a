//! Auto-capture training samples from a landmark stream.

use std::path::PathBuf;

use anyhow::Context;
use signgate_capture_engine::{
    CaptureSession, CaptureSessionConfig, JsonSampleStore, RecordedLandmarks, ReplaySource,
};
use signgate_common::config::AppConfig;

pub struct CaptureArgs {
    pub stream: PathBuf,
    pub label: String,
    pub output: Option<PathBuf>,
    pub target: Option<u32>,
    pub threshold: Option<f64>,
    pub seed: Option<u64>,
    pub paced: bool,
}

pub async fn run(mut config: AppConfig, args: CaptureArgs) -> anyhow::Result<()> {
    if let Some(threshold) = args.threshold {
        config.capture.quality_threshold = threshold;
    }
    if args.target.is_some() {
        config.capture.target_samples = args.target;
    }
    if args.seed.is_some() {
        config.capture.augmentation.seed = args.seed;
    }
    config.validate().context("Invalid capture settings")?;

    let samples_dir = args.output.unwrap_or_else(|| config.paths.samples_dir.clone());
    let source = ReplaySource::open(&args.stream)
        .with_context(|| format!("Failed to open stream {}", args.stream.display()))?
        .paced(args.paced);

    println!("Capturing \"{}\" from {}", args.label, args.stream.display());
    println!("  Samples: {}", samples_dir.join(&args.label).display());
    println!(
        "  Threshold: {:.2}  Variants: {}",
        config.capture.quality_threshold, config.capture.augmentation.variants
    );
    if let Some(target) = config.capture.target_samples {
        println!("  Target: {target} captures");
    }
    println!();

    let mut session = CaptureSession::new(
        CaptureSessionConfig::from_app(args.label.clone(), &config),
        source,
        RecordedLandmarks,
        JsonSampleStore::new(&samples_dir),
    );
    super::stop_on_ctrl_c(session.stop_handle());

    let summary = session.run().await.context("Capture session failed")?;

    println!("Session ended: {:?}", summary.end);
    println!("  Frames: {}", summary.frames_processed);
    println!("  Windows scored: {}", summary.windows_scored);
    if let Some(quality) = summary.average_quality {
        println!("  Average quality: {quality:.3}");
    }
    println!(
        "  Captures: {} ({:.2} per 100 frames)",
        summary.events_emitted,
        summary.events_per_100_frames()
    );
    if summary.dispatch.failed > 0 {
        println!(
            "  {} capture(s) not fully written, see log",
            summary.dispatch.failed
        );
    }

    Ok(())
}
