//! Show quality metrics of a stored sample.

use std::path::PathBuf;

use anyhow::Context;
use signgate_common::config::AppConfig;
use signgate_processing_core::quality::QualityScorer;
use signgate_sequence_model::sample::SampleFile;

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let sample = SampleFile::load(&path)
        .with_context(|| format!("Failed to load sample {}", path.display()))?;
    let window = sample.to_window().context("Sample is not a valid window")?;
    let metrics = QualityScorer::new(config.capture.quality).score(&window);

    println!("Sample: {}", path.display());
    println!("  Label: {}", sample.label);
    println!(
        "  Capture {} variant {} ({:?})",
        sample.sample_index, sample.variant, sample.kind
    );
    println!("  Shape: {}x{}", window.len(), window.feature_dim());
    if let Some(quality) = sample.quality {
        println!("  Quality at capture: {quality:.3}");
    }
    println!();

    println!("Metrics:");
    println!("  Completeness:    {:.3}", metrics.completeness);
    println!("  Consistency:     {:.3}", metrics.consistency);
    println!("  Motion variance: {:.3}", metrics.motion_variance);
    println!("  Spatial spread:  {:.3}", metrics.spatial_spread);
    println!("  Composite:       {:.3}", metrics.composite);

    let threshold = config.capture.quality_threshold;
    if metrics.composite > threshold {
        println!("\nWould be admitted (> {threshold:.2}).");
    } else {
        println!("\nWould be rejected (<= {threshold:.2}).");
    }

    Ok(())
}
