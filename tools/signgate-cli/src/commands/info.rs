//! Show landmark stream information.

use std::path::PathBuf;

use anyhow::Context;
use signgate_common::config::AppConfig;
use signgate_sequence_model::frame::{FrameVector, LandmarkLayout};
use signgate_sequence_model::stream::{parse_landmark_frames, parse_stream_header};

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read stream {}", path.display()))?;
    let header = parse_stream_header(&content)
        .transpose()
        .context("Malformed stream header")?;
    let frames = parse_landmark_frames(&content).context("Malformed landmark frame")?;

    println!("Stream: {}", path.display());
    let layout = match &header {
        Some(h) => {
            println!("  Schema: {}", h.schema_version);
            println!("  FPS: {}", h.fps);
            if !h.epoch_wall.is_empty() {
                println!("  Recorded: {}", h.epoch_wall);
            }
            h.layout
        }
        None => {
            println!("  No header, using configured layout");
            LandmarkLayout::from(&config.window)
        }
    };
    println!(
        "  Layout: {} x {} points x {} coords (D = {})",
        layout.slots,
        layout.points_per_set,
        layout.coords,
        layout.feature_dim()
    );
    println!();

    let Some(last) = frames.last() else {
        println!("No frames.");
        return Ok(());
    };
    let empty = frames.iter().filter(|f| f.sets.is_empty()).count();
    let sets: usize = frames.iter().map(|f| f.sets.len()).sum();
    let present: usize = frames
        .iter()
        .map(|f| FrameVector::from_landmarks(&f.sets, &layout).present_count())
        .sum();
    let duration = last.timestamp_secs();

    println!("Frames:");
    println!("  Count: {}", frames.len());
    println!("  Duration: {duration:.2}s");
    if duration > 0.0 {
        println!(
            "  Measured FPS: {:.1}",
            (frames.len() - 1) as f64 / duration
        );
    }
    println!(
        "  Empty: {} ({:.1}%)",
        empty,
        empty as f64 * 100.0 / frames.len() as f64
    );
    println!(
        "  Landmark sets per frame: {:.2}",
        sets as f64 / frames.len() as f64
    );
    println!(
        "  Completeness: {:.3}",
        present as f64 / (frames.len() * layout.feature_dim()).max(1) as f64
    );

    let windows = frames.len().saturating_sub(config.window.length - 1);
    println!("  Complete windows (N = {}): {windows}", config.window.length);

    Ok(())
}
