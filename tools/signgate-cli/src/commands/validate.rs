//! Validate stored samples.

use std::path::{Path, PathBuf};

use anyhow::Context;
use signgate_common::config::AppConfig;
use signgate_sequence_model::sample::SampleFile;

pub fn run(config: &AppConfig, path: Option<PathBuf>) -> anyhow::Result<()> {
    let root = path.unwrap_or_else(|| config.paths.samples_dir.clone());
    println!("Validating samples at: {}", root.display());

    let mut labels: Vec<PathBuf> = std::fs::read_dir(&root)
        .with_context(|| format!("Failed to read {}", root.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    labels.sort();

    let mut total = 0usize;
    let mut issues = Vec::new();
    for dir in &labels {
        let count = check_label(config, dir, &mut issues)?;
        let label = dir.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("  {label}: {count} file(s)");
        total += count;
    }

    println!();
    if issues.is_empty() {
        println!("{total} sample file(s) across {} label(s), all valid.", labels.len());
    } else {
        println!("Validation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found in {total} sample file(s).",
            issues.len()
        );
    }

    Ok(())
}

fn check_label(config: &AppConfig, dir: &Path, issues: &mut Vec<String>) -> anyhow::Result<usize> {
    let expected = (config.window.length, config.window.feature_dim());
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    for file in &files {
        let name = file.display();
        let sample = match SampleFile::load(file) {
            Ok(sample) => sample,
            Err(e) => {
                issues.push(format!("{name}: {e}"));
                continue;
            }
        };
        issues.extend(sample.validate().into_iter().map(|e| format!("{name}: {e}")));
        if (sample.window_length, sample.feature_dim) != expected {
            issues.push(format!(
                "{name}: {}x{} does not match configured {}x{}",
                sample.window_length, sample.feature_dim, expected.0, expected.1
            ));
        }
    }
    Ok(files.len())
}
