//! Downstream collaborators for emitted events.
//!
//! Both run on the dispatcher, off the frame path, so they are free to
//! block on disk or speech.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_sequence_model::event::RecognitionEvent;
use signgate_sequence_model::sample::{next_sample_index, SampleFile};

/// Stores captured samples.
pub trait SamplePersistence: Send {
    /// Write one sample and return where it went.
    fn persist(&mut self, sample: &SampleFile) -> SigngateResult<PathBuf>;

    /// First sample index that will not collide with stored samples.
    fn next_index(&self, _label: &str) -> SigngateResult<u32> {
        Ok(0)
    }
}

/// Writes samples as JSON under `<root>/<label>/`.
#[derive(Debug, Clone)]
pub struct JsonSampleStore {
    root: PathBuf,
    written: u64,
}

impl JsonSampleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn label_dir(&self, label: &str) -> PathBuf {
        self.root.join(label)
    }

    /// Samples written by this store.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl SamplePersistence for JsonSampleStore {
    fn persist(&mut self, sample: &SampleFile) -> SigngateResult<PathBuf> {
        let dir = self.label_dir(&sample.label);
        let path = dir.join(sample.file_name());
        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let json = serde_json::to_string(sample).map_err(std::io::Error::other)?;
            std::fs::write(&path, json)
        };
        write().map_err(|e| {
            SigngateError::persistence(format!("Failed to write {}: {e}", path.display()))
        })?;
        self.written += 1;
        Ok(path)
    }

    fn next_index(&self, label: &str) -> SigngateResult<u32> {
        next_sample_index(self.label_dir(label))
    }
}

/// Receives recognized gestures.
pub trait NotificationSink: Send {
    fn notify(&mut self, event: &RecognitionEvent) -> SigngateResult<()>;

    /// Flush anything buffered.
    fn flush(&mut self) -> SigngateResult<()> {
        Ok(())
    }

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Announces recognitions through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&mut self, event: &RecognitionEvent) -> SigngateResult<()> {
        tracing::info!(
            label = %event.label,
            confidence = event.confidence_percent(),
            margin = event.margin,
            t_secs = event.timestamp_ns as f64 / 1e9,
            "Gesture recognized"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Header line of a recognition transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptHeader {
    pub schema_version: String,
    /// Wall-clock time at session start (RFC 3339).
    pub epoch_wall: String,
    /// Labels the classifier can produce, in class-index order.
    pub labels: Vec<String>,
}

/// Append-only JSONL transcript of recognitions, flushed per event.
pub struct TranscriptWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    events_written: u64,
}

impl TranscriptWriter {
    /// Create the transcript, writing the header as a `#` line.
    pub fn create(path: impl Into<PathBuf>, header: &TranscriptHeader) -> SigngateResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "# {}", serde_json::to_string(header)?)
            .map_err(|e| SigngateError::notification(format!("Failed to write header: {e}")))?;

        Ok(Self {
            writer,
            path,
            events_written: 0,
        })
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for TranscriptWriter {
    fn notify(&mut self, event: &RecognitionEvent) -> SigngateResult<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| SigngateError::notification(format!("Failed to write event: {e}")))?;
        self.events_written += 1;
        self.flush()
    }

    fn flush(&mut self) -> SigngateResult<()> {
        self.writer
            .flush()
            .map_err(|e| SigngateError::notification(format!("Failed to flush transcript: {e}")))
    }

    fn name(&self) -> &str {
        "transcript"
    }
}

impl Drop for TranscriptWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Read a transcript back, skipping the header.
pub fn read_transcript(path: impl AsRef<Path>) -> SigngateResult<Vec<RecognitionEvent>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| serde_json::from_str(l).map_err(SigngateError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use signgate_sequence_model::sample::VariantKind;
    use signgate_sequence_model::window::WindowSnapshot;

    #[test]
    fn test_store_writes_under_label_dir() {
        let root = std::env::temp_dir().join("signgate_test_store");
        let _ = std::fs::remove_dir_all(&root);
        let mut store = JsonSampleStore::new(&root);
        assert_eq!(store.next_index("hola").unwrap(), 0);

        let window = WindowSnapshot::from_rows(vec![vec![0.5; 3]; 2]).unwrap();
        let sample = SampleFile::new("hola", 3, 1, VariantKind::Scale, &window);
        let path = store.persist(&sample).unwrap();

        assert_eq!(path, root.join("hola").join("smart_003_1.json"));
        assert_eq!(SampleFile::load(&path).unwrap().frames, sample.frames);
        assert_eq!(store.next_index("hola").unwrap(), 4);
        assert_eq!(store.written(), 1);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_store_failure_is_persistence_error() {
        let root = std::env::temp_dir().join("signgate_test_store_blocked");
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        // A file where the label directory should be.
        std::fs::write(root.join("si"), "").unwrap();

        let window = WindowSnapshot::from_rows(vec![vec![0.5; 3]; 2]).unwrap();
        let sample = SampleFile::new("si", 0, 0, VariantKind::Noise, &window);
        let err = JsonSampleStore::new(&root).persist(&sample).unwrap_err();
        assert!(matches!(err, SigngateError::PersistenceFailure { .. }));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_transcript_roundtrip() {
        let dir = std::env::temp_dir().join("signgate_test_transcript");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("transcript.jsonl");
        let header = TranscriptHeader {
            schema_version: "1.0".to_string(),
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
            labels: vec!["hola".to_string(), "gracias".to_string()],
        };

        let mut writer = TranscriptWriter::create(&path, &header).unwrap();
        for (label, t) in [("hola", 1_000_000_000u64), ("gracias", 2_500_000_000)] {
            writer
                .notify(&RecognitionEvent {
                    label: label.to_string(),
                    confidence: 0.9,
                    margin: 0.7,
                    timestamp_ns: t,
                })
                .unwrap();
        }
        assert_eq!(writer.events_written(), 2);

        // Flushed per event, readable before drop.
        let events = read_transcript(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].label, "gracias");
        let first_line = std::fs::read_to_string(&path).unwrap();
        assert!(first_line.starts_with("# {"));

        drop(writer);
        std::fs::remove_dir_all(&dir).ok();
    }
}
