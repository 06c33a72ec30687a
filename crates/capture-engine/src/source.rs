//! Frame sources and landmark extraction.
//!
//! A session pulls frames from a [`VideoSource`] and turns each one into
//! landmark sets with a [`LandmarkExtractor`]. Both are external
//! collaborators; this module ships a replay source for recorded landmark
//! streams and a channel source for frames produced elsewhere.

use std::collections::VecDeque;
use std::path::Path;

use signgate_common::error::{SigngateError, SigngateResult};
use signgate_sequence_model::frame::LandmarkSet;
use signgate_sequence_model::stream::{
    parse_landmark_frames, parse_stream_header, LandmarkFrame, LandmarkStreamHeader, TimestampNs,
};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// One frame pulled from a source, stamped on the session time base.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFrame<F> {
    pub timestamp_ns: TimestampNs,
    pub frame: F,
}

/// Produces frames on demand.
#[async_trait::async_trait]
pub trait VideoSource: Send {
    type Frame: Send + 'static;

    /// Next frame, or `None` at end of stream.
    async fn next_frame(&mut self) -> SigngateResult<Option<SourceFrame<Self::Frame>>>;

    /// Release the underlying device or file.
    async fn release(&mut self) -> SigngateResult<()>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Turns a raw frame into zero or more landmark sets.
pub trait LandmarkExtractor<F>: Send {
    fn extract(&mut self, frame: &F) -> SigngateResult<Vec<LandmarkSet>>;

    /// Extractor name for logging.
    fn name(&self) -> &str {
        "extractor"
    }
}

/// Replays a recorded landmark stream.
///
/// Frames are the recorded landmark sets, so the matching extractor is
/// [`RecordedLandmarks`]. With pacing enabled, frames are released no
/// faster than their recorded timestamps.
pub struct ReplaySource {
    name: String,
    header: Option<LandmarkStreamHeader>,
    frames: VecDeque<LandmarkFrame>,
    paced: bool,
    /// When the first frame was released, and its timestamp.
    origin: Option<(Instant, u64)>,
    released: bool,
}

impl ReplaySource {
    /// Open a JSONL landmark stream.
    pub fn open(path: impl AsRef<Path>) -> SigngateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SigngateError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let header = parse_stream_header(&content).transpose()?;
        let frames = parse_landmark_frames(&content)?;
        tracing::debug!(
            path = %path.display(),
            frames = frames.len(),
            "Opened landmark stream"
        );
        let mut source = Self::from_frames(frames);
        source.header = header;
        source.name = path.display().to_string();
        Ok(source)
    }

    pub fn from_frames(frames: Vec<LandmarkFrame>) -> Self {
        Self {
            name: "replay".to_string(),
            header: None,
            frames: frames.into(),
            paced: false,
            origin: None,
            released: false,
        }
    }

    /// Release frames in real time instead of as fast as possible.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn header(&self) -> Option<&LandmarkStreamHeader> {
        self.header.as_ref()
    }

    /// Frames not yet replayed.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[async_trait::async_trait]
impl VideoSource for ReplaySource {
    type Frame = Vec<LandmarkSet>;

    async fn next_frame(&mut self) -> SigngateResult<Option<SourceFrame<Self::Frame>>> {
        if self.released {
            return Err(SigngateError::SourceExhausted);
        }
        let Some(frame) = self.frames.pop_front() else {
            return Ok(None);
        };

        if self.paced {
            let (started, first_ns) = *self
                .origin
                .get_or_insert_with(|| (Instant::now(), frame.timestamp_ns));
            let offset = frame.timestamp_ns.saturating_sub(first_ns);
            tokio::time::sleep_until(started + Duration::from_nanos(offset)).await;
        }

        Ok(Some(SourceFrame {
            timestamp_ns: frame.timestamp_ns,
            frame: frame.sets,
        }))
    }

    async fn release(&mut self) -> SigngateResult<()> {
        self.released = true;
        self.frames.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extractor for sources whose frames already are landmark sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordedLandmarks;

impl LandmarkExtractor<Vec<LandmarkSet>> for RecordedLandmarks {
    fn extract(&mut self, frame: &Vec<LandmarkSet>) -> SigngateResult<Vec<LandmarkSet>> {
        Ok(frame.clone())
    }

    fn name(&self) -> &str {
        "recorded"
    }
}

/// Source fed through a channel by another task (a camera thread, a test).
///
/// The stream ends when every sender is dropped.
pub struct ChannelSource<F> {
    rx: mpsc::Receiver<SourceFrame<F>>,
}

impl<F: Send + 'static> ChannelSource<F> {
    /// Create a source and the sender that feeds it.
    pub fn new(capacity: usize) -> (mpsc::Sender<SourceFrame<F>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl<F: Send + 'static> VideoSource for ChannelSource<F> {
    type Frame = F;

    async fn next_frame(&mut self) -> SigngateResult<Option<SourceFrame<F>>> {
        Ok(self.rx.recv().await)
    }

    async fn release(&mut self) -> SigngateResult<()> {
        self.rx.close();
        Ok(())
    }

    fn name(&self) -> &str {
        "channel"
    }
}
