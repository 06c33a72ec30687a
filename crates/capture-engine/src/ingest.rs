//! Frame acquisition shared by both session kinds.

use signgate_common::error::SigngateResult;
use signgate_processing_core::normalize::normalize;
use signgate_sequence_model::frame::{FrameVector, LandmarkLayout};
use signgate_sequence_model::stream::TimestampNs;
use signgate_sequence_model::window::SequenceBuffer;

use crate::session::SessionEnd;
use crate::source::{LandmarkExtractor, VideoSource};
use crate::stop::StopHandle;

/// Outcome of pulling one frame.
pub(crate) enum Tick {
    /// A frame was extracted into a vector ready to push.
    Frame {
        timestamp_ns: TimestampNs,
        vector: FrameVector,
        /// No landmark set was detected at all.
        empty: bool,
    },
    /// The frame could not be used; nothing changes this tick.
    Skipped,
    End(SessionEnd),
}

/// Owns the source, extractor and window for one session.
pub(crate) struct Ingest<S, X> {
    source: S,
    extractor: X,
    layout: LandmarkLayout,
    normalize: bool,
    stop: StopHandle,
    pub buffer: SequenceBuffer,
    pub frames: u64,
    pub empty_frames: u64,
    pub skipped_frames: u64,
}

impl<S, X> Ingest<S, X>
where
    S: VideoSource,
    X: LandmarkExtractor<S::Frame>,
{
    pub fn new(
        source: S,
        extractor: X,
        layout: LandmarkLayout,
        window_length: usize,
        normalize: bool,
        stop: StopHandle,
    ) -> Self {
        Self {
            buffer: SequenceBuffer::new(window_length, layout.feature_dim()),
            source,
            extractor,
            layout,
            normalize,
            stop,
            frames: 0,
            empty_frames: 0,
            skipped_frames: 0,
        }
    }

    /// Wait for the next frame or a stop request, whichever comes first.
    pub async fn next(&mut self) -> Tick {
        if self.stop.is_stopped() {
            return Tick::End(SessionEnd::Stopped);
        }

        let pulled = tokio::select! {
            biased;
            _ = self.stop.stopped() => return Tick::End(SessionEnd::Stopped),
            pulled = self.source.next_frame() => pulled,
        };

        let frame = match pulled {
            Ok(Some(frame)) => frame,
            Ok(None) => return Tick::End(SessionEnd::SourceExhausted),
            Err(e) if e.is_terminal() => return Tick::End(SessionEnd::SourceExhausted),
            Err(e) => {
                self.skipped_frames += 1;
                tracing::warn!(source = self.source.name(), error = %e, "Frame read failed");
                return Tick::Skipped;
            }
        };
        self.frames += 1;

        let sets = match self.extractor.extract(&frame.frame) {
            Ok(sets) => sets,
            Err(e) => {
                self.skipped_frames += 1;
                tracing::warn!(
                    extractor = self.extractor.name(),
                    t_ns = frame.timestamp_ns,
                    error = %e,
                    "Landmark extraction failed"
                );
                return Tick::Skipped;
            }
        };
        if sets.is_empty() {
            self.empty_frames += 1;
        }

        let mut vector = FrameVector::from_landmarks(&sets, &self.layout);
        if self.normalize {
            vector = normalize(&vector);
        }
        Tick::Frame {
            timestamp_ns: frame.timestamp_ns,
            vector,
            empty: sets.is_empty(),
        }
    }

    /// Push a vector, counting a rejected one as skipped.
    pub fn push(&mut self, vector: FrameVector) -> bool {
        match self.buffer.push(vector) {
            Ok(()) => true,
            Err(e) => {
                self.skipped_frames += 1;
                tracing::warn!(error = %e, "Frame rejected by window");
                false
            }
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Release the source. Failures are logged; the session is over anyway.
    pub async fn release(&mut self) -> SigngateResult<()> {
        let released = self.source.release().await;
        if let Err(e) = &released {
            tracing::warn!(source = self.source.name(), error = %e, "Source release failed");
        }
        released
    }
}
