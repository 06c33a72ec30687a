//! SignGate Capture Engine
//!
//! Runs admission sessions over a live or recorded landmark stream.
//! A session owns the frame loop; scoring and gating happen inline, while
//! persistence and notification are handed to a dispatcher so a slow disk
//! or speaker never delays the next frame.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Session loop                    │
//! │  VideoSource ─> LandmarkExtractor ─> FrameVector │
//! │                                          │       │
//! │                                          ▼       │
//! │        SequenceBuffer ─> Scorer ─> DebounceGate  │
//! └──────────────────────────────────────┬───────────┘
//!                                        │ events
//!                                        ▼
//! ┌──────────────────────────────────────────────────┐
//! │                   Dispatcher                     │
//! │   capture: Augmenter ─> SamplePersistence        │
//! │   recognition: NotificationSink (log, JSONL)     │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod dispatch;
mod ingest;
pub mod session;
pub mod sink;
pub mod source;
pub mod stop;

pub use dispatch::{DispatchStats, Dispatcher, EventConsumer};
pub use session::*;
pub use sink::{
    read_transcript, JsonSampleStore, LogNotifier, NotificationSink, SamplePersistence,
    TranscriptHeader, TranscriptWriter,
};
pub use source::{
    ChannelSource, LandmarkExtractor, RecordedLandmarks, ReplaySource, SourceFrame, VideoSource,
};
pub use stop::StopHandle;
