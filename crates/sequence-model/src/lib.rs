//! SignGate Sequence Model
//!
//! Defines the data contracts shared by the admission pipeline:
//! - **Frames:** fixed-length landmark feature vectors with zero-fill for
//!   missing detections
//! - **Windows:** the sliding N-frame buffer and its immutable snapshots
//! - **Streams:** recorded extractor output in JSONL form
//! - **Events:** capture and recognition decisions
//! - **Labels and samples:** classifier label maps and persisted exemplars
//!
//! Landmark coordinates are the extractor's normalized image coordinates;
//! `0.0` always means "not detected".

pub mod event;
pub mod frame;
pub mod labels;
pub mod sample;
pub mod stream;
pub mod window;

pub use event::*;
pub use frame::*;
pub use labels::*;
pub use sample::*;
pub use stream::*;
pub use window::*;
