//! Off-path event dispatch.
//!
//! The session is the only producer; one consumer runs on the blocking pool
//! and handles events in emission order. Sending never blocks the frame
//! loop.

use serde::Serialize;
use signgate_common::error::{SigngateError, SigngateResult};
use signgate_processing_core::augment::Augmenter;
use signgate_sequence_model::event::{CaptureEvent, RecognitionEvent};
use signgate_sequence_model::sample::SampleFile;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sink::{NotificationSink, SamplePersistence};

/// Handles one emitted event. Runs off the frame path.
pub trait EventConsumer<E>: Send + 'static {
    fn consume(&mut self, event: E) -> SigngateResult<()>;

    /// Called once after the last event.
    fn finish(&mut self) -> SigngateResult<()> {
        Ok(())
    }
}

/// Delivery counts reported when the dispatcher drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Producer side of a single-consumer event queue.
pub struct Dispatcher<E> {
    tx: mpsc::UnboundedSender<E>,
    handle: JoinHandle<DispatchStats>,
}

impl<E: Send + 'static> Dispatcher<E> {
    /// Start the consumer on the blocking pool.
    pub fn spawn<C: EventConsumer<E>>(mut consumer: C) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<E>();
        let handle = tokio::task::spawn_blocking(move || {
            let mut stats = DispatchStats::default();
            while let Some(event) = rx.blocking_recv() {
                match consumer.consume(event) {
                    Ok(()) => stats.delivered += 1,
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(error = %e, "Event handling failed");
                    }
                }
            }
            if let Err(e) = consumer.finish() {
                tracing::warn!(error = %e, "Event consumer did not finish cleanly");
            }
            stats
        });
        Self { tx, handle }
    }

    /// Queue an event. Fails only if the consumer has gone away.
    pub fn send(&self, event: E) -> SigngateResult<()> {
        self.tx
            .send(event)
            .map_err(|_| SigngateError::session("event dispatcher has stopped"))
    }

    /// Close the queue and wait for already-queued events to be handled.
    pub async fn drain(self) -> DispatchStats {
        drop(self.tx);
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "Event dispatcher panicked");
                DispatchStats::default()
            }
        }
    }
}

/// Augments admitted windows and persists every variant.
pub struct CaptureConsumer<P> {
    label: String,
    augmenter: Augmenter,
    store: P,
    files_written: u64,
}

impl<P: SamplePersistence> CaptureConsumer<P> {
    pub fn new(label: impl Into<String>, augmenter: Augmenter, store: P) -> Self {
        Self {
            label: label.into(),
            augmenter,
            store,
            files_written: 0,
        }
    }
}

impl<P: SamplePersistence + 'static> EventConsumer<CaptureEvent> for CaptureConsumer<P> {
    fn consume(&mut self, event: CaptureEvent) -> SigngateResult<()> {
        let mut failures = 0usize;
        let variants = self.augmenter.augment(&event.window);
        let total = variants.len();
        for (variant, (kind, window)) in variants.into_iter().enumerate() {
            let sample = SampleFile::new(&self.label, event.sample_index, variant, kind, &window)
                .with_quality(event.metrics.composite);
            match self.store.persist(&sample) {
                Ok(path) => {
                    self.files_written += 1;
                    tracing::debug!(path = %path.display(), "Sample written");
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        sample = event.sample_index,
                        variant,
                        error = %e,
                        "Sample lost"
                    );
                }
            }
        }

        if failures > 0 {
            return Err(SigngateError::persistence(format!(
                "{failures} of {total} variants of sample {} not written",
                event.sample_index
            )));
        }
        Ok(())
    }

    fn finish(&mut self) -> SigngateResult<()> {
        tracing::info!(
            label = %self.label,
            files = self.files_written,
            "Capture dispatcher finished"
        );
        Ok(())
    }
}

/// Fans recognitions out to every notification sink.
pub struct RecognitionConsumer {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl RecognitionConsumer {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl EventConsumer<RecognitionEvent> for RecognitionConsumer {
    fn consume(&mut self, event: RecognitionEvent) -> SigngateResult<()> {
        let mut failed = Vec::new();
        for sink in &mut self.sinks {
            if let Err(e) = sink.notify(&event) {
                tracing::warn!(sink = sink.name(), error = %e, "Notification failed");
                failed.push(sink.name().to_string());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(SigngateError::notification(format!(
                "{} not notified of {:?}",
                failed.join(", "),
                event.label
            )))
        }
    }

    fn finish(&mut self) -> SigngateResult<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}
