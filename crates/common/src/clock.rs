//! Session time base.
//!
//! Frame timestamps are nanoseconds since stream start. The gate and the
//! progress logs work on that time base; wall-clock time is only recorded
//! once, when a session starts, for transcripts and logs.

use std::time::Instant;

/// Monotonic session start plus its wall-clock time.
#[derive(Debug, Clone)]
pub struct SessionClock {
    started: Instant,
    epoch_wall: String,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Real time spent since `start`.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start (RFC 3339).
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Frame timestamp to gate seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }
}

/// Lets periodic work through at most once per interval of frame time.
#[derive(Debug)]
pub struct RateController {
    interval_ns: u64,
    last_ns: Option<u64>,
}

impl RateController {
    pub fn every_ns(interval_ns: u64) -> Self {
        Self {
            interval_ns,
            last_ns: None,
        }
    }

    /// True on the first call and whenever `interval_ns` has passed since
    /// the last `true`.
    pub fn should_tick(&mut self, now_ns: u64) -> bool {
        let due = match self.last_ns {
            None => true,
            Some(last) => now_ns >= last.saturating_add(self.interval_ns),
        };
        if due {
            self.last_ns = Some(now_ns);
        }
        due
    }
}
