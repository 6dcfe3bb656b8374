//! Wall-clock frame pacing
//!
//! Deadlines are computed from a fixed anchor (`anchor + n * frame`) rather
//! than by sleeping one frame after each emission, so processing jitter
//! never accumulates into drift.

use std::time::{Duration, Instant};
use tracing::debug;

/// Falling further behind than this re-anchors instead of bursting frames
const MAX_LAG_FRAMES: u32 = 5;

#[derive(Debug)]
pub(crate) struct FrameClock {
    frame: Duration,
    anchor: Instant,
    emitted: u32,
}

impl FrameClock {
    pub(crate) fn new(frame: Duration) -> Self {
        Self {
            frame,
            anchor: Instant::now(),
            emitted: 0,
        }
    }

    /// Start a fresh schedule from now (resume, seek, reconnect)
    pub(crate) fn restart(&mut self) {
        self.anchor = Instant::now();
        self.emitted = 0;
    }

    /// Deadline of the next frame boundary, counting the frame just produced
    pub(crate) fn next_deadline(&mut self) -> Instant {
        let Some(emitted) = self.emitted.checked_add(1) else {
            self.restart();
            return self.anchor + self.frame;
        };
        self.emitted = emitted;

        let deadline = self.anchor + self.frame * emitted;
        let now = Instant::now();
        if now > deadline + self.frame * MAX_LAG_FRAMES {
            debug!(
                lag_ms = (now - deadline).as_millis() as u64,
                "frame clock fell behind, re-anchoring"
            );
            self.restart();
            return now;
        }
        deadline
    }
}
