// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Counts frames and reports the total once per wall-clock second.
#[derive(Debug)]
pub struct FpsCounter {
    frame_count: u64,
    expiry: Instant,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            frame_count: 0,
            expiry: now + REPORT_INTERVAL,
        }
    }

    /// Records one rendered frame at `now`.
    ///
    /// Returns the number of frames counted in the finished window once a
    /// second has elapsed; the count then restarts from zero.
    pub fn tick(&mut self, now: Instant) -> Option<u64> {
        self.frame_count += 1;
        if now < self.expiry {
            return None;
        }

        let frames = self.frame_count;
        self.frame_count = 0;
        self.expiry = now + REPORT_INTERVAL;
        Some(frames)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Window title shown for a finished one-second window.
pub fn fps_title(frames: u64) -> String {
    format!("Hello world! {} FPS", frames)
}
