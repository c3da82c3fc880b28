//! Frame time tracking for the simulation tick
//!
//! The host drives the simulation with one call per animation frame, supplying
//! the time elapsed since the previous frame and since start.

use serde::{Deserialize, Serialize};

/// Time information for the frame currently being processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTime {
    /// Delta time for this frame in seconds
    pub delta: f32,
    /// Time since start in seconds, as reported by the host
    pub elapsed: f64,
    /// Number of frames processed so far
    pub frame_count: u64,
}

impl FrameTime {
    /// Record a new frame with explicit delta and elapsed times
    pub fn update(&mut self, delta: f32, elapsed: f64) {
        self.delta = delta.max(0.0);
        self.elapsed = elapsed;
        self.frame_count += 1;
    }

    /// Record a new frame, accumulating the elapsed time from the delta
    pub fn advance(&mut self, delta: f32) {
        let elapsed = self.elapsed + delta.max(0.0) as f64;
        self.update(delta, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut time = FrameTime::default();
        time.advance(0.5);
        time.advance(0.25);

        assert_eq!(time.frame_count, 2);
        assert_eq!(time.delta, 0.25);
        assert!((time.elapsed - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_negative_delta_is_clamped() {
        let mut time = FrameTime::default();
        time.update(-1.0, 3.0);
        assert_eq!(time.delta, 0.0);
        assert_eq!(time.elapsed, 3.0);
    }
}
