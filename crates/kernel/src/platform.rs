use std::time::{Duration, Instant};

use tilespace_object::DrawList;
use tilespace_world::LayerStack;

/// What the engine hands the platform at the end of a frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Frames completed before this one.
    pub index: u64,
    pub fps: f32,
    pub draw_list: &'a DrawList,
    pub layers: &'a LayerStack,
}

/// Display, input and timing services the main loop consumes.
pub trait Platform {
    /// Wall-clock time since the previous call.
    fn frame_delta(&mut self) -> Duration;

    /// Whether the display asked to close.
    fn should_close(&self) -> bool;

    /// Pump window/OS events. Called once per frame.
    fn poll_events(&mut self) {}

    /// Refresh input state. Called once per simulation step.
    fn sample_input(&mut self) {}

    /// Show the finished frame.
    fn present(&mut self, _frame: &Frame<'_>) {}
}

/// A platform with no display: fixed or real-time deltas, closes after a frame budget.
#[derive(Debug)]
pub struct Headless {
    delta: Option<Duration>,
    last: Instant,
    frame_limit: Option<u64>,
    frames: u64,
    sprites_presented: usize,
}

impl Headless {
    /// Every frame reports exactly `delta`.
    pub fn fixed(delta: Duration) -> Self {
        Self {
            delta: Some(delta),
            last: Instant::now(),
            frame_limit: None,
            frames: 0,
            sprites_presented: 0,
        }
    }

    /// Frames report real elapsed time.
    pub fn realtime() -> Self {
        Self {
            delta: None,
            ..Self::fixed(Duration::ZERO)
        }
    }

    /// Request close once `frames` frames have been presented.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    /// Sprites in every presented frame, summed.
    pub fn sprites_presented(&self) -> usize {
        self.sprites_presented
    }
}

impl Platform for Headless {
    fn frame_delta(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        self.delta.unwrap_or(elapsed)
    }

    fn should_close(&self) -> bool {
        self.frame_limit.is_some_and(|limit| self.frames >= limit)
    }

    fn present(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        self.sprites_presented += frame.draw_list.len();
        tracing::trace!(
            frame = frame.index,
            sprites = frame.draw_list.len(),
            layers = frame.layers.len(),
            "headless present"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_headless_reports_constant_delta() {
        let mut platform = Headless::fixed(Duration::from_millis(16));
        assert_eq!(platform.frame_delta(), Duration::from_millis(16));
        assert_eq!(platform.frame_delta(), Duration::from_millis(16));
    }

    #[test]
    fn closes_after_frame_limit() {
        let mut platform = Headless::fixed(Duration::from_millis(1)).with_frame_limit(2);
        let draw_list = DrawList::new();
        let layers = LayerStack::new();
        let frame = Frame {
            index: 0,
            fps: 0.0,
            draw_list: &draw_list,
            layers: &layers,
        };

        assert!(!platform.should_close());
        platform.present(&frame);
        assert!(!platform.should_close());
        platform.present(&frame);
        assert!(platform.should_close());
        assert_eq!(platform.frames_presented(), 2);
    }

    #[test]
    fn unlimited_never_closes() {
        let platform = Headless::realtime();
        assert!(!platform.should_close());
    }
}
