use std::time::Duration;

/// Fixed-timestep accumulator: wall-clock time goes in, whole simulation steps come out.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: Duration,
    accumulator: Duration,
    total_steps: u64,
}

impl FixedStep {
    /// A clock producing one step per `step` of accumulated time. A zero step never ticks.
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            accumulator: Duration::ZERO,
            total_steps: 0,
        }
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta;
    }

    /// Consume one step from the accumulator, if a whole one is there.
    pub fn try_step(&mut self) -> bool {
        if self.step.is_zero() || self.accumulator < self.step {
            return false;
        }
        self.accumulator -= self.step;
        self.total_steps += 1;
        true
    }

    /// Time carried into the next frame.
    pub fn remainder(&self) -> Duration {
        self.accumulator
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Steps taken since creation.
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

/// Rolling history of frame times.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn recorded(&self) -> &[Duration] {
        let count = if self.filled { self.capacity } else { self.index };
        &self.history[..count]
    }

    pub fn average(&self) -> Duration {
        let recorded = self.recorded();
        if recorded.is_empty() {
            return Duration::ZERO;
        }
        recorded.iter().sum::<Duration>() / recorded.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.recorded().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.recorded().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Frames per second implied by the average frame time; zero before any sample.
    pub fn average_fps(&self) -> f32 {
        let avg = self.average();
        if avg.is_zero() {
            0.0
        } else {
            1.0 / avg.as_secs_f32()
        }
    }
}
