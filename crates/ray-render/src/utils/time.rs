use std::time::{
    Duration,
    Instant,
};

/// Frame timer for the demo loop.
pub struct Timer {
    start: Instant,
    frames: u32,
    window_start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            frames: 0,
            window_start: now,
        }
    }

    /// Time since the previous call; counts one frame.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.start;
        self.start = now;
        self.frames += 1;
        elapsed
    }

    /// Average frame rate once at least `period` has passed since the last
    /// report, restarting the window.
    pub fn fps_every(&mut self, period: Duration) -> Option<f32> {
        let window = self.window_start.elapsed();
        if window < period || self.frames == 0 {
            return None;
        }
        let fps = frames_per_second(self.frames, window);
        self.frames = 0;
        self.window_start = Instant::now();
        Some(fps)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn frames_per_second(frames: u32, elapsed: Duration) -> f32 {
    frames as f32 / elapsed.as_secs_f32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_over_a_window() {
        assert_eq!(frames_per_second(60, Duration::from_secs(1)), 60.0);
        assert_eq!(frames_per_second(1, Duration::from_millis(250)), 4.0);
    }

    #[test]
    fn no_report_before_the_period() {
        let mut timer = Timer::new();
        timer.tick();
        assert_eq!(timer.fps_every(Duration::from_secs(3600)), None);
    }
}
