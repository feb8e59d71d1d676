use std::time::Instant;

/// Clock feeding `u_time`. The engine restarts it when the render loop starts.
pub trait TimeSource: Send {
    fn restart(&mut self);
    /// Seconds since the last restart.
    fn seconds(&mut self) -> f32;
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    started: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn restart(&mut self) {
        self.started = Instant::now();
    }

    fn seconds(&mut self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

/// Clock frozen at one instant; used for stills, tests and the checker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimeSource(pub f32);

impl FixedTimeSource {
    pub fn new(seconds: f32) -> Self {
        Self(seconds)
    }
}

impl TimeSource for FixedTimeSource {
    fn restart(&mut self) {}

    fn seconds(&mut self) -> f32 {
        self.0
    }
}

/// Host hook that delivers the next frame callback.
///
/// The engine asks for exactly one frame at a time; the host later calls
/// `RenderEngine::on_frame`, which requests the following one.
pub trait FrameScheduler {
    fn request_frame(&mut self);
    fn cancel_frame(&mut self);
}

/// Scheduler for hosts that pump frames themselves, such as tests and the
/// headless checker. It only remembers whether a frame is pending.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    pending: bool,
    requests: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Clears the pending flag, returning whether a frame was due.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total number of frames requested since creation.
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_ignores_restart() {
        let mut source = FixedTimeSource::new(2.5);
        assert_eq!(source.seconds(), 2.5);
        source.restart();
        assert_eq!(source.seconds(), 2.5);
    }

    #[test]
    fn manual_scheduler_tracks_one_pending_frame() {
        let mut scheduler = ManualScheduler::new();
        scheduler.request_frame();
        assert!(scheduler.is_pending());
        scheduler.cancel_frame();
        assert!(!scheduler.take_pending());
        scheduler.request_frame();
        assert!(scheduler.take_pending());
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.requests(), 2);
    }
}
