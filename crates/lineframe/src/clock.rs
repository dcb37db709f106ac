use std::time::{Duration, Instant};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(16);
pub const DEFAULT_TIME_STEP: f32 = 0.05;

/// Fixed-interval animation time source.
///
/// Time advances by a constant step per tick regardless of how late the tick
/// fires; a host that falls behind sees one tick, not a burst of catch-up
/// ticks.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    period: Duration,
    step: f32,
    time: f32,
    next_deadline: Option<Instant>,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD, DEFAULT_TIME_STEP)
    }
}

impl AnimationClock {
    pub fn new(period: Duration, step: f32) -> Self {
        Self {
            period,
            step,
            time: 0.0,
            next_deadline: None,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn is_running(&self) -> bool {
        self.next_deadline.is_some()
    }

    /// Schedules the first tick one period after `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_deadline = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next_deadline = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Advances time by one step and returns the new value.
    pub fn tick(&mut self) -> f32 {
        self.time += self.step;
        self.time
    }

    /// Ticks once if the deadline has passed and reschedules from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.tick();
        self.next_deadline = Some(now + self.period);
        true
    }
}
