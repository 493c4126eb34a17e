//! Speed-scaled animation clock.
//!
//! Maps wallclock progress to abstract simulation time under a speed
//! multiplier. Programs animate against abstract time, so changing the
//! multiplier changes how fast the show runs without skipping.

use std::time::Instant;

/// Animation clock with a speed multiplier.
///
/// `1.0` is real time, `0.5` half speed, `0.0` freezes abstract time while
/// wallclock keeps advancing.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    /// Speed multiplier applied to elapsed wallclock time.
    speed: f64,
    /// Wallclock instant of the last update.
    last: Instant,
    /// Accumulated abstract time in seconds.
    abstract_seconds: f64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self {
            speed: 1.0,
            last: Instant::now(),
            abstract_seconds: 0.0,
        }
    }

    /// Get the current abstract time in seconds.
    ///
    /// Accumulates the wallclock delta since the previous call, scaled by the
    /// current speed. Back-to-back calls therefore return (almost) the same
    /// value rather than double-counting the elapsed interval.
    pub fn current_time(&mut self) -> f64 {
        self.advance_to(Instant::now())
    }

    /// Change the speed multiplier.
    ///
    /// Pending wallclock time is accumulated at the old speed first, so a
    /// speed change never retroactively rescales time that already passed.
    pub fn set_speed(&mut self, speed: f64) {
        self.advance_to(Instant::now());
        self.speed = speed;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Zero abstract time and rebind the wallclock reference to now.
    ///
    /// The speed multiplier is unaffected.
    pub fn reset(&mut self) {
        self.abstract_seconds = 0.0;
        self.last = Instant::now();
    }

    fn advance_to(&mut self, now: Instant) -> f64 {
        let delta = now.saturating_duration_since(self.last).as_secs_f64();
        self.abstract_seconds += delta * self.speed;
        self.last = now;
        self.abstract_seconds
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}
