//! Application-side visual programs.
//!
//! These are deliberately small; the interesting programs plug in from
//! outside the daemon through the same [`VisualProgram`] contract.

use lumengrid_engine::buffer::{Axis, GridId, LightBuffer};
use lumengrid_engine::color::{self, Rgb};
use lumengrid_engine::program::VisualProgram;

/// Fills the whole buffer with one color and holds it.
pub struct SolidProgram {
    color: Rgb,
}

impl SolidProgram {
    pub fn new(color: Rgb) -> Self {
        Self { color }
    }
}

impl Default for SolidProgram {
    fn default() -> Self {
        Self::new(color::WHITE)
    }
}

impl VisualProgram for SolidProgram {
    fn name(&self) -> &str {
        "solid"
    }

    fn init(&mut self, lights: &mut LightBuffer) {
        lights.fill(self.color, true);
    }

    fn step(&mut self, _time_ms: f64, _lights: &mut LightBuffer) -> bool {
        true
    }
}

/// Colored planes falling down the towers.
///
/// Every beat the buffer shifts one level down the y axis; every other beat
/// a freshly colored plane enters at the top, so bands of color cascade
/// through and exit at the bottom.
pub struct CascadeProgram {
    beat_ms: f64,
    next_beat_ms: f64,
    beat: u64,
}

impl CascadeProgram {
    pub fn new(beat_ms: f64) -> Self {
        Self {
            beat_ms,
            next_beat_ms: 0.0,
            beat: 0,
        }
    }
}

impl Default for CascadeProgram {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl VisualProgram for CascadeProgram {
    fn name(&self) -> &str {
        "cascade"
    }

    fn init(&mut self, lights: &mut LightBuffer) {
        lights.fill(color::BLACK, false);
        self.next_beat_ms = 0.0;
        self.beat = 0;
    }

    fn step(&mut self, time_ms: f64, lights: &mut LightBuffer) -> bool {
        if time_ms >= self.next_beat_ms {
            self.advance(lights);
            self.next_beat_ms = time_ms + self.beat_ms;
        }
        true
    }
}

impl CascadeProgram {
    fn advance(&mut self, lights: &mut LightBuffer) {
        lights.shift_out_axis(Axis::Y, -1, GridId::All);
        if self.beat % 2 == 0 {
            let top = lights.dims(GridId::All)[1] as i32 - 1;
            let band = color::six_color_wheel(self.beat as f64 / 12.0);
            lights.fill_plane(Axis::Y, top, GridId::All, band, true);
        }
        self.beat = self.beat.wrapping_add(1);
    }
}
