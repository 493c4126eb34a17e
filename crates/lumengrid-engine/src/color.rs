//! Color type and palette helpers shared by the buffer and the programs.

use smart_leds::RGB8;

pub type Rgb = RGB8;

pub const BLACK: Rgb = Rgb::new(0, 0, 0);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const LIGHT_GRAY: Rgb = Rgb::new(192, 192, 192);
pub const RED: Rgb = Rgb::new(255, 0, 0);
pub const GREEN: Rgb = Rgb::new(0, 255, 0);
pub const BLUE: Rgb = Rgb::new(0, 0, 255);
pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
pub const CYAN: Rgb = Rgb::new(0, 255, 255);
pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);

/// Rainbow palette used by several visual programs.
pub const RAINBOW: [Rgb; 6] = [
    RED,
    Rgb::new(255, 127, 0),
    YELLOW,
    GREEN,
    Rgb::new(101, 101, 255),
    MAGENTA,
];

/// Create an RGB color from a u32 value (0xRRGGBB format)
pub const fn rgb_from_u32(color: u32) -> Rgb {
    Rgb {
        r: ((color >> 16) & 0xFF) as u8,
        g: ((color >> 8) & 0xFF) as u8,
        b: (color & 0xFF) as u8,
    }
}

/// Linear interpolation between two colors, `t` in `[0, 1]`.
pub fn interpolate(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - t) + f32::from(b) * t) as u8;
    Rgb {
        r: mix(a.r, b.r),
        g: mix(a.g, b.g),
        b: mix(a.b, b.b),
    }
}

// Cycle order chosen so that yellow, magenta, and cyan fall between the
// primaries they blend from.
const SIX_COLOR_WHEEL: [Rgb; 6] = [RED, MAGENTA, BLUE, CYAN, GREEN, YELLOW];

/// Smooth cyclic gradient through the six primary and secondary colors.
///
/// `t` is a position on the wheel; one full revolution per unit, so
/// `six_color_wheel(t)` and `six_color_wheel(t + 1.0)` agree.
pub fn six_color_wheel(t: f64) -> Rgb {
    let t6 = t.rem_euclid(1.0) * 6.0;
    let a_index = (t6 as usize) % 6;
    let b_index = (a_index + 1) % 6;
    interpolate(
        SIX_COLOR_WHEEL[a_index],
        SIX_COLOR_WHEEL[b_index],
        (t6 - a_index as f64) as f32,
    )
}
