//! Native reference for the `wave-bands` preset.
//!
//! The surface is split into overlapping horizontal bands whose edges follow
//! a sine wave across x. Each band a pixel falls in adds one eighth of the
//! base color's complement, so overlapping bands step toward white. The
//! bundled shader in [`crate::presets`] computes the same function and the
//! tests hold the two to each other.

use shaderprog::{step, Rgba};

/// Scales elapsed seconds before they enter the wave phase.
pub const SPEED_MULTIPLIER: f32 = 1.5;
/// Number of bands composited per pixel.
pub const LOOPS: u32 = 8;
/// Scales the wave phase.
pub const ENERGY: f32 = 0.6;
/// Horizontal phase gradient across the normalized surface width.
const HORIZONTAL_PHASE: f32 = 4.3;
/// Peak amplitude of the band offset, in normalized height.
const AMPLITUDE: f32 = 0.05;

/// Per-band color increment: the complement of `base` split across all bands.
pub fn band_color(base: Rgba) -> [f32; 3] {
    let loops = LOOPS as f32;
    [
        (1.0 - base.r) / loops,
        (1.0 - base.g) / loops,
        (1.0 - base.b) / loops,
    ]
}

/// `1.0` when `uy` lies in `[loop_factor - 0.1, 1.0 + 2.0 * loop_factor)`,
/// otherwise `0.0`.
pub fn band_membership(uy: f32, loop_factor: f32) -> f32 {
    step(loop_factor - 0.1, uy) - step(1.0 + loop_factor * 2.0, uy)
}

/// Color of pixel `p` on a surface of `resolution` at time `t` seconds.
///
/// The result is not clamped and its alpha is always `1.0`.
pub fn wave_bands(p: [f32; 2], resolution: [f32; 2], t: f32, color: Rgba) -> Rgba {
    let ux = p[0] / resolution[0];
    let mut uy = p[1] / resolution[1];
    let time_offset = t * SPEED_MULTIPLIER;
    let h_adjustment = ux * HORIZONTAL_PHASE;
    let band = band_color(color);

    let mut out = [color.r, color.g, color.b];
    let mut i = 1.0_f32;
    while i <= LOOPS as f32 {
        let loop_factor = i * 0.1;
        let sin_input = (time_offset + h_adjustment) * ENERGY;
        let curve = sin_input.sin() * (1.0 - loop_factor) * AMPLITUDE;
        let membership = band_membership(uy, loop_factor);
        for (channel, increment) in out.iter_mut().zip(band) {
            *channel += increment * membership;
        }
        uy += curve;
        i += 1.0;
    }

    Rgba::new(out[0], out[1], out[2], 1.0)
}
