//! Shared pattern math
//!
//! Curve mapping and the timing rules most patterns build on. Every pattern
//! plans its moves as trapezoids whose ramps take a third of the move time
//! each, which is where the 1.5 and 3.0 factors come from.

use libm::{fabsf, powf};

/// Map `input` from `[orig_min, orig_max]` onto `[new_begin, new_end]` along
/// a logarithmic curve
///
/// `curve` is clamped to `[-10, 10]`. Zero is linear, positive values give
/// more weight to the `new_end` side, negative values to `new_begin`. The
/// input is clamped to the original range first. An inverted original range
/// yields 0.
pub fn fscale(
    orig_min: f32,
    orig_max: f32,
    new_begin: f32,
    new_end: f32,
    input: f32,
    curve: f32,
) -> f32 {
    if orig_min > orig_max {
        return 0.0;
    }

    let curve = powf(10.0, -0.1 * curve.max(-10.0).min(10.0));
    let input = input.max(orig_min).min(orig_max);
    let orig_range = orig_max - orig_min;
    let normalized = if orig_range > 0.0 {
        (input - orig_min) / orig_range
    } else {
        0.0
    };
    let scaled = powf(normalized, curve);

    if new_end > new_begin {
        scaled * (new_end - new_begin) + new_begin
    } else {
        new_begin - scaled * (new_begin - new_end)
    }
}

/// Integer linear map, truncating like a classic microcontroller `map`
///
/// The input is truncated to an integer before mapping. A degenerate input
/// range maps everything onto `out_min`.
pub fn map_range(x: f32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let span = i64::from(in_max) - i64::from(in_min);
    if span == 0 {
        return out_min;
    }
    let x = if x.is_finite() { x as i64 } else { 0 };
    let mapped = (x - i64::from(in_min)) * (i64::from(out_max) - i64::from(out_min)) / span
        + i64::from(out_min);
    mapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Peak speed of a move covering `distance` in `time` with third-length ramps
pub fn trapezoid_speed(distance: f32, time: f32) -> f32 {
    1.5 * distance / time
}

/// Ramp acceleration to reach `speed` within a third of `time`
pub fn trapezoid_acceleration(speed: f32, time: f32) -> f32 {
    3.0 * speed / time
}

/// Split of one stroke period into an in and an out move
///
/// The faster of both moves takes between a half and a sixth of the period,
/// depending on how far the sensation is from zero. Positive sensation makes
/// the in move the fast one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InOutTiming {
    /// Duration of the in move in s
    pub time_in: f32,
    /// Duration of the out move in s
    pub time_out: f32,
}

impl InOutTiming {
    pub fn new(time_of_stroke: f32, sensation: f32) -> Self {
        let fast = 0.5 * time_of_stroke / fscale(0.0, 100.0, 1.0, 3.0, fabsf(sensation), -2.0);
        if sensation > 0.0 {
            Self {
                time_in: fast,
                time_out: time_of_stroke - fast,
            }
        } else {
            Self {
                time_in: time_of_stroke - fast,
                time_out: fast,
            }
        }
    }
}
