//! The escape-time iteration itself.
//!
//! A point `c` is known to lie outside the Mandelbrot set as soon as
//! the orbit `z -> z² + c`, started from zero, leaves the circle of
//! radius two.  The number of steps that took is the "height" of `c`.
//! Points that are still inside the circle after the whole budget are
//! treated as members of the set and get the budget itself, so every
//! height lies in `1..=limit`.
//!
//! Near the boundary of the set these heights are chaotic: nudging
//! `c` by the last bit of an `f64` can change the answer completely.
//! That's the fractal, not a bug.

use num::Complex;

use signal::StopSignal;

/// The classic iterator: how many steps until the orbit of `c`
/// escapes, or `limit` if it never does.
#[inline]
pub fn escape_time(c: Complex<f64>, limit: u32) -> u32 {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    for i in 1..=limit {
        z = z * z + c;
        if z.norm_sqr() >= 4.0 {
            return i;
        }
    }
    limit
}

/// Like `escape_time`, but gives up as soon as `stop` is raised, even
/// halfway through the orbit.  Returns `None` if it gave up; a point
/// that was interrupted has no height.
#[inline]
pub fn escape_time_until(c: Complex<f64>, limit: u32, stop: &StopSignal) -> Option<u32> {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    for i in 1..=limit {
        if stop.is_set() {
            return None;
        }
        z = z * z + c;
        if z.norm_sqr() >= 4.0 {
            return Some(i);
        }
    }
    Some(limit)
}
