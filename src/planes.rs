//! Contains the GridSpec struct, which describes a relationship
//! between a rectangle of pixels on the integral plane with an origin
//! at 0,0, and the lattice of points on the complex plane that those
//! pixels sample.  Unlike a renderer's pixel mapping, both corners of
//! the complex rectangle are sampled exactly: the first and last
//! column sit on the ends of the x range, the first and last row on
//! the ends of the y range.
use num::Complex;

use error::ConfigurationError;

/// Describes the column, row of a pixel in the grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// A rectangular lattice of sample points on the complex plane.  Once
/// a computation starts, its grid does not change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridSpec {
    width: usize,
    height: usize,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

/// The most points a single grid may hold.  At four bytes a height,
/// that's a quarter of a gigabyte of heightmap.
pub const MAX_GRID_POINTS: usize = 1 << 26;

fn check_range(axis: &'static str, range: (f64, f64)) -> Result<(), ConfigurationError> {
    let (min, max) = range;
    if !(min.is_finite() && max.is_finite()) || min >= max {
        return Err(ConfigurationError::BadRange { axis, min, max });
    }
    Ok(())
}

impl GridSpec {
    /// Takes the number of columns and rows, and the real (x) and
    /// imaginary (y) extents to spread them over.  Malformed grids
    /// are rejected here so that nothing downstream has to care.
    pub fn new(
        width: usize,
        height: usize,
        x_range: (f64, f64),
        y_range: (f64, f64),
    ) -> Result<GridSpec, ConfigurationError> {
        if width == 0 || height == 0 {
            return Err(ConfigurationError::EmptyGrid(width, height));
        }
        match width.checked_mul(height) {
            Some(points) if points <= MAX_GRID_POINTS => {}
            _ => return Err(ConfigurationError::GridTooLarge(width, height, MAX_GRID_POINTS)),
        }
        check_range("x", x_range)?;
        check_range("y", y_range)?;
        Ok(GridSpec {
            width,
            height,
            x_range,
            y_range,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The total number of points in the grid.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Always false; a GridSpec can't be built empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The real coordinate of every column.
    pub fn xs(&self) -> Vec<f64> {
        linspace(self.x_range.0, self.x_range.1, self.width)
    }

    /// The imaginary coordinate of every row.
    pub fn ys(&self) -> Vec<f64> {
        linspace(self.y_range.0, self.y_range.1, self.height)
    }

    /// Given a pixel, return the point on the complex plane it samples.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            spaced(self.x_range.0, self.x_range.1, self.width, pixel.0),
            spaced(self.y_range.0, self.y_range.1, self.height, pixel.1),
        )
    }
}

// The i-th of n evenly spaced values from start to stop, inclusive.
// The last one is pinned to stop so rounding can't move the edge.
fn spaced(start: f64, stop: f64, n: usize, i: usize) -> f64 {
    if n < 2 {
        return start;
    }
    if i == n - 1 {
        return stop;
    }
    start + (i as f64) * ((stop - start) / ((n - 1) as f64))
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| spaced(start, stop, n, i)).collect()
}

/// Values from `start` up to but excluding `stop`, `step` apart.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || stop <= start {
        return vec![];
    }
    let count = ((stop - start) / step).ceil() as usize;
    (0..count).map(|i| start + (i as f64) * step).collect()
}
