// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Heightmap generation
//!
//! Every function here walks a lattice of points on the complex
//! plane, computes the escape time of each one, and stops as soon as
//! it is told to.  "Told to" means the `StopSignal` is raised, and it
//! is checked before every point and again at every step of every
//! orbit, so no matter how big the lattice is, the work done after
//! the signal goes up is at most one step of one point.  (Checking
//! only at the end of each row would let a long row run to completion
//! after the budget expired.)
//!
//! There are three walks:
//!
//! * `generate_grid` covers a fixed grid exactly once.
//! * `sweep_repeating` covers a fixed grid over and over, reusing the
//!   same buffer, until stopped.  Memory stays flat no matter how
//!   long it runs.
//! * `sweep_streaming` marches out along the real axis forever, one
//!   column at a time, keeping every point it computes.
//!
//! None of them are fast, and that's the point: they exist to keep a
//! CPU busy for as long as they are allowed to.

use num::Complex;
use serde::Serialize;

use escape::escape_time_until;
use monitor::{Monitor, MonitorSink, Snapshot};
use planes::{arange, GridSpec, Pixel};
use signal::StopSignal;

/// The escape times over a grid.  `z[row][column]` is the height of
/// the point `(x[column], y[row])`.  Points that were never computed,
/// because the run was stopped first, hold zero.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Heightmap {
    /// Real coordinate of each column.
    pub x: Vec<f64>,
    /// Imaginary coordinate of each row.
    pub y: Vec<f64>,
    /// One row of heights per entry in `y`.
    pub z: Vec<Vec<u32>>,
    #[serde(skip)]
    completed: usize,
}

impl Heightmap {
    /// An empty (all zero) heightmap shaped for the grid.
    pub fn new(grid: &GridSpec) -> Self {
        Heightmap {
            x: grid.xs(),
            y: grid.ys(),
            z: vec![vec![0; grid.width()]; grid.height()],
            completed: 0,
        }
    }

    /// How many points hold a real height.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Did every point get computed?
    pub fn is_complete(&self) -> bool {
        self.completed == self.x.len() * self.y.len()
    }

    fn clear(&mut self) {
        for row in self.z.iter_mut() {
            for cell in row.iter_mut() {
                *cell = 0;
            }
        }
        self.completed = 0;
    }
}

/// Points from an open-ended sweep, in the order they were computed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trace {
    /// Real coordinate of each point.
    pub x: Vec<f64>,
    /// Imaginary coordinate of each point.
    pub y: Vec<f64>,
    /// Height of each point.
    pub z: Vec<u32>,
}

impl Trace {
    /// Number of points in the trace.
    pub fn len(&self) -> usize {
        self.z.len()
    }

    /// True if nothing was computed at all.
    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    fn push(&mut self, point: Complex<f64>, height: u32) {
        self.x.push(point.re);
        self.y.push(point.im);
        self.z.push(height);
    }
}

/// Where an open-ended streaming sweep starts, and how finely it
/// samples the plane.  The first column is one `x_increment` to the
/// right of `x_start`; each column covers `y_range` from the bottom
/// up, excluding the top.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Streaming {
    /// The sweep begins just right of this real coordinate.
    pub x_start: f64,
    /// Distance between columns.
    pub x_increment: f64,
    /// Bottom and (excluded) top of every column.
    pub y_range: (f64, f64),
    /// Distance between rows.
    pub y_increment: f64,
}

/// Where the streaming sweep starts by default.
pub const STREAMING_X_START: f64 = -1.5;
/// The rows every streaming column covers by default.
pub const STREAMING_Y_RANGE: (f64, f64) = (-1.26, 1.26);
/// Default spacing between streaming samples, on both axes.
pub const STREAMING_INCREMENT: f64 = 0.01;

impl Default for Streaming {
    fn default() -> Self {
        Streaming {
            x_start: STREAMING_X_START,
            x_increment: STREAMING_INCREMENT,
            y_range: STREAMING_Y_RANGE,
            y_increment: STREAMING_INCREMENT,
        }
    }
}

/// The outcome of `sweep_repeating`.
#[derive(Clone, Debug)]
pub struct Repeated {
    /// Passes over the grid that ran to the end.
    pub passes: u64,
    /// Points computed across all passes, partial ones included.
    pub points: u64,
    /// The buffer as the last (usually partial) pass left it.
    pub heightmap: Heightmap,
}

fn stopped() {
    warn!("Stop signal received - returning early.");
}

/// Compute every point of `grid` into `heightmap`, which must have
/// been shaped for it.  Returns true if the pass finished, false if
/// it was stopped part way through.
pub fn fill_grid<S: MonitorSink>(
    grid: &GridSpec,
    heightmap: &mut Heightmap,
    limit: u32,
    monitor: &mut Monitor<S>,
    stop: &StopSignal,
) -> bool {
    heightmap.clear();
    for (row, column) in iproduct!(0..grid.height(), 0..grid.width()) {
        if stop.is_set() {
            stopped();
            return false;
        }
        let c = grid.pixel_to_point(&Pixel(column, row));
        match escape_time_until(c, limit, stop) {
            Some(height) => {
                heightmap.z[row][column] = height;
                heightmap.completed += 1;
                monitor.observe(Snapshot {
                    x: c.re,
                    y: c.im,
                    z: height,
                });
            }
            None => {
                stopped();
                return false;
            }
        }
    }
    true
}

/// The heightmap of a fixed grid, computed once.  If `stop` goes up
/// part way through, whatever was finished by then is returned.
pub fn generate_grid<S: MonitorSink>(
    grid: &GridSpec,
    limit: u32,
    monitor: &mut Monitor<S>,
    stop: &StopSignal,
) -> Heightmap {
    let mut heightmap = Heightmap::new(grid);
    fill_grid(grid, &mut heightmap, limit, monitor, stop);
    heightmap
}

/// Recompute the same grid until stopped.  The buffer is allocated
/// once up front and reused by every pass.
pub fn sweep_repeating<S: MonitorSink>(
    grid: &GridSpec,
    limit: u32,
    monitor: &mut Monitor<S>,
    stop: &StopSignal,
) -> Repeated {
    let mut heightmap = Heightmap::new(grid);
    let mut passes = 0;
    let mut points = 0;
    loop {
        let finished = fill_grid(grid, &mut heightmap, limit, monitor, stop);
        points += heightmap.completed() as u64;
        if !finished {
            break;
        }
        passes += 1;
        debug!("Finished pass {} over the grid.", passes);
    }
    Repeated {
        passes,
        points,
        heightmap,
    }
}

/// March along the real axis column by column, with no end, until
/// stopped.  Every computed point is kept, so the trace grows for as
/// long as the sweep runs.
pub fn sweep_streaming<S: MonitorSink>(
    sweep: &Streaming,
    limit: u32,
    monitor: &mut Monitor<S>,
    stop: &StopSignal,
) -> Trace {
    let ys = arange(sweep.y_range.0, sweep.y_range.1, sweep.y_increment);
    let mut trace = Trace::default();
    if ys.is_empty() {
        return trace;
    }
    for column in 1u64.. {
        let x = sweep.x_start + (column as f64) * sweep.x_increment;
        for &y in &ys {
            if stop.is_set() {
                stopped();
                return trace;
            }
            let c = Complex::new(x, y);
            match escape_time_until(c, limit, stop) {
                Some(height) => {
                    trace.push(c, height);
                    monitor.observe(Snapshot { x, y, z: height });
                }
                None => {
                    stopped();
                    return trace;
                }
            }
        }
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use failure::Error;
    use monitor::{MonitorCadence, NullSink};

    /// Raises the stop signal after seeing a given number of
    /// snapshots, standing in for a watchdog that fires mid-run.
    struct StopAfter {
        remaining: usize,
        stop: StopSignal,
    }

    impl MonitorSink for StopAfter {
        fn send(&mut self, _snapshot: &Snapshot) -> Result<(), Error> {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.stop.set();
            }
            Ok(())
        }
    }

    fn quiet() -> Monitor<NullSink> {
        Monitor::new(MonitorCadence::Off, NullSink)
    }

    fn grid(width: usize, height: usize) -> GridSpec {
        GridSpec::new(width, height, (-1.5, 0.6), (-1.26, 1.26)).unwrap()
    }

    #[test]
    fn grid_has_the_requested_shape() {
        let heightmap = generate_grid(&grid(10, 6), 64, &mut quiet(), &StopSignal::new());
        assert_eq!(heightmap.x.len(), 10);
        assert_eq!(heightmap.y.len(), 6);
        assert_eq!(heightmap.z.len(), 6);
        assert!(heightmap.z.iter().all(|row| row.len() == 10));
        assert!(heightmap.is_complete());
        assert!(heightmap
            .z
            .iter()
            .flat_map(|row| row.iter())
            .all(|&h| h >= 1 && h <= 64));
    }

    #[test]
    fn grid_values_match_the_kernel() {
        let grid = GridSpec::new(5, 5, (-2.0, 2.0), (-2.0, 2.0)).unwrap();
        let heightmap = generate_grid(&grid, 64, &mut quiet(), &StopSignal::new());
        // (0, 0) sits in the middle and never escapes; (2, 2) in the
        // top right corner escapes at once.
        assert_eq!(heightmap.z[2][2], 64);
        assert_eq!(heightmap.z[4][4], 1);
        assert_eq!(heightmap.z[2][1], 64);
    }

    #[test]
    fn identical_grids_give_identical_heightmaps() {
        let stop = StopSignal::new();
        let a = generate_grid(&grid(40, 30), 64, &mut quiet(), &stop);
        let b = generate_grid(&grid(40, 30), 64, &mut quiet(), &stop);
        assert_eq!(a, b);
    }

    #[test]
    fn a_raised_signal_stops_before_the_first_point() {
        let stop = StopSignal::new();
        stop.set();
        let heightmap = generate_grid(&grid(50, 50), 64, &mut quiet(), &stop);
        assert_eq!(heightmap.completed(), 0);
        assert!(heightmap.z.iter().all(|row| row.iter().all(|&h| h == 0)));
    }

    #[test]
    fn stopping_mid_row_stops_at_the_next_point() {
        // With a 100 point wide grid, stopping after 10 points means
        // stopping in the middle of the first row.  Finishing the row
        // first would leave 100 points computed instead of 10.
        let stop = StopSignal::new();
        let mut monitor = Monitor::new(
            MonitorCadence::Points(1),
            StopAfter {
                remaining: 10,
                stop: stop.clone(),
            },
        );
        let heightmap = generate_grid(&grid(100, 100), 64, &mut monitor, &stop);
        assert_eq!(heightmap.completed(), 10);
        assert!(heightmap.z[0][..10].iter().all(|&h| h >= 1));
        assert!(heightmap.z[0][10..].iter().all(|&h| h == 0));
    }

    #[test]
    fn snapshots_carry_real_heights() {
        let mut monitor = Monitor::new(MonitorCadence::Points(7), Vec::new());
        generate_grid(&grid(20, 20), 32, &mut monitor, &StopSignal::new());
        let snapshots = monitor.into_sink();
        assert_eq!(snapshots.len(), 58);
        assert!(snapshots.iter().all(|s| s.z >= 1 && s.z <= 32));
    }

    #[test]
    fn monitoring_does_not_change_the_result() {
        let stop = StopSignal::new();
        let mut loud = Monitor::new(MonitorCadence::Points(1), Vec::new());
        let watched = generate_grid(&grid(25, 25), 64, &mut loud, &stop);
        let unwatched = generate_grid(&grid(25, 25), 64, &mut quiet(), &stop);
        assert_eq!(watched, unwatched);
    }

    #[test]
    fn repeating_sweep_counts_whole_passes() {
        let stop = StopSignal::new();
        // 16 points per pass; stop during the third pass.
        let mut monitor = Monitor::new(
            MonitorCadence::Points(1),
            StopAfter {
                remaining: 40,
                stop: stop.clone(),
            },
        );
        let repeated = sweep_repeating(&grid(4, 4), 64, &mut monitor, &stop);
        assert_eq!(repeated.passes, 2);
        assert_eq!(repeated.points, 40);
        assert_eq!(repeated.heightmap.completed(), 8);
    }

    #[test]
    fn streaming_sweep_walks_columns_left_to_right() {
        let stop = StopSignal::new();
        let sweep = Streaming {
            x_start: -1.0,
            x_increment: 0.5,
            y_range: (-1.0, 1.0),
            y_increment: 0.5,
        };
        let mut monitor = Monitor::new(
            MonitorCadence::Points(1),
            StopAfter {
                remaining: 9,
                stop: stop.clone(),
            },
        );
        let trace = sweep_streaming(&sweep, 64, &mut monitor, &stop);
        assert_eq!(trace.len(), 9);
        assert_eq!(&trace.x[..5], &[-0.5, -0.5, -0.5, -0.5, 0.0]);
        assert_eq!(&trace.y[..5], &[-1.0, -0.5, 0.0, 0.5, -1.0]);
        assert!(trace.z.iter().all(|&h| h >= 1 && h <= 64));
    }

    #[test]
    fn streaming_sweep_with_no_rows_is_empty() {
        let sweep = Streaming {
            y_range: (1.0, -1.0),
            ..Streaming::default()
        };
        let trace = sweep_streaming(&sweep, 64, &mut quiet(), &StopSignal::new());
        assert!(trace.is_empty());
    }
}
