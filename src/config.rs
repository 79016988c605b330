//! Run configuration.
//!
//! A job arrives as a loosely shaped bag of values (usually JSON).
//! `RunInput` is that bag, typed; `RunInput::mode` turns it into a
//! `Mode`, checking everything up front so that a bad configuration
//! fails before any work is done.  The presence of `max_duration`
//! selects duration mode; otherwise the job describes a fixed grid.

use serde::Deserialize;
use std::time::Duration;

use error::ConfigurationError;
use generator::Streaming;
use monitor::{MonitorCadence, DEFAULT_DURATION_MONITOR_PERIOD, DEFAULT_GRID_MONITOR_POINTS};
use planes::{GridSpec, MAX_GRID_POINTS};

/// Iterations per point unless told otherwise.
pub const DEFAULT_ITERATIONS: u32 = 64;

/// How often the watchdog looks at the clock unless told otherwise,
/// in seconds.
pub const DEFAULT_DURATION_CHECK_INTERVAL: f64 = 1.0;

/// Real extent of a grid when none is given.
pub const DEFAULT_X_RANGE: (f64, f64) = (-2.0, 2.0);

/// Imaginary extent of a grid when none is given.
pub const DEFAULT_Y_RANGE: (f64, f64) = (-1.26, 1.26);

/// Columns and rows of the grid a repeating duration run recomputes.
pub const REPEATING_GRID_SIZE: usize = 100;

/// How a duration run walks the plane.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Recompute one small grid over and over.
    Repeating,
    /// Keep marching out along the real axis, keeping every point.
    Streaming,
}

impl Default for SweepKind {
    fn default() -> Self {
        SweepKind::Repeating
    }
}

/// Monitor cadence as it appears in a job, e.g. `{"every_points": 50}`
/// or `{"every_seconds": 2.5}`.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MonitorSetting {
    /// One message every this many points.
    EveryPoints(u64),
    /// One message every this many seconds.
    EverySeconds(f64),
    /// No messages.
    Off,
}

impl MonitorSetting {
    fn cadence(self) -> Result<MonitorCadence, ConfigurationError> {
        match self {
            MonitorSetting::EveryPoints(0) => Err(ConfigurationError::BadMonitorPeriod),
            MonitorSetting::EveryPoints(n) => Ok(MonitorCadence::Points(n)),
            MonitorSetting::EverySeconds(s) if s.is_finite() && s > 0.0 => {
                Ok(MonitorCadence::Period(seconds(s)))
            }
            MonitorSetting::EverySeconds(_) => Err(ConfigurationError::BadMonitorPeriod),
            MonitorSetting::Off => Ok(MonitorCadence::Off),
        }
    }
}

/// The values a job supplies.  Anything not listed here (colour
/// scales, plot types and so on) is ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunInput {
    /// Grid columns.
    pub width: Option<usize>,
    /// Grid rows.
    pub height: Option<usize>,
    /// Real extent of the grid, `[min, max]`.
    pub x_range: Option<(f64, f64)>,
    /// Imaginary extent of the grid, `[min, max]`.
    pub y_range: Option<(f64, f64)>,
    /// Iteration budget per point.
    #[serde(alias = "number_of_iterations")]
    pub n_iterations: Option<u32>,
    /// Wall-clock budget in seconds.  Its presence selects duration
    /// mode.
    pub max_duration: Option<f64>,
    /// Draw the budget at random from `[0, max_duration]`.
    pub randomise_duration: bool,
    /// How a duration run walks the plane.
    pub sweep: SweepKind,
    /// Distance between streaming columns.
    pub x_increment: Option<f64>,
    /// Distance between streaming rows.
    pub y_increment: Option<f64>,
    /// Override the default monitor cadence.
    pub monitor: Option<MonitorSetting>,
    /// Load-test identifier, only used in log messages.
    pub test_id: Option<u64>,
}

/// Settings that belong to the service rather than to any one job.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Seconds between watchdog checks.
    pub duration_check_interval: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            duration_check_interval: DEFAULT_DURATION_CHECK_INTERVAL,
        }
    }
}

impl ServiceConfig {
    /// The watchdog tick, validated.
    pub fn check_interval(&self) -> Result<Duration, ConfigurationError> {
        let s = self.duration_check_interval;
        if !(s.is_finite() && s > 0.0) {
            return Err(ConfigurationError::BadCheckInterval(s));
        }
        Ok(seconds(s))
    }
}

/// A fixed grid, computed once.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridRun {
    /// The points to compute.
    pub grid: GridSpec,
    /// Iteration budget per point.
    pub iterations: u32,
    /// Monitor cadence.
    pub cadence: MonitorCadence,
}

/// The walk a duration run makes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Sweep {
    /// Recompute this grid until stopped.
    Repeating(GridSpec),
    /// March out along the real axis until stopped.
    Streaming(Streaming),
}

/// A computation bounded by the clock instead of by a grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DurationRun {
    /// Seconds, or the upper end of the random draw.
    pub max_duration: f64,
    /// Draw the real budget at random from `[0, max_duration]`.
    pub randomise: bool,
    /// How to walk the plane.
    pub sweep: Sweep,
    /// Iteration budget per point.
    pub iterations: u32,
    /// Monitor cadence.
    pub cadence: MonitorCadence,
}

/// What a job asks for, decided once when the job arrives.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Mode {
    /// Compute a fixed grid once.
    Grid(GridRun),
    /// Keep computing until the budget runs out.
    Duration(DurationRun),
}

fn seconds(s: f64) -> Duration {
    Duration::from_nanos((s * 1e9).round() as u64)
}

// A streaming step must be positive.  Rows are allocated up front, so
// the step is also no finer than `span` split into as many pieces as a
// grid may hold points.
fn increment(
    axis: &'static str,
    given: Option<f64>,
    default: f64,
    span: f64,
) -> Result<f64, ConfigurationError> {
    let step = given.unwrap_or(default);
    if !(step.is_finite() && step > 0.0) || span / step > MAX_GRID_POINTS as f64 {
        return Err(ConfigurationError::BadIncrement { axis, step });
    }
    Ok(step)
}

impl RunInput {
    /// A fixed-grid job.
    pub fn grid(width: usize, height: usize) -> Self {
        RunInput {
            width: Some(width),
            height: Some(height),
            ..RunInput::default()
        }
    }

    /// A duration-bounded job.
    pub fn duration(max_duration: f64) -> Self {
        RunInput {
            max_duration: Some(max_duration),
            ..RunInput::default()
        }
    }

    fn streaming(&self) -> Result<Streaming, ConfigurationError> {
        let defaults = Streaming::default();
        let (bottom, top) = defaults.y_range;
        let x_increment = increment("x", self.x_increment, defaults.x_increment, 0.0)?;
        let y_increment = increment("y", self.y_increment, defaults.y_increment, top - bottom)?;
        Ok(Streaming {
            x_increment,
            y_increment,
            ..defaults
        })
    }

    /// Decide the mode and validate everything it needs.
    pub fn mode(&self) -> Result<Mode, ConfigurationError> {
        let iterations = self.n_iterations.unwrap_or(DEFAULT_ITERATIONS);
        if iterations == 0 {
            return Err(ConfigurationError::ZeroIterations);
        }

        match self.max_duration {
            Some(max_duration) => {
                if !(max_duration.is_finite() && max_duration >= 0.0) {
                    return Err(ConfigurationError::BadDuration(max_duration));
                }
                let cadence = match self.monitor {
                    Some(setting) => setting.cadence()?,
                    None => MonitorCadence::Period(DEFAULT_DURATION_MONITOR_PERIOD),
                };
                let sweep = match self.sweep {
                    SweepKind::Repeating => Sweep::Repeating(GridSpec::new(
                        REPEATING_GRID_SIZE,
                        REPEATING_GRID_SIZE,
                        self.x_range.unwrap_or(DEFAULT_X_RANGE),
                        self.y_range.unwrap_or(DEFAULT_Y_RANGE),
                    )?),
                    SweepKind::Streaming => Sweep::Streaming(self.streaming()?),
                };
                Ok(Mode::Duration(DurationRun {
                    max_duration,
                    randomise: self.randomise_duration,
                    sweep,
                    iterations,
                    cadence,
                }))
            }
            None => {
                let width = self.width.ok_or(ConfigurationError::MissingField("width"))?;
                let height = self.height.ok_or(ConfigurationError::MissingField("height"))?;
                let grid = GridSpec::new(
                    width,
                    height,
                    self.x_range.unwrap_or(DEFAULT_X_RANGE),
                    self.y_range.unwrap_or(DEFAULT_Y_RANGE),
                )?;
                let cadence = match self.monitor {
                    Some(setting) => setting.cadence()?,
                    None => MonitorCadence::Points(DEFAULT_GRID_MONITOR_POINTS),
                };
                Ok(Mode::Grid(GridRun {
                    grid,
                    iterations,
                    cadence,
                }))
            }
        }
    }
}
