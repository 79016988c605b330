//! Errors raised before a run starts.  Cancellation is not an error
//! and never shows up here: a cancelled run simply returns early with
//! whatever it managed to compute.

use failure::Fail;
use std::io;

use watchdog::WatchdogState;

/// Everything that can be wrong with a run's configuration.  All of
/// these are detected eagerly, before a single point is computed, and
/// are fatal to the run.
#[derive(Debug, Fail, PartialEq)]
pub enum ConfigurationError {
    /// The grid has no points along one of its axes.
    #[fail(display = "Grid must be at least 1x1, got {}x{}", _0, _1)]
    EmptyGrid(usize, usize),

    /// The grid has more points than one run will hold.
    #[fail(display = "Grid of {}x{} is too large, at most {} points are allowed", _0, _1, _2)]
    GridTooLarge(usize, usize, usize),

    /// An axis range is inverted, empty, or not finite.
    #[fail(
        display = "The {} range must be finite with min < max, got [{}, {}]",
        axis, min, max
    )]
    BadRange {
        /// Which axis, "x" or "y".
        axis: &'static str,
        /// Lower end as given.
        min: f64,
        /// Upper end as given.
        max: f64,
    },

    /// An iteration budget of zero can't tell anything apart.
    #[fail(display = "The number of iterations must be positive")]
    ZeroIterations,

    /// The duration budget must be a non-negative number of seconds.
    #[fail(display = "The maximum duration must be a non-negative number of seconds, got {}", _0)]
    BadDuration(f64),

    /// The watchdog can't tick every zero (or negative) seconds.
    #[fail(display = "The duration check interval must be a positive number of seconds, got {}", _0)]
    BadCheckInterval(f64),

    /// Streaming sweeps must move forward by a finite, positive step,
    /// and a column can't hold more rows than a grid holds points.
    #[fail(display = "The {} increment must be finite, positive and not too fine, got {}", axis, step)]
    BadIncrement {
        /// Which axis, "x" or "y".
        axis: &'static str,
        /// The step as given.
        step: f64,
    },

    /// A monitor message every zero points, or every zero seconds.
    #[fail(display = "The monitor message period must be positive")]
    BadMonitorPeriod,

    /// Grid mode was selected but a required field is absent.
    #[fail(display = "Grid mode requires '{}' to be given", _0)]
    MissingField(&'static str),
}

/// Misuse of a [`Watchdog`](../watchdog/struct.Watchdog.html), or the
/// operating system refusing to give us a thread.
#[derive(Debug, Fail)]
pub enum WatchdogError {
    /// Each run gets a fresh watchdog; they can't be restarted.
    #[fail(display = "Watchdog can only be started from Idle, it is {:?}", _0)]
    AlreadyStarted(WatchdogState),

    /// The background thread could not be spawned.
    #[fail(display = "Could not spawn the duration checker thread: {}", _0)]
    Spawn(#[fail(cause)] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_errors_name_their_axis() {
        let err = ConfigurationError::BadRange {
            axis: "y",
            min: 1.0,
            max: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "The y range must be finite with min < max, got [1, -1]"
        );
    }

    #[test]
    fn spawn_failure_keeps_its_cause() {
        let err = WatchdogError::Spawn(io::Error::new(io::ErrorKind::Other, "no threads"));
        assert!(err.cause().is_some());
    }
}
