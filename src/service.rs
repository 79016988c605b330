//! The service: take a job, run it, hand back something the job
//! runner can serialise.
//!
//! Grid jobs return their heightmap.  Duration jobs are pure load
//! tests: they compute until the watchdog says stop, then throw the
//! results away and answer `{"data": null, "layout": null}`.

use failure::Error;
use rand::Rng;
use serde_json::Value;
use std::time::{Duration, Instant};

use config::{DurationRun, GridRun, Mode, RunInput, ServiceConfig, Sweep};
use generator::{generate_grid, sweep_repeating, sweep_streaming, Heightmap};
use monitor::{Monitor, MonitorSink};
use signal::StopSignal;
use watchdog::{resolve_budget, Watchdog, WatchdogState};

/// What a job produces.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    /// A grid job's heightmap, as `{x, y, z}`.
    Heightmap(Heightmap),
    /// A duration job's answer: nothing worth keeping.
    Discarded,
}

impl Output {
    /// The output as the job runner expects to see it.
    pub fn to_json(&self) -> Value {
        match *self {
            Output::Heightmap(ref heightmap) => json!({
                "x": heightmap.x,
                "y": heightmap.y,
                "z": heightmap.z,
            }),
            Output::Discarded => json!({ "data": null, "layout": null }),
        }
    }
}

/// How a duration run went.  Nothing here reaches the job's output;
/// it exists for logs and for callers that want to know.
#[derive(Clone, Debug, PartialEq)]
pub struct DurationReport {
    /// The budget that was enforced, after any randomising.
    pub budget: Duration,
    /// Wall-clock time the computation took.
    pub elapsed: Duration,
    /// Points computed before the stop.
    pub points: u64,
    /// Whole passes over the grid, for repeating sweeps.
    pub passes: u64,
    /// How the watchdog ended up.
    pub watchdog: WatchdogState,
}

/// A service instance.  Holds the service-wide settings; each call to
/// `run` is an independent job with its own stop signal and watchdog.
#[derive(Clone, Debug, Default)]
pub struct App {
    config: ServiceConfig,
}

impl App {
    /// A service with the given settings.
    pub fn new(config: ServiceConfig) -> Self {
        App { config }
    }

    /// Run one job to the end, sending progress to `sink`.  Only a
    /// bad configuration is an error; a run cut short by the clock is
    /// a normal, successful run.
    pub fn run<S: MonitorSink>(&self, input: &RunInput, sink: S) -> Result<Output, Error> {
        match input.test_id {
            Some(id) => info!("Starting analysis for load test {}.", id),
            None => info!("Starting analysis."),
        }
        let mode = input.mode()?;
        let output = match mode {
            Mode::Grid(ref run) => Output::Heightmap(self.run_grid(run, sink)),
            Mode::Duration(ref run) => {
                self.run_duration(run, sink, &mut rand::thread_rng())?;
                Output::Discarded
            }
        };
        match input.test_id {
            Some(id) => info!("Finished analysis for load test {}.", id),
            None => info!("Finished analysis."),
        }
        Ok(output)
    }

    /// Compute a fixed grid once.
    pub fn run_grid<S: MonitorSink>(&self, run: &GridRun, sink: S) -> Heightmap {
        info!("Running for specified grid size.");
        let mut monitor = Monitor::new(run.cadence, sink);
        let heightmap = generate_grid(&run.grid, run.iterations, &mut monitor, &StopSignal::new());
        debug!(
            "Computed {} points, sent {} monitor messages.",
            heightmap.completed(),
            monitor.sent()
        );
        heightmap
    }

    /// Compute until the budget runs out.  The watchdog is stopped on
    /// the way out whatever happens, including a panic in the
    /// generator, because dropping it stops it.
    pub fn run_duration<S: MonitorSink, R: Rng + ?Sized>(
        &self,
        run: &DurationRun,
        sink: S,
        rng: &mut R,
    ) -> Result<DurationReport, Error> {
        info!("Running for specified duration.");
        let check_interval = self.config.check_interval()?;
        let budget = resolve_budget(run.max_duration, run.randomise, rng);

        let stop = StopSignal::new();
        let mut watchdog = Watchdog::new(budget, check_interval, stop.clone());
        let mut monitor = Monitor::new(run.cadence, sink);

        let started = Instant::now();
        watchdog.start()?;
        let (points, passes) = match run.sweep {
            Sweep::Repeating(ref grid) => {
                let repeated = sweep_repeating(grid, run.iterations, &mut monitor, &stop);
                (repeated.points, repeated.passes)
            }
            Sweep::Streaming(ref streaming) => {
                let trace = sweep_streaming(streaming, run.iterations, &mut monitor, &stop);
                (trace.len() as u64, 0)
            }
        };
        let elapsed = started.elapsed();
        let watchdog = watchdog.stop();

        info!(
            "Computed {} points in {:?} against a budget of {:?}.",
            points, elapsed, budget
        );
        Ok(DurationReport {
            budget,
            elapsed,
            points,
            passes,
            watchdog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::MonitorSetting;
    use monitor::{NullSink, Snapshot};

    fn fast() -> App {
        App::new(ServiceConfig {
            duration_check_interval: 0.01,
        })
    }

    #[test]
    fn grid_jobs_return_their_heightmap() {
        let output = fast().run(&RunInput::grid(8, 5), NullSink).unwrap();
        let json = output.to_json();
        assert_eq!(json["x"].as_array().unwrap().len(), 8);
        assert_eq!(json["y"].as_array().unwrap().len(), 5);
        assert_eq!(json["z"].as_array().unwrap().len(), 5);
        assert_eq!(json["z"][0].as_array().unwrap().len(), 8);
    }

    #[test]
    fn duration_jobs_discard_their_results() {
        let output = fast().run(&RunInput::duration(0.0), NullSink).unwrap();
        assert_eq!(output, Output::Discarded);
        assert_eq!(output.to_json().to_string(), r#"{"data":null,"layout":null}"#);
    }

    #[test]
    fn bad_jobs_fail_before_running() {
        let mut sent: Vec<Snapshot> = Vec::new();
        let err = fast().run(&RunInput::grid(0, 3), &mut sent).unwrap_err();
        assert_eq!(err.to_string(), "Grid must be at least 1x1, got 0x3");
        assert!(sent.is_empty());
    }

    #[test]
    fn oversized_grids_are_refused_not_allocated() {
        let err = fast().run(&RunInput::grid(1 << 62, 2), NullSink).unwrap_err();
        assert!(err.to_string().contains("is too large"), "{}", err);
    }

    #[test]
    fn a_bad_check_interval_fails_duration_jobs() {
        let app = App::new(ServiceConfig {
            duration_check_interval: -1.0,
        });
        assert!(app.run(&RunInput::duration(1.0), NullSink).is_err());
    }

    #[test]
    fn grid_jobs_send_progress() {
        let mut sent: Vec<Snapshot> = Vec::new();
        let input = RunInput {
            monitor: Some(MonitorSetting::EveryPoints(10)),
            ..RunInput::grid(10, 10)
        };
        fast().run(&input, &mut sent).unwrap();
        assert_eq!(sent.len(), 10);
    }
}
