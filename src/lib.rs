#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot heightmap generator
//!
//! The Mandelbrot set is the set of points `c` on the complex plane
//! for which repeatedly squaring `z` and adding `c` never sends `z`
//! off to infinity.  For every point outside the set we can count how
//! many iterations it took before the orbit left the circle of radius
//! two; laid out over a grid, those counts make a heightmap that can
//! be plotted as a fancy looking 3d surface.
//!
//! This crate computes those heightmaps deliberately naively, because
//! its real purpose is to burn CPU for a bounded amount of time in a
//! load-testing service.  A run either covers a fixed grid once, or
//! keeps sweeping the plane until a background [`Watchdog`] decides
//! that the wall-clock budget is exhausted and raises the shared
//! [`StopSignal`].  The generator checks that signal at every point
//! (and inside every point), so a run never overshoots its budget by
//! more than a single point's worth of work.
//!
//! [`Watchdog`]: watchdog/struct.Watchdog.html
//! [`StopSignal`]: signal/struct.StopSignal.html

extern crate crossbeam;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate rand;
extern crate serde;
#[macro_use]
extern crate serde_json;

pub mod config;
pub mod error;
pub mod escape;
pub mod generator;
pub mod monitor;
pub mod planes;
pub mod service;
pub mod signal;
pub mod watchdog;

pub use config::{Mode, RunInput, ServiceConfig};
pub use error::{ConfigurationError, WatchdogError};
pub use generator::{Heightmap, Trace};
pub use monitor::{MonitorCadence, MonitorSink, Snapshot};
pub use planes::GridSpec;
pub use service::{App, Output};
pub use signal::StopSignal;
pub use watchdog::{Watchdog, WatchdogState};
