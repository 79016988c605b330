//! Progress reporting.  While a heightmap is being computed, the
//! generator hands a snapshot of the latest point to a `MonitorSink`
//! every so often.  This is a side channel for whoever is watching:
//! a sink that fails only costs a log line, and nothing a sink does
//! can change the heightmap.

use crossbeam::channel::{Sender, TrySendError};
use failure::Error;
use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};

/// Grid runs report every this many points by default.
pub const DEFAULT_GRID_MONITOR_POINTS: u64 = 100;

/// Duration runs report on a clock instead, this often by default.
pub const DEFAULT_DURATION_MONITOR_PERIOD: Duration = Duration::from_secs(10);

/// The most recently completed point: where it is, and its height.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    /// Real coordinate of the point.
    pub x: f64,
    /// Imaginary coordinate of the point.
    pub y: f64,
    /// Escape time of the point.
    pub z: u32,
}

/// How often snapshots go out.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MonitorCadence {
    /// Every Kth completed point, starting with the first.
    Points(u64),
    /// Whenever this much wall-clock time has passed since the last
    /// message (or since the start of the run).
    Period(Duration),
    /// Never.
    Off,
}

/// Somewhere to send snapshots.  Delivery is fire-and-forget.
pub trait MonitorSink {
    /// Deliver one snapshot.  An error here is logged and dropped.
    fn send(&mut self, snapshot: &Snapshot) -> Result<(), Error>;
}

impl<'a, S: MonitorSink + ?Sized> MonitorSink for &'a mut S {
    fn send(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        (**self).send(snapshot)
    }
}

/// Collects every snapshot in memory.
impl MonitorSink for Vec<Snapshot> {
    fn send(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        self.push(*snapshot);
        Ok(())
    }
}

/// Hands snapshots to another thread without ever waiting for it.  A
/// full or abandoned channel loses the message.
impl MonitorSink for Sender<Snapshot> {
    fn send(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        match self.try_send(*snapshot) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(format_err!("monitor channel is full")),
            Err(TrySendError::Disconnected(_)) => Err(format_err!("monitor channel is closed")),
        }
    }
}

/// Throws everything away.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl MonitorSink for NullSink {
    fn send(&mut self, _snapshot: &Snapshot) -> Result<(), Error> {
        Ok(())
    }
}

/// Writes each snapshot as one line of JSON.
#[derive(Debug)]
pub struct JsonLines<W: Write>(pub W);

impl<W: Write> MonitorSink for JsonLines<W> {
    fn send(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        serde_json::to_writer(&mut self.0, snapshot)?;
        self.0.write_all(b"\n")?;
        self.0.flush()?;
        Ok(())
    }
}

/// Decides which points are worth reporting and forwards them to the
/// sink, swallowing any failure along the way.
pub struct Monitor<S: MonitorSink> {
    cadence: MonitorCadence,
    sink: S,
    seen: u64,
    next_due: Instant,
    sent: u64,
    dropped: u64,
}

impl<S: MonitorSink> Monitor<S> {
    /// A monitor whose clock (for `Period` cadences) starts now.
    pub fn new(cadence: MonitorCadence, sink: S) -> Self {
        let cadence = match cadence {
            MonitorCadence::Points(0) => MonitorCadence::Points(1),
            c => c,
        };
        let first = match cadence {
            MonitorCadence::Period(period) => Instant::now() + period,
            _ => Instant::now(),
        };
        Monitor {
            cadence,
            sink,
            seen: 0,
            next_due: first,
            sent: 0,
            dropped: 0,
        }
    }

    /// Look at a completed point, and maybe pass it on.
    pub fn observe(&mut self, snapshot: Snapshot) {
        let due = match self.cadence {
            MonitorCadence::Points(every) => self.seen % every == 0,
            MonitorCadence::Period(period) => {
                let now = Instant::now();
                if now >= self.next_due {
                    self.next_due = now + period;
                    true
                } else {
                    false
                }
            }
            MonitorCadence::Off => false,
        };
        self.seen += 1;
        if !due {
            return;
        }
        match self.sink.send(&snapshot) {
            Ok(()) => self.sent += 1,
            Err(e) => {
                self.dropped += 1;
                warn!("Dropped monitor message: {}", e);
            }
        }
    }

    /// Snapshots the sink accepted.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Snapshots the sink refused.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Give the sink back.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
