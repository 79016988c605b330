//! The duration watchdog keeps an eye on the clock while the
//! generator works.  It runs on its own thread, wakes up every
//! `check_interval`, and once more than `budget` has passed since it
//! was started it raises the `StopSignal` and goes away.  It never
//! touches the generator any other way, and the generator never waits
//! on it.
//!
//! A tick can only be as punctual as the interval, so a run may
//! overshoot its budget by up to one interval.  That's accepted.

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use error::WatchdogError;
use signal::StopSignal;

/// Where a watchdog is in its life.  `Expired` and `Cancelled` are
/// both final.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WatchdogState {
    /// Built, not started.
    Idle,
    /// The background thread is checking the clock.
    Running,
    /// The budget ran out and the stop signal was raised.
    Expired,
    /// Stopped before the budget ran out; the signal was left alone.
    Cancelled,
}

/// A background timer that raises a `StopSignal` when a wall-clock
/// budget is used up.  Dropping a running watchdog stops it, so it
/// can't outlive the computation it is guarding.
#[derive(Debug)]
pub struct Watchdog {
    budget: Duration,
    check_interval: Duration,
    signal: StopSignal,
    state: WatchdogState,
    expired: Arc<AtomicBool>,
    halt: Option<Sender<()>>,
    thread: Option<JoinHandle<WatchdogState>>,
}

impl Watchdog {
    /// An idle watchdog that, once started, will raise `signal` after
    /// `budget`, checking every `check_interval`.
    pub fn new(budget: Duration, check_interval: Duration, signal: StopSignal) -> Self {
        Watchdog {
            budget,
            check_interval,
            signal,
            state: WatchdogState::Idle,
            expired: Arc::new(AtomicBool::new(false)),
            halt: None,
            thread: None,
        }
    }

    /// The budget being enforced.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Where the watchdog is now.  One that ran out of budget reports
    /// `Expired` as soon as it has raised the signal, stopped or not.
    pub fn state(&self) -> WatchdogState {
        if self.state == WatchdogState::Running && self.expired.load(Ordering::Acquire) {
            return WatchdogState::Expired;
        }
        self.state
    }

    /// Start the clock and return at once.  The checks happen on a
    /// thread of their own.
    pub fn start(&mut self) -> Result<(), WatchdogError> {
        if self.state != WatchdogState::Idle {
            return Err(WatchdogError::AlreadyStarted(self.state));
        }

        let (halt, halted) = bounded::<()>(1);
        let budget = self.budget;
        let interval = self.check_interval;
        let signal = self.signal.clone();
        let expired = self.expired.clone();
        let started = Instant::now();

        let thread = thread::Builder::new()
            .name("duration-checker".to_string())
            .spawn(move || loop {
                match halted.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if started.elapsed() > budget {
                            expired.store(true, Ordering::Release);
                            signal.set();
                            warn!(
                                "The maximum duration ({:?}) has been reached - sent the stop signal.",
                                budget
                            );
                            info!("Duration checker thread stopped.");
                            return WatchdogState::Expired;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        return WatchdogState::Cancelled;
                    }
                }
            })
            .map_err(WatchdogError::Spawn)?;

        debug!(
            "Duration checker started: budget {:?}, checking every {:?}.",
            budget, interval
        );
        self.halt = Some(halt);
        self.thread = Some(thread);
        self.state = WatchdogState::Running;
        Ok(())
    }

    /// Stop checking the clock, without raising the signal if it
    /// hasn't been raised already.  Waits for the background thread to
    /// finish whatever tick it is in.  Calling this more than once, or
    /// on a watchdog that never started, is harmless.
    pub fn stop(&mut self) -> WatchdogState {
        if let Some(halt) = self.halt.take() {
            // The thread may already be gone if it expired.
            let _ = halt.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            self.state = match thread.join() {
                Ok(state) => state,
                Err(_) => {
                    error!("Duration checker thread panicked.");
                    WatchdogState::Cancelled
                }
            };
        }
        self.state
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The budget a run should actually enforce.  With `randomise`, that
/// is a whole number of seconds drawn once, uniformly, from
/// `0..=max_seconds`; otherwise it is `max_seconds` itself.
pub fn resolve_budget<R: Rng + ?Sized>(max_seconds: f64, randomise: bool, rng: &mut R) -> Duration {
    let max_seconds = if max_seconds.is_finite() && max_seconds > 0.0 {
        max_seconds
    } else {
        0.0
    };
    if !randomise {
        return Duration::from_millis((max_seconds * 1000.0).round() as u64);
    }
    let seconds = Uniform::new_inclusive(0, max_seconds.floor() as u64).sample(rng);
    info!("Maximum duration randomised to {}s.", seconds);
    Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn starts_idle_and_leaves_the_signal_alone() {
        let signal = StopSignal::new();
        let watchdog = Watchdog::new(ms(0), ms(10), signal.clone());
        assert_eq!(watchdog.state(), WatchdogState::Idle);
        thread::sleep(ms(30));
        assert!(!signal.is_set());
    }

    #[test]
    fn raises_the_signal_once_the_budget_is_spent() {
        let signal = StopSignal::new();
        let mut watchdog = Watchdog::new(ms(20), ms(5), signal.clone());
        let started = Instant::now();
        watchdog.start().unwrap();
        while !signal.is_set() {
            assert!(started.elapsed() < Duration::from_secs(5), "watchdog never fired");
            thread::sleep(ms(1));
        }
        assert!(started.elapsed() >= ms(20));
        assert_eq!(watchdog.stop(), WatchdogState::Expired);
    }

    #[test]
    fn reports_expiry_before_being_stopped() {
        let signal = StopSignal::new();
        let mut watchdog = Watchdog::new(ms(0), ms(5), signal.clone());
        watchdog.start().unwrap();
        let started = Instant::now();
        while !signal.is_set() {
            assert!(started.elapsed() < Duration::from_secs(5), "watchdog never fired");
            thread::sleep(ms(1));
        }
        assert_eq!(watchdog.state(), WatchdogState::Expired);
        assert_eq!(watchdog.stop(), WatchdogState::Expired);
        assert_eq!(watchdog.state(), WatchdogState::Expired);
    }

    #[test]
    fn stopping_early_cancels_without_raising() {
        let signal = StopSignal::new();
        let mut watchdog = Watchdog::new(Duration::from_secs(60), ms(5), signal.clone());
        watchdog.start().unwrap();
        assert_eq!(watchdog.state(), WatchdogState::Running);
        thread::sleep(ms(20));
        assert_eq!(watchdog.stop(), WatchdogState::Cancelled);
        assert!(!signal.is_set());
    }

    #[test]
    fn stop_returns_promptly_with_a_long_interval() {
        let mut watchdog = Watchdog::new(
            Duration::from_secs(60),
            Duration::from_secs(60),
            StopSignal::new(),
        );
        watchdog.start().unwrap();
        let stopping = Instant::now();
        watchdog.stop();
        assert!(stopping.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut watchdog = Watchdog::new(ms(0), ms(1), StopSignal::new());
        assert_eq!(watchdog.stop(), WatchdogState::Idle);
        watchdog.start().unwrap();
        let first = watchdog.stop();
        assert_eq!(watchdog.stop(), first);
    }

    #[test]
    fn cannot_be_restarted() {
        let mut watchdog = Watchdog::new(ms(0), ms(1), StopSignal::new());
        watchdog.start().unwrap();
        watchdog.stop();
        match watchdog.start() {
            Err(WatchdogError::AlreadyStarted(_)) => {}
            other => panic!("expected AlreadyStarted, got {:?}", other),
        }
    }

    #[test]
    fn dropping_a_running_watchdog_stops_it() {
        let signal = StopSignal::new();
        {
            let mut watchdog = Watchdog::new(ms(30), ms(5), signal.clone());
            watchdog.start().unwrap();
        }
        thread::sleep(ms(60));
        assert!(!signal.is_set());
    }

    #[test]
    fn fixed_budget_is_taken_as_given() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(resolve_budget(2.5, false, &mut rng), ms(2500));
        assert_eq!(resolve_budget(0.0, false, &mut rng), ms(0));
    }

    #[test]
    fn randomised_budget_stays_within_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; 6];
        for _ in 0..100 {
            let budget = resolve_budget(5.0, true, &mut rng);
            assert!(budget <= Duration::from_secs(5));
            assert_eq!(budget.subsec_nanos(), 0);
            seen[budget.as_secs() as usize] = true;
        }
        assert!(seen.iter().filter(|&&s| s).count() > 1);
    }

    #[test]
    fn randomising_zero_gives_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(resolve_budget(0.0, true, &mut rng), ms(0));
    }
}
