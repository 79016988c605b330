extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate heightmap;
extern crate serde_json;

use clap::{App, Arg, ArgMatches};
use failure::Error;
use heightmap::config::SweepKind;
use heightmap::monitor::{JsonLines, NullSink};
use heightmap::{RunInput, ServiceConfig};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::str::FromStr;

// "4x3" or "-1.5,0.6": two values of the same type around a separator.
fn split_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    let mut halves = s.splitn(2, separator);
    let first = halves.next()?.parse().ok()?;
    let second = halves.next()?.parse().ok()?;
    Some((first, second))
}

fn pair_of<T: FromStr>(separator: char, err: &'static str) -> impl Fn(String) -> Result<(), String> {
    move |s| {
        split_pair::<T>(&s, separator)
            .map(|_| ())
            .ok_or_else(|| err.to_string())
    }
}

fn number<T: FromStr>(err: &'static str) -> impl Fn(String) -> Result<(), String> {
    move |s| s.parse::<T>().map(|_| ()).map_err(|_| err.to_string())
}

const INPUT: &str = "input";
const OUTPUT: &str = "output";
const SIZE: &str = "size";
const XRANGE: &str = "xrange";
const YRANGE: &str = "yrange";
const ITERATIONS: &str = "iterations";
const MAX_DURATION: &str = "max-duration";
const RANDOMISE: &str = "randomise";
const SWEEP: &str = "sweep";
const CHECK_INTERVAL: &str = "check-interval";
const MONITOR: &str = "monitor";

const JOB_FLAGS: &[&str] = &[SIZE, XRANGE, YRANGE, ITERATIONS, MAX_DURATION, RANDOMISE, SWEEP];

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .about("Mandelbrot heightmaps, bounded by a grid or by the clock")
        .arg(
            Arg::with_name(INPUT)
                .long(INPUT)
                .short("I")
                .takes_value(true)
                .conflicts_with_all(JOB_FLAGS)
                .help("Read the job from a JSON file instead of from flags"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Write the output here instead of to stdout"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .validator(pair_of::<usize>('x', "Could not parse grid size"))
                .help("Grid size, as WIDTHxHEIGHT"),
        )
        .arg(
            Arg::with_name(XRANGE)
                .long(XRANGE)
                .short("x")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(pair_of::<f64>(',', "Could not parse x range"))
                .help("Real extent of the grid, as MIN,MAX"),
        )
        .arg(
            Arg::with_name(YRANGE)
                .long(YRANGE)
                .short("y")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(pair_of::<f64>(',', "Could not parse y range"))
                .help("Imaginary extent of the grid, as MIN,MAX"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .validator(number::<u32>("Could not parse iteration count"))
                .help("Iterations per point (default 64)"),
        )
        .arg(
            Arg::with_name(MAX_DURATION)
                .long(MAX_DURATION)
                .short("d")
                .takes_value(true)
                .validator(number::<f64>("Could not parse maximum duration"))
                .help("Compute for this many seconds instead of over a grid"),
        )
        .arg(
            Arg::with_name(RANDOMISE)
                .long(RANDOMISE)
                .short("r")
                .requires(MAX_DURATION)
                .help("Pick the duration at random between zero and the maximum"),
        )
        .arg(
            Arg::with_name(SWEEP)
                .long(SWEEP)
                .takes_value(true)
                .possible_values(&["repeating", "streaming"])
                .requires(MAX_DURATION)
                .help("How a duration run walks the plane"),
        )
        .arg(
            Arg::with_name(CHECK_INTERVAL)
                .long(CHECK_INTERVAL)
                .short("c")
                .takes_value(true)
                .default_value("1.0")
                .validator(number::<f64>("Could not parse check interval"))
                .help("Seconds between checks of the clock"),
        )
        .arg(
            Arg::with_name(MONITOR)
                .long(MONITOR)
                .short("m")
                .help("Write progress snapshots to stderr as JSON lines (logging drops to warnings)"),
        )
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, Error> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(s) => T::from_str(s)
            .map(Some)
            .map_err(|_| format_err!("Could not parse --{} '{}'", name, s)),
    }
}

fn pair<T: FromStr>(matches: &ArgMatches, name: &str, separator: char) -> Result<Option<(T, T)>, Error> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(s) => split_pair(s, separator)
            .map(Some)
            .ok_or_else(|| format_err!("Could not parse --{} '{}'", name, s)),
    }
}

fn job(matches: &ArgMatches) -> Result<RunInput, Error> {
    if let Some(path) = matches.value_of(INPUT) {
        let file = File::open(path)?;
        return Ok(serde_json::from_reader(BufReader::new(file))?);
    }
    let size: Option<(usize, usize)> = pair(matches, SIZE, 'x')?;
    Ok(RunInput {
        width: size.map(|s| s.0),
        height: size.map(|s| s.1),
        x_range: pair(matches, XRANGE, ',')?,
        y_range: pair(matches, YRANGE, ',')?,
        n_iterations: value(matches, ITERATIONS)?,
        max_duration: value(matches, MAX_DURATION)?,
        randomise_duration: matches.is_present(RANDOMISE),
        sweep: match matches.value_of(SWEEP) {
            Some("streaming") => SweepKind::Streaming,
            _ => SweepKind::Repeating,
        },
        ..RunInput::default()
    })
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let input = job(matches)?;
    let config = ServiceConfig {
        duration_check_interval: value(matches, CHECK_INTERVAL)?
            .unwrap_or(heightmap::config::DEFAULT_DURATION_CHECK_INTERVAL),
    };
    let app = heightmap::App::new(config);

    let output = if matches.is_present(MONITOR) {
        app.run(&input, JsonLines(io::stderr()))?
    } else {
        app.run(&input, NullSink)?
    };

    match matches.value_of(OUTPUT) {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            serde_json::to_writer(&mut out, &output.to_json())?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer(&mut out, &output.to_json())?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn main() {
    let matches = args();
    // Monitor snapshots share stderr with the log, so keep it quiet
    // unless RUST_LOG says otherwise.
    let level = if matches.is_present(MONITOR) { "warn" } else { "info" };
    env_logger::from_env(env_logger::Env::default().default_filter_or(level)).init();
    if let Err(e) = run(&matches) {
        eprintln!("Run failure: {}", e);
        std::process::exit(1);
    }
}
