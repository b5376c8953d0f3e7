use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::Parser;
use control::{DataPoint, SessionConfig, SimulationDriver};
use log::LevelFilter;
use simcore::{SystemClock, WallClock};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use thiserror::Error;

/// Host refresh period in realtime mode
const FRAME: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
enum AppError {
    #[error("could not access {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] simcore::ConfigError),
}

/// Cell-level EV battery pack charging simulator
#[derive(Debug, Parser)]
#[command(name = "charge-sim")]
#[command(about = "Simulates charging an EV battery pack and records the charge curve")]
struct Args {
    /// Session config (JSON); defaults are used when omitted
    config: Option<PathBuf>,

    /// Pace the simulation against the wall clock
    #[arg(long)]
    realtime: bool,

    /// Where to write the recorded samples
    #[arg(short = 'o', long = "out", default_value = "samples.csv")]
    out: PathBuf,

    /// Give up after this many simulated hours
    #[arg(long = "max-hours", default_value_t = 12.0)]
    max_hours: f64,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig, AppError> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn write_csv(path: &Path, points: &[DataPoint]) -> Result<(), AppError> {
    let io_err = |source| AppError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut csv = BufWriter::new(File::create(path).map_err(io_err)?);
    writeln!(csv, "time_s,soc_percent,power_kw,current_a,voltage_v,temperature_c").map_err(io_err)?;
    for p in points {
        writeln!(
            csv,
            "{:.0},{:.3},{:.3},{:.3},{:.3},{:.3}",
            p.time_s, p.soc_percent, p.power_kw, p.current_a, p.voltage_v, p.temperature_c
        )
        .map_err(io_err)?;
    }
    csv.flush().map_err(io_err)
}

fn run_realtime(driver: &mut SimulationDriver, max_sim_seconds: f64) {
    let clock = SystemClock::new();
    let mut last_report = clock.now_seconds();

    while driver.is_running() && driver.elapsed_sim_seconds() < max_sim_seconds {
        driver.poll_clock(&clock);

        let now = clock.now_seconds();
        if now - last_report >= 1.0 {
            last_report = now;
            let snap = driver.snapshot();
            log::info!(
                "{:>6.0} s  soc {:5.1}%  {:6.1} A  {:6.1} kW  {:5.1} °C  limit: {}",
                snap.elapsed_sim_seconds,
                snap.pack.average_soc_percent,
                snap.current_a,
                snap.power_kw,
                snap.pack.average_temperature_c,
                snap.pack
                    .limiting_factor
                    .map(|f| f.label())
                    .unwrap_or("-"),
            );
        }
        thread::sleep(FRAME);
    }
}

fn run_headless(driver: &mut SimulationDriver, max_sim_seconds: f64) {
    while driver.is_running() && driver.elapsed_sim_seconds() < max_sim_seconds {
        driver.advance(1.0);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    // a second init only fails if a logger already exists
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);

    let config = load_config(args.config.as_deref())?;
    let mut driver = SimulationDriver::new(config)?;
    log::info!(
        "pack: {} x {} cells, {:.1} kWh, {:.0} V nominal",
        driver.pack().cells_in_series(),
        driver.pack().cells_in_parallel(),
        driver.pack().energy_capacity_kwh(),
        driver.pack().total_voltage()
    );

    let max_sim_seconds = args.max_hours.max(0.0) * simcore::SECONDS_PER_HOUR;
    driver.start();
    if args.realtime {
        run_realtime(&mut driver, max_sim_seconds);
    } else {
        run_headless(&mut driver, max_sim_seconds);
    }
    driver.stop();

    write_csv(&args.out, driver.data_points())?;
    log::info!("wrote {} samples to {}", driver.data_points().len(), args.out.display());

    match serde_json::to_string_pretty(&driver.snapshot()) {
        Ok(summary) => println!("{summary}"),
        Err(err) => log::warn!("could not serialize summary: {err}"),
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
