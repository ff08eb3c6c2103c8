// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! tofnode - Presence-Detection Node
//!
//! Runs the node loop against real hardware or the simulator, writing one
//! record per report period to the serial link (or stdout). With `--listen`
//! it is the other end of the link instead, journaling received records.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tofnode::config::{MUX_ADDRESS, SENSOR_CHANNELS, SENSOR_COUNT};
use tofnode::sensors::{simulated_pair, BusWrite, LogIndicator, RangingSensor};
use tofnode::streaming::{journal_lines, ExportFormat, RecordJournal};
use tofnode::{BusSelector, Config, MonotonicClock, RangingMode, Scheduler, Transport, WriterTransport, VERSION};

/// tofnode - Presence-Detection Node
#[derive(Parser, Debug)]
#[command(name = "tofnode")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Time-of-flight presence detection with periodic dwell-time reports")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated sensors
    #[arg(long)]
    demo: bool,

    /// Simulator seed
    #[arg(long)]
    seed: Option<u64>,

    /// I2C bus device
    #[arg(long)]
    i2c_bus: Option<PathBuf>,

    /// Serial port for records
    #[arg(long)]
    serial_port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Average this many readings per poll
    #[arg(long)]
    averaged: Option<usize>,

    /// Milliseconds between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Receive records and journal them instead of running the node
    #[arg(long)]
    listen: bool,

    /// Journal format for --listen
    #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
    format: String,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    // Records may go to stdout, so the log goes to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("tofnode v{} - Presence-Detection Node", VERSION);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if args.seed.is_some() {
        config.demo_seed = args.seed;
    }
    if let Some(device) = args.i2c_bus {
        config.bus.device = device;
    }
    if let Some(port) = args.serial_port {
        config.serial.port = Some(port);
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(samples) = args.averaged {
        config.ranging = RangingMode::Averaged { samples };
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);

    if args.listen {
        let format = match args.format.as_str() {
            "csv" => ExportFormat::Csv,
            _ => ExportFormat::Json,
        };
        return run_listener(&config, format);
    }

    info!("Demo mode: {}", config.demo_mode);
    info!("Sensors: {} on channels {:?}", SENSOR_COUNT, SENSOR_CHANNELS);

    if config.demo_mode {
        let (mux, ranger) = simulated_pair(&SENSOR_CHANNELS, config.demo_seed);
        run_node(&config, mux, ranger, args.ticks)
    } else {
        run_hardware(&config, args.ticks)
    }
}

#[cfg(feature = "hardware")]
fn run_hardware(config: &Config, ticks: Option<u64>) -> Result<()> {
    use tofnode::config::RANGING_ADDRESS;
    use tofnode::sensors::{LinuxI2cBus, Vl53l0x};

    let bus = LinuxI2cBus::new(&config.bus.device);
    let ranger = Vl53l0x::open(&config.bus.device, RANGING_ADDRESS)?;
    info!("Opened bus {:?}", config.bus.device);
    run_node(config, bus, ranger, ticks)
}

#[cfg(not(feature = "hardware"))]
fn run_hardware(_config: &Config, _ticks: Option<u64>) -> Result<()> {
    bail!("Hardware feature not enabled. Build with --features hardware or use --demo");
}

fn run_node<B: BusWrite, R: RangingSensor>(config: &Config, bus: B, ranger: R, ticks: Option<u64>) -> Result<()> {
    let transport = open_transport(config)?;

    let mut scheduler = Scheduler::new(
        BusSelector::new(bus, MUX_ADDRESS),
        ranger,
        MonotonicClock::new(),
        LogIndicator::new(SENSOR_COUNT),
        transport,
    );
    scheduler.set_ranging_mode(config.ranging);

    scheduler.run(config.tick_interval(), ticks);

    info!("Node stats: {}", serde_json::to_string(scheduler.stats())?);
    Ok(())
}

fn open_transport(config: &Config) -> Result<Box<dyn Transport>> {
    #[cfg(feature = "serial")]
    {
        if config.serial.port.is_some() {
            let port = tofnode::streaming::SerialTransport::open(&config.serial)?;
            return Ok(Box::new(port));
        }
    }

    #[cfg(not(feature = "serial"))]
    {
        if let Some(port) = &config.serial.port {
            bail!("Serial feature not enabled, cannot open {}. Build with --features serial", port);
        }
    }

    info!("Writing records to stdout");
    Ok(Box::new(WriterTransport::new(std::io::stdout())))
}

fn run_listener(config: &Config, format: ExportFormat) -> Result<()> {
    let mut journal = RecordJournal::new(&config.data_dir, format)?;

    #[cfg(feature = "serial")]
    {
        if config.serial.port.is_some() {
            let port = tofnode::streaming::SerialTransport::open(&config.serial)?;
            journal_lines(port.reader()?, &mut journal)?;
            return Ok(());
        }
    }

    info!("Reading records from stdin");
    journal_lines(std::io::stdin().lock(), &mut journal)?;
    Ok(())
}
