//! Shout-and-Shoot: launcher controller entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  RppalBank / SimulatedBank   PorcupineSpotter   LogEventSink │
//! │  (PinBank)                   (KeywordSpotter)   (EventSink)  │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────────   │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            ControlLoop (pure coordinator)              │  │
//! │  │  buttons · launcher · indicators · listener channel    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Startup failures exit with status 1. A button-initiated shutdown hands
//! over to the configured power-off command once every line is released.
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::process::{Command, ExitCode};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};

use shoutshoot::adapters::log_sink::LogEventSink;
use shoutshoot::adapters::time::MonotonicClock;
use shoutshoot::app::ports::PinBank;
use shoutshoot::config::{ControllerConfig, WakeWordConfig};
use shoutshoot::listener::SpotterFactory;
use shoutshoot::{ControlLoop, ShutdownReport};

#[derive(Parser, Debug)]
#[command(name = "shoutshoot", version, about = "Voice and button triggered clay-target launcher")]
struct Cli {
    /// JSON deployment config (timings, pin map, wake word).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in keyword name.
    #[arg(long)]
    keyword: Option<String>,

    /// Custom keyword model (.ppn); overrides --keyword.
    #[arg(long)]
    keyword_path: Option<PathBuf>,

    /// Porcupine dynamic library.
    #[arg(long)]
    library_path: Option<PathBuf>,

    /// Porcupine model parameters.
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Detection sensitivity in [0, 1].
    #[arg(long)]
    sensitivity: Option<f32>,

    /// Listen on this capture device only (default: every usable one).
    #[arg(long)]
    device_index: Option<i32>,

    /// Dump captured audio to this WAV file.
    #[arg(long)]
    record_path: Option<PathBuf>,

    /// Picovoice access key.
    #[arg(long, env = "PICOVOICE_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Print capture devices and exit.
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    fn apply(self, config: &mut ControllerConfig) {
        let ww = &mut config.wake_word;
        if let Some(keyword) = self.keyword {
            ww.keyword = keyword;
        }
        if self.keyword_path.is_some() {
            ww.keyword_path = self.keyword_path;
        }
        if self.library_path.is_some() {
            ww.library_path = self.library_path;
        }
        if self.model_path.is_some() {
            ww.model_path = self.model_path;
        }
        if let Some(sensitivity) = self.sensitivity {
            ww.sensitivity = sensitivity;
        }
        if self.device_index.is_some() {
            ww.device_index = self.device_index;
        }
        if self.record_path.is_some() {
            ww.record_path = self.record_path;
        }
        if let Some(key) = self.access_key {
            ww.access_key = key;
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    info!("Shout-and-Shoot v{} starting", env!("CARGO_PKG_VERSION"));

    if cli.list_devices {
        return list_devices();
    }

    let mut config = match &cli.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::new(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let factories = spotter_factories(&config.wake_word)?;
    let report = drive(&config, factories)?;

    if report.cause.requests_power_off() {
        if let Some(command) = &config.power_off_command {
            power_off(command)?;
        }
    }
    Ok(())
}

#[cfg(feature = "rpi")]
fn drive(config: &ControllerConfig, factories: Vec<SpotterFactory>) -> Result<ShutdownReport> {
    let mut bank = shoutshoot::adapters::gpio::RppalBank::new(config.buttons_active_low)?;
    drive_with(config, &mut bank, factories)
}

#[cfg(not(feature = "rpi"))]
fn drive(config: &ControllerConfig, factories: Vec<SpotterFactory>) -> Result<ShutdownReport> {
    log::warn!("Built without `rpi`: using the simulated GPIO bank");
    let mut bank = shoutshoot::adapters::gpio::SimulatedBank::new();
    for line in [config.pins.shutdown_button, config.pins.manual_fire_button] {
        bank.drive(line, config.buttons_active_low);
    }
    drive_with(config, &mut bank, factories)
}

fn drive_with<B: PinBank>(
    config: &ControllerConfig,
    bank: &mut B,
    factories: Vec<SpotterFactory>,
) -> Result<ShutdownReport> {
    let control = ControlLoop::init(config, bank, factories).context("startup failed")?;
    let mut sink = LogEventSink::new();
    Ok(control.run(&MonotonicClock::new(), &mut sink))
}

#[cfg(feature = "porcupine")]
fn spotter_factories(wake_word: &WakeWordConfig) -> Result<Vec<SpotterFactory>> {
    use shoutshoot::listener::devices::{keyword_label, usable_devices};
    use shoutshoot::listener::porcupine::{available_devices, factory};

    let label = match &wake_word.keyword_path {
        Some(path) => keyword_label(path),
        None => wake_word.keyword.clone(),
    };
    info!("Listening for '{label}'");

    let names = available_devices()?;
    let selected: Vec<(i32, String)> = match wake_word.device_index {
        Some(index) => {
            let name = usize::try_from(index)
                .ok()
                .and_then(|i| names.get(i))
                .cloned()
                .unwrap_or_else(|| format!("device {index}"));
            vec![(index, name)]
        }
        None => usable_devices(&names)
            .into_iter()
            .map(|(index, name)| (index, name.to_string()))
            .collect(),
    };
    for (index, name) in &selected {
        info!("Using capture device {index}: {name}");
    }

    Ok(selected
        .into_iter()
        .enumerate()
        .map(|(source, (index, name))| factory(wake_word.clone(), source, index, name))
        .collect())
}

#[cfg(not(feature = "porcupine"))]
fn spotter_factories(_wake_word: &WakeWordConfig) -> Result<Vec<SpotterFactory>> {
    bail!("built without the `porcupine` feature; no wake-word engine available")
}

#[cfg(feature = "porcupine")]
fn list_devices() -> Result<()> {
    use shoutshoot::listener::devices::is_usable_input;

    for (index, name) in shoutshoot::listener::porcupine::available_devices()?
        .iter()
        .enumerate()
    {
        let note = if is_usable_input(name) { "" } else { " (ignored)" };
        println!("[{index}] {name}{note}");
    }
    Ok(())
}

#[cfg(not(feature = "porcupine"))]
fn list_devices() -> Result<()> {
    bail!("built without the `porcupine` feature; cannot enumerate capture devices")
}

fn power_off(command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };
    info!("Powering off: {}", command.join(" "));
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("cannot run `{program}`"))?;
    if !status.success() {
        bail!("`{}` exited with {status}", command.join(" "));
    }
    Ok(())
}
