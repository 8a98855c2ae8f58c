//! DeckFlow - DeckLink device manager
//!
//! Runs the device manager against the simulated SDK for a fixed number of
//! ticks and prints the state of every card and device.

#![warn(missing_docs)]

mod logging_setup;
mod report;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use deckflow_core::{
    registry, AppSettings, FrameRate, InputSettings, OutputSettings, Resolution, ScanMode,
    VideoDeviceType, VideoModeSetting,
};
use deckflow_io::decklink::sim::{SimFrameSource, SimulatedGpu, SimulatedSdk};
use deckflow_io::{load_settings, save_settings, DeckLinkManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "deckflow")]
#[command(author, version, about = "DeckLink device manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the device manager on simulated hardware
    Run {
        /// Settings file (.toml, .ron or .json)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Number of ticks to run (overrides the settings file)
        #[arg(long)]
        ticks: Option<u64>,

        /// Log level (overrides the settings file)
        #[arg(long)]
        log_level: Option<String>,

        /// Display mode fed to every bound input, e.g. HD1080p50
        #[arg(long, value_name = "MODE")]
        input_signal: Option<String>,
    },

    /// List the registered display modes
    Modes,

    /// Write a starter settings file
    InitConfig {
        /// Destination (.toml, .ron or .json)
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            config,
            ticks,
            log_level,
            input_signal,
        }) => run(config.as_deref(), ticks, log_level, input_signal.as_deref()),
        Some(Commands::Modes) => {
            report::print_modes(registry());
            Ok(())
        }
        Some(Commands::InitConfig { path }) => init_config(&path),
        None => run(None, None, None, None),
    }
}

fn run(
    config: Option<&Path>,
    ticks: Option<u64>,
    log_level: Option<String>,
    input_signal: Option<&str>,
) -> Result<()> {
    let mut settings = match config {
        Some(path) => load_settings(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => starter_settings(),
    };
    if let Some(level) = log_level {
        settings.log_config.level = level;
    }
    if let Some(ticks) = ticks {
        settings.simulation.ticks = ticks;
    }

    let _log_guard = logging_setup::init(&settings.log_config)?;
    info!("===      DeckFlow Session Started      ===");

    let signal = input_signal
        .map(|name| {
            registry()
                .modes()
                .iter()
                .find(|mode| mode.name == name)
                .ok_or_else(|| anyhow!("Unknown display mode: {}", name))
        })
        .transpose()?;

    let sdk = Arc::new(SimulatedSdk::from_settings(&settings.simulation));
    let gpu = Arc::new(SimulatedGpu::new());
    let mut manager = DeckLinkManager::new(settings.manager.clone(), sdk.clone(), gpu);

    let output_names: Vec<String> = manager
        .devices(VideoDeviceType::Output)
        .iter()
        .map(|record| record.name.clone())
        .collect();
    for name in &output_names {
        manager.set_frame_source(name, Box::new(SimFrameSource::new()))?;
    }

    let cards = manager.enable();
    if cards == 0 {
        warn!("No DeckLink card detected");
    }

    if let Some(mode) = signal {
        let logical = manager.logical_device_names(VideoDeviceType::Input).to_vec();
        for record in manager.devices(VideoDeviceType::Input) {
            let index = record.current_index();
            if let Some(name) = usize::try_from(index).ok().and_then(|i| logical.get(i)) {
                sdk.set_input_signal(name, Some(mode));
            }
        }
    }

    let interval = Duration::from_millis(settings.simulation.tick_interval_ms);
    let mut now = Duration::ZERO;
    for _ in 0..settings.simulation.ticks {
        manager.tick(now);
        // Manual outputs pace the host clock
        now += manager
            .capture_delta()
            .filter(|delta| !delta.is_zero())
            .unwrap_or(interval);
    }

    report::print_manager(&manager, now);
    manager.disable();
    info!("===       DeckFlow Session Ended       ===");
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    let mut settings = starter_settings();
    save_settings(&mut settings, path)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    println!("Settings written to {}", path.display());
    Ok(())
}

/// One output and one input on the first card.
fn starter_settings() -> AppSettings {
    let mut settings = AppSettings::default();
    settings.manager.outputs.push(OutputSettings {
        device_selection: 0,
        video_mode: VideoModeSetting {
            resolution: Resolution::Hd1080,
            frame_rate: FrameRate::Fps50,
            scan_mode: ScanMode::Progressive,
        },
        ..OutputSettings::named("Program")
    });
    settings.manager.inputs.push(InputSettings {
        device_selection: 1,
        ..InputSettings::named("Camera")
    });
    settings
}
