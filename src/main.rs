//! lumengrid daemon: assembles the engine and runs the show.
//!
//! The control surface (HTTP) and the viewer attach from outside through the
//! engine handle; this binary only wires configuration, programs, and the
//! lifecycle together.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;

use lumengrid_engine::{
    ChannelLayout, EngineConfig, FixedHoursClock, Layout, LightBuffer, OutputFramer, ShowEngine,
};

mod config;
mod programs;

use config::AppConfig;
use programs::{CascadeProgram, SolidProgram};

#[derive(Parser, Debug)]
#[command(author, version, about = "Daemon driving the lumengrid light installation", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Program to select on startup (overrides the config file).
    #[arg(short, long)]
    program: Option<String>,
    /// Frame rate override in Hz.
    #[arg(long)]
    frame_rate: Option<f64>,
    /// Animation speed override; 1.0 is real time.
    #[arg(long)]
    speed: Option<f64>,
    /// Start under day/night scheduling instead of immediately.
    #[arg(long)]
    scheduled: bool,
    /// List the registered programs and exit.
    #[arg(long)]
    list_programs: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match config::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("failed to load {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    if let Some(program) = cli.program {
        config.program = Some(program);
    }
    if let Some(frame_rate) = cli.frame_rate {
        config.frame_rate_hz = frame_rate;
    }
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }
    if cli.scheduled {
        config.scheduled = true;
    }

    let lights = LightBuffer::new(Layout::double_tower());
    let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, config.channels));
    let engine = ShowEngine::with_config(
        lights,
        framer,
        EngineConfig {
            frame_rate_hz: config.frame_rate_hz,
            ..EngineConfig::default()
        },
    )
    .with_sun_clock(Arc::new(FixedHoursClock::new(config.sunrise, config.sunset)));

    // The SPI device driver attaches here when running on the installation
    // hardware. Without it the engine runs headless, which is the normal
    // state on a development machine.
    log::warn!("no transmitter attached; running headless");

    engine.register_program(Box::new(SolidProgram::default()));
    engine.register_program(Box::new(CascadeProgram::default()));

    if cli.list_programs {
        for name in engine.program_names() {
            println!("{name}");
        }
        return;
    }

    engine.set_speed(config.speed);
    let program = config.program.clone().unwrap_or_else(|| "cascade".to_string());
    if !engine.select_program(&program) {
        log::error!("program {program:?} is not registered");
        std::process::exit(1);
    }

    if config.scheduled {
        engine.set_scheduled(true);
    } else {
        engine.start();
    }

    log::info!(
        "lumengrid up; driving {} lights at {} Hz",
        engine.with_lights(|l| l.lights().len()),
        config.frame_rate_hz
    );

    loop {
        thread::park();
    }
}
