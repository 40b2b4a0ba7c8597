/// Gantry Sim - terminal 5-axis gantry simulator
///
/// Usage: gantry-sim [config.toml]
///
/// The config path may also come from `GANTRY_SIM_CONFIG`. Logs go to
/// `gantry-sim.log` since the terminal is the render surface; filter with
/// `RUST_LOG`.
///
/// Controls:
///   - X/Y/Z/A/B: select axis, +/- or Up/Down: jog, F: fine steps
///   - T: toggle motor / TCP jogging, : or Enter: type a value
///   - S: start/stop auto-scan, H: home
///   - Left/Right, [ ], , .: orbit and zoom the view, P: perspective/orthographic
///   - Q/ESC: Quit
use anyhow::Context;
use gantry_core::{stl, SimConfig};
use gantry_terminal::TerminalApp;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "gantry-sim.log";
const CONFIG_ENV: &str = "GANTRY_SIM_CONFIG";

fn init_logging() -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("opening {LOG_FILE}"))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = match config_path() {
        Some(path) => SimConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };

    let object = match &config.object_path {
        Some(path) => Some(
            stl::load_stl(path).with_context(|| format!("loading scan object {}", path.display()))?,
        ),
        None => None,
    };

    let (width, height) = crossterm::terminal::size().context("querying terminal size")?;
    let mut app = TerminalApp::new(&config, object, width, height)?;
    info!(width, height, "starting terminal session");
    app.run().context("terminal session failed")?;

    println!("Thank you for using Gantry Sim!");
    Ok(())
}
