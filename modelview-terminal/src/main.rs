/// modelview terminal viewer
///
/// Renders a glTF/GLB or STL model as ASCII art with orbit controls.
/// Controls:
///   - WASD / Arrow Keys / left drag: Orbit
///   - +/- / scroll: Zoom
///   - IJKL / right drag: Pan
///   - Q/ESC: Quit

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use modelview_core::ViewerConfig;
use modelview_terminal::TerminalApp;

#[derive(Parser, Debug)]
#[command(name = "modelview-terminal", about = "Orbit a 3D model in the terminal")]
struct Cli {
    /// Model file (GLB, glTF or STL) [default: WWS_000.glb]
    model: Option<PathBuf>,

    /// JSON file overriding viewer constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target frame rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            ViewerConfig::from_json_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => ViewerConfig::default(),
    };
    if let Some(model) = &cli.model {
        config.model_url = model.to_string_lossy().into_owned();
    }
    log::info!("viewing {}", config.model_url);

    let mut app = TerminalApp::new(config, cli.fps);
    app.run().context("terminal renderer failed")?;
    Ok(())
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
