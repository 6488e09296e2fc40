/// rig3d Terminal - interactive rigs rendered as ASCII
///
/// Runs one of the built-in rigs (the truck/robot transformer or the tower
/// crane) in the terminal. Controls come from the rig's default keymap,
/// optionally overridden by a keymap file.
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use rig3d_core::Preset;
use rig3d_terminal::{Keymap, TerminalApp};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive articulated rigs in the terminal")]
struct Args {
    /// Rig to load (transformer or tower-crane)
    #[arg(long, default_value = "transformer")]
    rig: Preset,
    /// Keymap file whose bindings override the rig's defaults
    #[arg(long)]
    keymap: Option<PathBuf>,
    /// Target frames per second
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    fps: u32,
    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        // The alternate screen owns stdout; keep stderr quiet by default.
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let sim = args
        .rig
        .build()
        .with_context(|| format!("failed to build rig '{}'", args.rig))?;

    let mut keymap = Keymap::for_preset(args.rig)?;
    if let Some(path) = &args.keymap {
        keymap.merge(Keymap::load(path)?);
        tracing::info!(path = %path.display(), bindings = keymap.len(), "loaded keymap");
    }

    let mut app = TerminalApp::new(sim, keymap, args.fps).context("failed to query terminal size")?;
    if let Some(part) = args.rig.follow_part() {
        app.follow_part(part)
            .with_context(|| format!("rig '{}' has no part '{part}'", args.rig))?;
    }
    app.run().context("terminal session failed")?;

    Ok(())
}
