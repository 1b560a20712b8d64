mod cli;
mod config;
mod logging;
mod observer;
mod replay;
mod script;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::unbounded;
use thiserror::Error;

use padcast_registry::{DeliveryPolicy, Registry};

use crate::cli::{Cli, Command};
use crate::config::resolve_config;
use crate::observer::FrameLogger;
use crate::replay::replay;
use crate::script::{load_script, ScriptError};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("registry error: {0}")]
    Registry(#[from] padcast_registry::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn run_replay(
    script_path: &Path,
    config_path: Option<&Path>,
    strict: bool,
    track_state: bool,
    repeat: bool,
) -> Result<(), AppError> {
    let script = load_script(script_path)?;
    let registry = Registry::new(resolve_config(config_path, strict, track_state)?);
    if registry.config().delivery == DeliveryPolicy::DropUnknown {
        print_info!("strict delivery: frames for unknown devices are dropped");
    }
    let logger = Arc::new(FrameLogger::new());
    registry.subscribe(logger.clone());

    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    print_info!(
        "replaying {} ({} steps)",
        script_path.display(),
        script.steps.len()
    );
    let stats = replay(&registry, &script, repeat, &stop_rx)?;
    if stats.interrupted {
        print_info!("replay interrupted");
    }
    print_info!(
        "replay done: passes={} events={} frames={} missing={} attached={:?}",
        stats.passes,
        stats.events,
        logger.frames(),
        logger.missing(),
        registry.device_ids()
    );
    Ok(())
}

fn run_check(script_path: &Path) -> Result<(), AppError> {
    let script = load_script(script_path)?;
    let summary = script.summary();
    print_info!(
        "{}: {} devices, {} attach, {} detach, {} frames, {} waits, tick {}ms",
        script_path.display(),
        summary.devices,
        summary.attaches,
        summary.detaches,
        summary.frames,
        summary.waits,
        script.tick.as_millis()
    );
    if summary.unknown_frames > 0 {
        print_warning!(
            "{} frames target devices that are not attached at that point",
            summary.unknown_frames
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::setup(cli.verbose, cli.no_color) {
        eprintln!("Unable to set up logger: {e}");
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Command::Replay {
            script,
            config,
            strict,
            track_state,
            repeat,
        } => run_replay(script, config.as_deref(), *strict, *track_state, *repeat),
        Command::Check { script } => run_check(script),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error!("{e}");
            ExitCode::FAILURE
        }
    }
}
