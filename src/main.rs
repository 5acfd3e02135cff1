//! joke-teller: joke generator with optional text-to-speech playback.

mod audio;
mod collaborators;
mod content;
mod error;
mod history;
mod logging;
mod provision;
mod settings;
mod supervisor;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use crate::collaborators::Collaborators;
use crate::settings::{Overrides, Settings};
use crate::supervisor::{RunMode, Supervisor};

#[derive(Parser, Debug)]
#[command(name = "joke-teller", about = "Joke generator with text-to-speech")]
struct Args {
    /// Path to the JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run mode
    #[arg(short, long, value_enum, default_value_t = RunMode::Interactive)]
    mode: RunMode,

    /// Number of jokes for batch mode
    #[arg(long)]
    count: Option<usize>,

    /// Prepare directories and settings, check collaborators, then exit
    #[arg(long)]
    install: bool,

    /// Disable audio for this run (not persisted)
    #[arg(long)]
    no_audio: bool,

    /// Write the settings file back on exit
    #[arg(long)]
    save_config: bool,

    /// Enable verbose (debug) console logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_dir = Path::new(logging::LOG_DIR);
    let log = logging::init(log_dir, args.verbose);
    info!("joke-teller starting");

    let settings_path = Settings::resolve_path(args.config.as_deref());
    let collaborators = Collaborators::system();

    if args.install {
        let settings = Settings::load(&settings_path);
        log.apply(&settings);
        let report = provision::provision(&settings, log_dir, &collaborators).await;
        info!("Install finished: {report:?}");
        return Ok(());
    }

    let overrides = Overrides {
        no_audio: args.no_audio,
        count: args.count,
        save_on_exit: args.save_config,
    };
    let mut supervisor = Supervisor::start(settings_path, overrides, collaborators).await;
    log.apply(supervisor.settings());

    supervisor.install_signal_handlers();
    supervisor.run(args.mode).await;

    info!("joke-teller stopped");
    Ok(())
}
