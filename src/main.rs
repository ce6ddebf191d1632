use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nowplaying::config::{self, Settings};
use nowplaying::{bridge, logging, platform_source, watch, NowPlaying};

#[derive(Parser)]
#[command(name = "nowplaying", version, about = "Expose the OS now-playing session as JSON")]
struct Cli {
    /// Settings file (defaults to $NOWPLAYING_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer line-delimited JSON requests on stdin/stdout
    Serve,
    /// Print the current track once as JSON
    Once,
    /// Poll and print a line whenever the track or its state changes
    Watch {
        /// Poll period in milliseconds (overrides the settings file)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show the effective settings
    Config {
        /// Write the defaults to the settings path
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    let _log_guard = logging::init(&settings.log).context("initializing logging")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut np = NowPlaying::new(platform_source(&settings), &settings);
            let stdin = io::stdin();
            bridge::serve(&mut np, stdin.lock(), io::stdout().lock()).context("bridge I/O failed")?;
        }
        Command::Once => {
            let mut np = NowPlaying::new(platform_source(&settings), &settings);
            let value = np
                .track()
                .map(|record| record.to_json())
                .unwrap_or_else(|| serde_json::json!({}));
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Watch { interval } => {
            let interval = Duration::from_millis(interval.unwrap_or(settings.poll_interval_ms).max(50));
            run_watch(&settings, interval)?;
        }
        Command::Config { init } => {
            let path = match cli.config {
                Some(p) => p,
                None => config::resolve_config_path()?,
            };
            if init {
                Settings::default().save(&path)?;
                println!("Wrote defaults to {}", path.display());
            } else {
                println!("# {}", path.display());
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
        }
    }

    Ok(())
}

fn run_watch(settings: &Settings, interval: Duration) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&shutdown))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown))?;
    }

    let mut np = NowPlaying::new(platform_source(settings), settings);
    let ticker = crossbeam_channel::tick(interval);
    let mut last_seen: watch::LastSeen = None;

    tracing::info!("[Watch] Polling every {:?}", interval);

    while !shutdown.load(Ordering::Relaxed) {
        if let Some(line) = watch::change_line(&mut last_seen, np.track()) {
            println!("{}", line);
        }

        if ticker.recv().is_err() {
            break;
        }
    }

    tracing::info!("[Watch] Shutting down");
    Ok(())
}
