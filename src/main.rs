//! Ripcord - concurrent CD ripping pipeline
//!
//! This is the main entry point for the ripcord command line tool, which rips
//! an album with cdparanoia, encodes and tags every track and files the
//! results into the music library.

use anyhow::Result;
use clap::Parser;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ripcord::album::Album;
use ripcord::cli::{Args, Commands, ConfigAction};
use ripcord::config::Config;
use ripcord::dependency::Dependencies;
use ripcord::error::RipcordError;
use ripcord::rip::TrackSelection;
use ripcord::workflow::RipSession;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::Rip { album, begin, end, continue_rip, keep_ripdir, no_progress } => {
            if keep_ripdir {
                config.keep_ripdir = true;
            }

            let album = Album::from_file(&album)?;
            let selection = parse_selection(begin, end, continue_rip, album.track_count())?;

            let deps = Dependencies::discover(&config)?;
            let session = RipSession::new(config, deps)?.with_progress(!no_progress);
            session.rip(album, selection).await?;
        }
        Commands::Check => {
            config.validate()?;
            let deps = Dependencies::discover(&config)?;

            println!("Configuration is valid");
            println!("{:<10} {}", "ripper", deps.ripper.display());
            println!("{:<10} {}", "encoder", deps.encoder.display());
            match &deps.editor {
                Some(editor) => println!("{:<10} {}", "editor", editor.display()),
                None => println!("{:<10} (not found)", "editor"),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&config)
                    .map_err(|e| RipcordError::Config(format!("Failed to serialize config: {}", e)))?;
                println!("{}", content);
            }
            ConfigAction::Init { force } => {
                let path = match &args.config {
                    Some(path) => path.clone(),
                    None => Config::default_path().ok_or_else(|| {
                        RipcordError::Config("Cannot determine configuration directory".to_string())
                    })?,
                };
                if path.exists() && !force {
                    return Err(RipcordError::Config(format!(
                        "{} already exists, use --force to overwrite",
                        path.display()
                    ))
                    .into());
                }
                Config::default().save_to_file(&path)?;
                println!("Wrote default configuration to {}", path.display());
            }
        },
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::cache_dir()
        .unwrap_or(std::env::current_dir()?)
        .join("ripcord")
        .join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "ripcord.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("ripcord.log").display());

    Ok(())
}

/// Resolve --begin/--end against the album's track count
fn parse_selection(
    begin: Option<u32>,
    end: Option<u32>,
    continue_rip: bool,
    track_count: u32,
) -> Result<TrackSelection> {
    let begin_track = begin.unwrap_or(1);
    let end_track = match (begin, end) {
        (_, Some(end)) => end,
        (Some(begin), None) => begin,
        (None, None) => track_count,
    };
    Ok(TrackSelection::new(begin_track, end_track, continue_rip, track_count)?)
}
