//! Power Hour CLI: plan, render, and embed clip playlists.
//!
//! Usage:
//!   powerhour plan  <SOURCE> [--json]          Show what a render would do
//!   powerhour build <SOURCE> -o out.mp4        Render one video with ffmpeg
//!   powerhour embed <SOURCE> -o hour.html      Write a browser playlist
//!   powerhour check                            Check for ffmpeg/ffprobe
//!   powerhour config                           Show or initialize configuration
//!
//! `<SOURCE>` is one of `--dir`, `--playlist`, `--urls` or `--table`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use powerhour_common::config::AppConfig;
use powerhour_common::error::PowerHourError;

mod args;
mod commands;

use args::{EmbedArgs, RenderArgs, SourceArgs};

#[derive(Parser)]
#[command(
    name = "powerhour",
    about = "Assemble power hour playlists from local videos or online video ids",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select, probe and plan segments without writing anything
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        render: RenderArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the selection into one video file
    Build {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        render: RenderArgs,

        /// Output file path
        #[arg(short, long, default_value = "powerhour.mp4")]
        output: PathBuf,

        /// Print the plan and the ffmpeg command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate an HTML page that plays online videos in sequence
    Embed {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        embed: EmbedArgs,

        /// Output file path
        #[arg(short, long, default_value = "powerhour.html")]
        output: PathBuf,

        /// Print the playback schedule without writing the page
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the external tools are installed
    Check,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the standard location
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report(e),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    powerhour_common::logging::init_logging(&logging);

    let result = match cli.command {
        Commands::Plan {
            source,
            render,
            json,
        } => commands::plan::run(&config, source, render, json),
        Commands::Build {
            source,
            render,
            output,
            dry_run,
        } => commands::build::run(&config, source, render, output, dry_run).await,
        Commands::Embed {
            source,
            embed,
            output,
            dry_run,
        } => commands::embed::run(&config, source, embed, output, dry_run),
        Commands::Check => commands::check::run(),
        Commands::Config { init } => commands::config::run(&config, init),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                PowerHourError::config(format!("cannot read {}: {e}", path.display()))
            })?;
            Ok(AppConfig::from_json(&content)?)
        }
        None => Ok(AppConfig::load()),
    }
}

fn report(err: anyhow::Error) -> ExitCode {
    eprintln!("Error: {err:#}");
    let code = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PowerHourError>())
        .map(PowerHourError::exit_code)
        .unwrap_or(1);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
