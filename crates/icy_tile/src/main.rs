#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_lossless)]

mod commands;
mod options;
mod png_export;

pub use options::*;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming};
use semver::Version;

lazy_static::lazy_static! {
    pub static ref VERSION: Version = Version::parse(env!("CARGO_PKG_VERSION")).unwrap();
}

#[derive(Parser, Debug)]
#[command(version, about = "Inspects tile graphics projects and exports arrangers", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Prints the resource tree of a project")]
    Info {
        #[arg(help = "Project definition (.toml)")]
        project: PathBuf,
    },

    #[command(about = "Lists the available codecs")]
    Codecs,

    #[command(about = "Renders an arranger to a PNG file")]
    Render {
        #[arg(help = "Project definition (.toml)")]
        project: PathBuf,
        #[arg(help = "Path key of the arranger, e.g. /Graphics/Font")]
        arranger: String,
        #[arg(help = "Output PNG file")]
        output: PathBuf,
        #[arg(long, help = "Integer upscaling, overrides the configured scale")]
        scale: Option<u32>,
    },

    #[command(about = "Shows what removing a resource would affect")]
    RemovePreview {
        #[arg(help = "Project definition (.toml)")]
        project: PathBuf,
        #[arg(help = "Path key of the resource to remove")]
        resource: String,
    },
}

fn start_logger(options: &Options) -> Option<LoggerHandle> {
    let Some(log_dir) = get_config_dir() else {
        eprintln!("Failed to create log file");
        return None;
    };
    if !log_dir.exists() && std::fs::create_dir_all(&log_dir).is_err() {
        eprintln!("Failed to create log directory {}", log_dir.display());
        return None;
    }
    let logger = match Logger::try_with_env_or_str(&options.log_spec) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("Invalid log spec '{}': {err}", options.log_spec);
            return None;
        }
    };
    logger
        .log_to_file(FileSpec::default().directory(&log_dir).basename("icy_tile").suffix("log").suppress_timestamp())
        .rotate(Criterion::Size(64 * 1024), Naming::Numbers, Cleanup::KeepLogFiles(3))
        .duplicate_to_stderr(flexi_logger::Duplicate::Warn)
        .start()
        .inspect_err(|err| eprintln!("Failed to start logger: {err}"))
        .ok()
}

fn main() {
    let args = Args::parse();
    let options = Options::load_options();
    let logger = start_logger(&options);
    log::info!("Starting icy_tile {}", *VERSION);

    let result = match args.command {
        Commands::Info { project } => commands::info(&project, &options),
        Commands::Codecs => {
            commands::codecs();
            Ok(())
        }
        Commands::Render { project, arranger, output, scale } => commands::render(&project, &arranger, &output, scale, &options),
        Commands::RemovePreview { project, resource } => commands::remove_preview(&project, &resource, &options),
    };

    if let Err(err) = result {
        log::error!("{err:#}");
        eprintln!("error: {err:#}");
        drop(logger);
        std::process::exit(1);
    }
}
