//! annotool: operator command line for the annotation backend.
//!
//! Runs migrations and the administrative engine operations (series sync,
//! cascading delete, template cloning, listing) against the configured
//! database. Every operation acts as the operator user with admin capability
//! and prints its result as JSON on stdout.

mod commands;
mod config;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use annotool_core::{defaults, logging};

use crate::config::{Config, LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "annotool")]
#[command(author, version, about = "Operator tooling for the annotool backend")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Reconcile a video's categories with a series
    SyncSeries {
        /// External id of the video
        #[arg(short, long)]
        video: String,

        /// External id of the series
        #[arg(short, long)]
        series: String,
    },

    /// Soft-delete a video with everything it owns
    DeleteVideo {
        /// External id of the video
        #[arg(short, long)]
        video: String,
    },

    /// Copy a template category, its scale and labels into a video
    CloneCategory {
        /// External id of the target video
        #[arg(short, long)]
        video: String,

        /// Id of the template category
        #[arg(short, long)]
        template: Uuid,
    },

    /// Copy a template scale and its values into a video
    CloneScale {
        /// External id of the target video
        #[arg(short, long)]
        video: String,

        /// Id of the template scale
        #[arg(short, long)]
        template: Uuid,
    },

    /// List a video's categories, syncing a series first when given
    ListCategories {
        /// External id of the video
        #[arg(short, long)]
        video: String,

        /// External id of the series to sync before listing
        #[arg(short, long)]
        series: Option<String>,

        /// Tag filter as key=value (can specify multiple)
        #[arg(short, long = "tag", value_parser = commands::parse_tag)]
        tags: Vec<(String, String)>,

        /// Keep categories matching any tag instead of all tags
        #[arg(long)]
        any: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_logging(&config.log);

    match commands::run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(
                subsystem = logging::SUBSYSTEM_CLI,
                component = logging::COMPONENT_COMMANDS,
                error = %e,
                "Command failed"
            );
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber. The returned guard flushes the file writer
/// on drop.
fn init_logging(log: &LogConfig) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| defaults::LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(path) = &log.file {
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("annotool.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        match log.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init(),
            LogFormat::Text => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(log.ansi.unwrap_or(false)),
                )
                .init(),
        }
        Some(guard)
    } else {
        // Logs go to stderr so stdout carries only JSON results
        match log.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init(),
            LogFormat::Text => {
                let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
                if let Some(ansi) = log.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).init();
            }
        }
        None
    };

    info!(
        subsystem = logging::SUBSYSTEM_CLI,
        log_format = ?log.format,
        log_file = log
            .file
            .as_deref()
            .and_then(|p| p.to_str())
            .unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}
