//! Random Frame - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod constants;
mod display;
mod error;
mod net;
mod pipeline;
mod prepare;
mod settings;
mod storage;
mod types;
mod utils;

use clap::{Parser, Subcommand};
use constants::*;
use display::FrameBuffer;
use net::HttpTransport;
use pipeline::{seeded_rng, Controller, ThreadSleeper};
use settings::Settings;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storage::AssetSlot;
use tracing::{error, info};
use types::CycleOutcome;
use utils::get_data_dir;

#[derive(Parser)]
#[command(name = "random-frame", version, about = "Show a random remote PNG on a pixel panel")]
struct Cli {
    /// Directory holding settings, logs, the downloaded asset and snapshots
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and display a new image every cycle, forever (default)
    Run,
    /// Run exactly one cycle
    Once,
    /// Convert a source image into a panel-sized PNG
    Prepare {
        input: PathBuf,
        output: PathBuf,
        /// Target side length in pixels
        #[arg(long, default_value_t = DEFAULT_DISPLAY_WIDTH, value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
        /// Cluster the palette down to at most this many colours first
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        colors: Option<u32>,
    },
}

/// Initialize file and console logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "random-frame.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,random_frame=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_target(false))
        .init();

    guard
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(get_data_dir);

    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, data_dir = %data_dir.display(), "Random Frame starting");

    match cli.command.unwrap_or(Command::Run) {
        Command::Prepare {
            input,
            output,
            size,
            colors,
        } => match prepare::prepare_image(&input, &output, size, colors.map(|n| n as usize)) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, input = %input.display(), "Failed to prepare image");
                ExitCode::FAILURE
            }
        },
        Command::Run => run_frame(&data_dir, None),
        Command::Once => run_frame(&data_dir, Some(1)),
    }
}

fn run_frame(data_dir: &Path, cycles: Option<u64>) -> ExitCode {
    let settings_path = data_dir.join("settings.json");
    let settings = Settings::load(data_dir);
    if !settings_path.exists() {
        settings.save(data_dir);
    }

    let transport = match HttpTransport::new(settings.read_timeout(), settings.accept_invalid_certs)
    {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let slot = AssetSlot::new(settings.asset_path_or_default(data_dir));
    let surface = FrameBuffer::new(settings.display_width, settings.display_height)
        .with_snapshot(settings.snapshot_path_or_default(data_dir));

    info!(
        listing = %settings.listing_url,
        slot = %slot.path().display(),
        previous_asset = slot.exists(),
        width = settings.display_width,
        height = settings.display_height,
        "Pipeline configured"
    );

    let mut controller = Controller::new(
        transport,
        surface,
        ThreadSleeper,
        slot,
        settings.endpoints(),
        settings.retry_policy(),
        seeded_rng(settings.seed),
    );

    match cycles {
        Some(1) => match controller.run_cycle() {
            Ok(report) if report.outcome == CycleOutcome::Done => ExitCode::SUCCESS,
            Ok(_) => ExitCode::from(2),
            Err(_) => ExitCode::FAILURE,
        },
        limit => match controller.run(limit) {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        },
    }
}
