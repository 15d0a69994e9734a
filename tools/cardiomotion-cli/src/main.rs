//! CardioMotion CLI: contraction metrics from time-lapse well images.
//!
//! Usage:
//!   cardiomotion <SOURCE_DIR> [DEST_DIR] [OPTIONS]
//!
//! Extracts a motion signal for every well found in SOURCE_DIR, then writes
//! per-plate peak statistics. Re-running with the same destination skips
//! wells that already have a signal file.

use cardiomotion_common::cancel::CancelToken;
use cardiomotion_common::logging::init_logging;
use cardiomotion_pipeline::{Pipeline, RunSummary};
use clap::Parser;

mod args;

use args::Cli;

/// Conventional exit status for a process stopped by SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (app, config_warning) = cli.load_app_config();
    init_logging(&cli.logging_config(&app.logging));
    if let Some(warning) = config_warning {
        tracing::warn!("{warning}");
    }

    let config = cli.pipeline_config(&app);
    let cancel = CancelToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Keyboard interrupt, stopping");
            interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::new(config, cancel)?;
        pipeline.run()
    })
    .await?;

    match result {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Interrupted. Completed wells are kept; re-run to resume.");
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            Err(e.into())
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Output: {}", summary.dest_dir.display());
    println!(
        "  fps {:.3}, scale {:.1} nm/px",
        summary.fps, summary.scale_nm_per_px
    );
    println!(
        "  Wells: {} processed, {} already done, {} skipped, {} failed",
        summary.completed(),
        summary.already_done(),
        summary.skipped(),
        summary.failed()
    );
    for table in &summary.tables {
        println!("  Plate {}: {} wells with statistics", table.plate, table.len());
    }
}
