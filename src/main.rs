//! Main entry point for the yt-dl CLI

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yt_dl::cli::output::{create_progress_callback, OutputFormatter};
use yt_dl::cli::{Args, VerbosityLevel};
use yt_dl::core::downloader::{DownloadOptions, Downloader};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(args.verbosity_level());
    debug!("Starting yt-dl with args: {:?}", args);

    let formatter = Arc::new(OutputFormatter::new(args.verbosity_level()));
    match run(&args, formatter.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            formatter.finish_progress();
            error!("{}", e);
            formatter.report_error(&e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: &Args, formatter: Arc<OutputFormatter>) -> yt_dl::Result<()> {
    let mut options = DownloadOptions::default()
        .with_http_config(args.http_config())
        .with_progress(args.show_progress());
    if let Some(output) = &args.output {
        options = options.with_output_path(output);
    }

    let mut downloader = Downloader::with_options(options)?;
    if downloader.options().progress {
        downloader = downloader.with_progress_callback(create_progress_callback(formatter.clone()));
    }
    let preference = args.preference();

    // Print URL only mode
    if args.print_url {
        let resolved = downloader.resolve(&args.url_or_id, &preference).await?;
        for url in &resolved.urls {
            println!("{}", url);
        }
        return Ok(());
    }

    formatter.info(&format!("Resolving {}", args.url_or_id));
    let start_time = Instant::now();
    let resolved = downloader.resolve(&args.url_or_id, &preference).await?;
    formatter.print_selection(&resolved.set);

    let output_path = downloader.download_resolved(&resolved, None).await?;
    formatter.finish_progress();
    formatter.print_download_complete(&output_path, start_time.elapsed());

    Ok(())
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
