//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::progress::{format_bytes, format_bytes_per_second, format_duration, Progress};
use crate::core::video_info::{ResolvedStreamSet, Selection};
use crate::error::YtDlError;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{prefix:>6} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}";

/// Terminal output, with one progress bar per stream being downloaded
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    bars: MultiProgress,
    active: Mutex<HashMap<String, ProgressBar>>,
}

impl OutputFormatter {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        let bars = if verbosity == VerbosityLevel::Quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            verbosity,
            bars,
            active: Mutex::new(HashMap::new()),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    /// Create or advance the bar for `progress.label`
    pub fn update_progress(&self, progress: &Progress) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }
        let Ok(mut active) = self.active.lock() else {
            return;
        };

        let bar = active.entry(progress.label.clone()).or_insert_with(|| {
            let bar = self
                .bars
                .add(ProgressBar::new(progress.total_size.unwrap_or(0)));
            bar.set_style(Self::bar_style());
            bar.set_prefix(progress.label.clone());
            bar
        });

        if let Some(total) = progress.total_size {
            bar.set_length(total);
        }
        bar.set_position(progress.downloaded_size);
        if let Some(speed) = progress.speed {
            bar.set_message(format_bytes_per_second(speed));
        }
    }

    /// Finish every open bar
    pub fn finish_progress(&self) {
        if let Ok(mut active) = self.active.lock() {
            for (_, bar) in active.drain() {
                bar.finish();
            }
        }
    }

    /// Number of bars created so far and not yet finished
    pub fn active_bars(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print a failed run's error with a hint for the common causes
    pub fn report_error(&self, err: &YtDlError) {
        self.error(&err.to_string());
        if let Some(hint) = error_hint(err) {
            eprintln!("   {}", hint);
        }
    }

    /// Print the chosen streams
    pub fn print_selection(&self, set: &ResolvedStreamSet) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("📹 {}", set.title);
        let kind = match &set.selection {
            Selection::Muxed(_) => "muxed",
            Selection::AudioOnly(_) => "audio only",
            Selection::VideoOnly(_) => "video only",
            Selection::Adaptive { .. } => "video + audio (muxed with ffmpeg)",
        };
        println!("📦 {} as {}", kind, set.output_extension());

        for stream in set.streams() {
            let size = stream
                .content_length
                .map(|s| format!(" ({})", format_bytes(s)))
                .unwrap_or_default();
            println!(
                "  📋 itag={} | {} | {}{}",
                stream.itag,
                stream.quality_string(),
                stream.mime_type,
                size
            );
        }
        println!();
    }

    /// Print download complete message
    pub fn print_download_complete(&self, output_path: &Path, duration: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!();
        println!("✅ Download completed!");
        println!("💾 Saved to: {}", output_path.display());
        println!("⏱️  Time: {}", format_duration(duration));
    }
}

fn error_hint(err: &YtDlError) -> Option<&'static str> {
    if err.is_script_error() {
        Some("The player script layout may have changed; an update is probably needed")
    } else if err.is_transport_error() {
        Some("Check the network connection, or raise --timeout")
    } else {
        None
    }
}

/// Create a progress callback for the downloader
pub fn create_progress_callback(
    formatter: Arc<OutputFormatter>,
) -> impl Fn(&Progress) + Send + Sync + 'static {
    move |progress: &Progress| {
        formatter.update_progress(progress);
    }
}
