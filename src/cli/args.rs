//! Command line argument parsing

use crate::core::video_info::{Container, DownloadPreference, Quality};
use crate::platform::client::HttpClientConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Resolve and download YouTube videos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video URL, short link or 11-character id
    pub url_or_id: String,

    /// Download the best audio-only stream
    #[arg(short, long)]
    pub audio_only: bool,

    /// Preferred container
    #[arg(short, long, value_enum, default_value = "mp4")]
    pub container: ContainerArg,

    /// Preferred quality
    #[arg(long, value_enum, default_value = "highest")]
    pub quality: QualityArg,

    /// Output path (file or directory)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the resolved media URL(s) and exit (no download)
    #[arg(short = 'g', long)]
    pub print_url: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Maximum redirects followed per request
    #[arg(long, default_value = "10")]
    pub max_redirects: usize,

    /// Custom user agent for every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ContainerArg {
    Mp4,
    Webm,
    Mp3,
    Ogg,
}

impl From<ContainerArg> for Container {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Mp4 => Container::Mp4,
            ContainerArg::Webm => Container::Webm,
            ContainerArg::Mp3 => Container::Mp3,
            ContainerArg::Ogg => Container::Ogg,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum QualityArg {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Lowest => Quality::Lowest,
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::High => Quality::High,
            QualityArg::Highest => Quality::Highest,
        }
    }
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    pub fn preference(&self) -> DownloadPreference {
        DownloadPreference::new()
            .with_container(self.container.into())
            .with_quality(self.quality.into())
            .with_audio_only(self.audio_only)
    }

    pub fn http_config(&self) -> HttpClientConfig {
        let config = HttpClientConfig::default()
            .with_timeout(self.timeout_duration())
            .with_max_redirects(self.max_redirects);
        match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent.as_str()),
            None => config,
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl VerbosityLevel {
    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            url_or_id: String::new(),
            audio_only: false,
            container: ContainerArg::Mp4,
            quality: QualityArg::Highest,
            output: None,
            print_url: false,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            max_redirects: 10,
            user_agent: None,
            no_progress: false,
            verbose: false,
            quiet: false,
        }
    }
}
