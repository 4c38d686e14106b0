//! # yt-dl
//!
//! Resolves YouTube video identifiers into directly fetchable media URLs and
//! downloads them.
//!
//! ## Features
//!
//! - Player metadata retrieval with an ordered client fallback chain
//! - Player-script analysis for signature and "n" parameter transforms
//! - Stream selection by container, quality and audio-only preference
//! - Streaming downloads with ffmpeg muxing of adaptive streams
//!
//! ## Example
//!
//! ```rust,no_run
//! use yt_dl::{DownloadPreference, Downloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = Downloader::new()?;
//!     let preference = DownloadPreference::new().with_audio_only(true);
//!
//!     let path = downloader.download("dQw4w9WgXcQ", None, &preference).await?;
//!     println!("Downloaded: {}", path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod download;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{
    Container, DownloadOptions, DownloadPreference, Downloader, MetadataDocument, Progress,
    Quality, ResolvedDownload, ResolvedStreamSet, Selection, StreamDescriptor,
};
pub use error::YtDlError;

/// Result type alias for yt-dl operations
pub type Result<T> = std::result::Result<T, YtDlError>;
