//! Data model, progress tracking and the download orchestrator

pub mod downloader;
pub mod progress;
pub mod video_info;

pub use downloader::{DownloadOptions, Downloader, ResolvedDownload};
pub use progress::Progress;
pub use video_info::{
    Container, DownloadPreference, MetadataDocument, Quality, ResolvedStreamSet, Selection,
    StreamDescriptor,
};
