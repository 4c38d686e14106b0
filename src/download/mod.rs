//! Media transfer and muxing

pub mod downloader;
pub mod mux;

pub use downloader::{ProgressCallback, StreamDownloader};
pub use mux::Muxer;
