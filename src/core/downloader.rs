//! Main downloader implementation

use crate::core::progress::Progress;
use crate::core::video_info::{DownloadPreference, ResolvedStreamSet, Selection};
use crate::download::downloader::{partial_path, StreamDownloader};
use crate::download::mux::Muxer;
use crate::error::YtDlError;
use crate::platform::client::{HttpClientConfig, HttpSession, Transport};
use crate::platform::formats;
use crate::platform::innertube::PlayerResponseResolver;
use crate::platform::resolver::UrlResolver;
use crate::utils::filename::{output_file_name, temp_stream_paths};
use crate::utils::url::{parse_video_id, watch_url};
use crate::Result;
use futures_util::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Main downloader configuration
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Output path (file or directory), used when `download` gets none
    pub output_path: Option<PathBuf>,
    /// Whether callers should render progress
    pub progress: bool,
    /// HTTP session settings
    pub http: HttpClientConfig,
    /// ffmpeg executable used to mux adaptive downloads
    pub ffmpeg: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            progress: true,
            http: HttpClientConfig::default(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl DownloadOptions {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_http_config(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_ffmpeg(mut self, program: impl Into<String>) -> Self {
        self.ffmpeg = program.into();
        self
    }
}

/// Selected streams together with their fetchable URLs
#[derive(Debug, Clone)]
pub struct ResolvedDownload {
    pub set: ResolvedStreamSet,
    /// Finalized URLs in download order (video before audio)
    pub urls: Vec<String>,
}

/// Resolves identifiers into streams and writes them to disk.
///
/// One `Downloader` is one session: the cookie jar is shared by every call
/// made through it. The player script is fetched afresh by each `resolve`
/// and shared only by that call's finalizations.
pub struct Downloader {
    options: DownloadOptions,
    transport: Arc<dyn Transport>,
    players: PlayerResponseResolver,
    media: StreamDownloader,
    muxer: Muxer,
}

impl Downloader {
    /// Create a downloader with default options
    pub fn new() -> Result<Self> {
        Self::with_options(DownloadOptions::default())
    }

    /// Create a downloader whose resolution and media requests share one session
    pub fn with_options(options: DownloadOptions) -> Result<Self> {
        let session = HttpSession::with_config(options.http.clone())?;
        let transport: Arc<dyn Transport> = Arc::new(session.clone());
        Ok(Self::from_parts(options, transport, session))
    }

    /// Create a downloader resolving through `transport`; media still goes
    /// through a session built from `options.http`
    pub fn with_transport(options: DownloadOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        let session = HttpSession::with_config(options.http.clone())?;
        Ok(Self::from_parts(options, transport, session))
    }

    fn from_parts(options: DownloadOptions, transport: Arc<dyn Transport>, session: HttpSession) -> Self {
        Self {
            players: PlayerResponseResolver::new(transport.clone()),
            media: StreamDownloader::new(session),
            muxer: Muxer::new().with_program(options.ffmpeg.as_str()),
            transport,
            options,
        }
    }

    /// Set progress callback
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.media = self.media.with_progress_callback(callback);
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Resolve `input` to a stream set and finalized URLs without downloading
    pub async fn resolve(
        &self,
        input: &str,
        preference: &DownloadPreference,
    ) -> Result<ResolvedDownload> {
        let video_id = parse_video_id(input)?;
        info!("Resolving video {}", video_id);

        let document = self.players.resolve(&video_id).await?;
        debug!(
            "'{}' by {} ({}s, {} streams)",
            document.title,
            document.author,
            document.duration,
            document.stream_count()
        );

        let set = formats::select(&document, preference)?;
        let resolver = UrlResolver::new(self.transport.clone());
        let urls = try_join_all(set.streams().into_iter().map(|s| resolver.finalize(s))).await?;
        info!(
            "Resolved {} stream(s) for '{}' as {}",
            urls.len(),
            set.title,
            set.container
        );

        Ok(ResolvedDownload { set, urls })
    }

    /// Resolve and download `input`, returning the written file.
    ///
    /// `output` may be a file or an existing directory; when absent the
    /// configured output path or the current directory is used.
    pub async fn download(
        &self,
        input: &str,
        output: Option<&Path>,
        preference: &DownloadPreference,
    ) -> Result<PathBuf> {
        let resolved = self.resolve(input, preference).await?;
        self.download_resolved(&resolved, output).await
    }

    /// Download streams returned by [`Downloader::resolve`]
    pub async fn download_resolved(
        &self,
        resolved: &ResolvedDownload,
        output: Option<&Path>,
    ) -> Result<PathBuf> {
        let set = &resolved.set;
        let output_path = self.output_path(set, output);
        let referer = watch_url(self.transport.base_url(), &set.video_id);
        info!("Starting download for: {}", set.title);

        match (&set.selection, resolved.urls.as_slice()) {
            (Selection::Adaptive { .. }, [video_url, audio_url]) => {
                self.download_adaptive(set, video_url, audio_url, &referer, &output_path)
                    .await?;
            }
            (Selection::Muxed(_) | Selection::AudioOnly(_) | Selection::VideoOnly(_), [url]) => {
                let label = if set.is_audio_only() { "audio" } else { "video" };
                self.media
                    .download(url, &output_path, Some(&referer), label)
                    .await?;
            }
            (_, urls) => {
                return Err(YtDlError::NoSuitableStream(format!(
                    "selection resolved to {} urls",
                    urls.len()
                )))
            }
        }

        info!("Saved {}", output_path.display());
        Ok(output_path)
    }

    async fn download_adaptive(
        &self,
        set: &ResolvedStreamSet,
        video_url: &str,
        audio_url: &str,
        referer: &str,
        output_path: &Path,
    ) -> Result<()> {
        let dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(dir).await?;
        let (video_tmp, audio_tmp) = temp_stream_paths(dir, &set.video_id, set.container);

        let result = async {
            tokio::try_join!(
                self.media.download(video_url, &video_tmp, Some(referer), "video"),
                self.media.download(audio_url, &audio_tmp, Some(referer), "audio"),
            )?;
            self.muxer.mux(&video_tmp, &audio_tmp, output_path).await
        }
        .await;

        // a failed join drops the other half mid-stream
        for path in [&video_tmp, &audio_tmp] {
            let _ = tokio::fs::remove_file(path).await;
            let _ = tokio::fs::remove_file(partial_path(path)).await;
        }

        result
    }

    /// Determine output path for downloaded file
    fn output_path(&self, set: &ResolvedStreamSet, output: Option<&Path>) -> PathBuf {
        let file_name = output_file_name(set);
        match output.or(self.options.output_path.as_deref()) {
            Some(path) if path.is_dir() => path.join(file_name),
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(file_name),
        }
    }
}
