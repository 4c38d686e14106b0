//! Streaming media downloader

use crate::core::progress::Progress;
use crate::error::YtDlError;
use crate::platform::client::HttpSession;
use crate::Result;
use futures_util::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Progress callback, invoked after every written chunk
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Downloads one finalized stream URL to disk
#[derive(Clone)]
pub struct StreamDownloader {
    session: HttpSession,
    progress_callback: Option<ProgressCallback>,
}

/// Sibling path used while the download is in flight
pub(crate) fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    output_path.with_file_name(name)
}

impl StreamDownloader {
    pub fn new(session: HttpSession) -> Self {
        Self {
            session,
            progress_callback: None,
        }
    }

    /// Set progress callback
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Stream `url` into `output_path`, returning the number of bytes written.
    ///
    /// Data goes to a `.part` file first and is renamed into place on success;
    /// the partial file is removed on failure.
    pub async fn download(
        &self,
        url: &str,
        output_path: &Path,
        referer: Option<&str>,
        label: &str,
    ) -> Result<u64> {
        info!("Downloading {} to {}", label, output_path.display());

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = partial_path(output_path);
        match self.stream_to_file(url, &tmp_path, referer, label).await {
            Ok(written) => {
                tokio::fs::rename(&tmp_path, output_path).await?;
                info!("Download of {} completed: {} bytes", label, written);
                Ok(written)
            }
            Err(e) => {
                warn!("Download of {} failed: {}, cleaning up partial file", label, e);
                let _ = tokio::fs::remove_file(&tmp_path).await;
                Err(e)
            }
        }
    }

    /// Each chunk must arrive within the session timeout; total transfer
    /// time is unbounded.
    async fn stream_to_file(
        &self,
        url: &str,
        tmp_path: &Path,
        referer: Option<&str>,
        label: &str,
    ) -> Result<u64> {
        let idle_timeout = self.session.config().timeout;
        let response = self.session.get_media(url, referer).await?;
        let mut progress = Progress::new(label, response.content_length());
        let mut file = File::create(tmp_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        loop {
            let next = tokio::time::timeout(idle_timeout, stream.next())
                .await
                .map_err(|_| {
                    warn!("{}: no data for {:?}", label, idle_timeout);
                    YtDlError::Timeout(url.to_string())
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| YtDlError::from_reqwest(e, Some(url)))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            progress.update(downloaded);
            if let Some(callback) = &self.progress_callback {
                callback(&progress);
            }
        }

        file.flush().await?;
        file.sync_all().await?;

        if progress.total_size.is_some() && !progress.is_complete() {
            warn!("{}: body ended early ({})", label, progress.summary());
        } else {
            debug!("{}", progress.summary());
        }

        Ok(downloaded)
    }
}
