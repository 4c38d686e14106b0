//! Video metadata and stream structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One encoded media variant offered by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Platform format ID (itag)
    pub itag: u32,
    /// MIME type including codecs, e.g. `video/mp4; codecs="avc1.42001E, mp4a.40.2"`
    pub mime_type: String,
    /// Peak bitrate in bits per second
    pub bitrate: Option<u64>,
    /// Average bitrate in bits per second
    pub average_bitrate: Option<u64>,
    /// Video width
    pub width: Option<u32>,
    /// Video height
    pub height: Option<u32>,
    /// Quality label (e.g., "720p", "1080p")
    pub quality_label: Option<String>,
    /// File size in bytes (if known)
    pub content_length: Option<u64>,
    /// Direct download URL
    pub url: Option<String>,
    /// Signature cipher payload (if encrypted)
    pub signature_cipher: Option<String>,
    /// Approximate duration in milliseconds
    pub approx_duration_ms: Option<u64>,
}

impl StreamDescriptor {
    /// Create a new descriptor with only the mandatory fields set
    pub fn new(itag: u32, mime_type: impl Into<String>) -> Self {
        Self {
            itag,
            mime_type: mime_type.into(),
            bitrate: None,
            average_bitrate: None,
            width: None,
            height: None,
            quality_label: None,
            content_length: None,
            url: None,
            signature_cipher: None,
            approx_duration_ms: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_signature_cipher(mut self, cipher: impl Into<String>) -> Self {
        self.signature_cipher = Some(cipher.into());
        self
    }

    pub fn with_quality_label(mut self, label: impl Into<String>) -> Self {
        self.quality_label = Some(label.into());
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    /// A stream is resolvable when it carries a direct URL or a cipher payload
    pub fn is_resolvable(&self) -> bool {
        self.url.is_some() || self.signature_cipher.is_some()
    }

    /// Check if MIME type is in the video category
    pub fn is_video(&self) -> bool {
        self.mime_type.contains("video/")
    }

    /// Check if MIME type is in the audio category
    pub fn is_audio(&self) -> bool {
        self.mime_type.contains("audio/")
    }

    /// Check if the stream is carried in a webm container
    pub fn is_webm(&self) -> bool {
        self.mime_type.contains("webm")
    }

    /// Check if MIME type mentions the given container
    pub fn matches_container(&self, container: Container) -> bool {
        self.mime_type.contains(container.as_str())
    }

    /// Average bitrate, falling back to peak bitrate
    pub fn effective_bitrate(&self) -> u64 {
        self.average_bitrate.or(self.bitrate).unwrap_or(0)
    }

    /// Get human-readable quality string
    pub fn quality_string(&self) -> String {
        if let Some(label) = &self.quality_label {
            label.clone()
        } else if let (Some(width), Some(height)) = (self.width, self.height) {
            format!("{}x{}", width, height)
        } else {
            "Unknown".to_string()
        }
    }
}

/// Result of a successful player response retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Video ID
    pub video_id: String,
    /// Video title
    pub title: String,
    /// Video author/channel name
    pub author: String,
    /// Video duration in seconds
    pub duration: u32,
    /// Video view count
    pub view_count: Option<u64>,
    /// Seconds until stream URLs go stale
    pub expires_in_seconds: Option<u64>,
    /// Muxed (audio+video) streams
    pub muxed: Vec<StreamDescriptor>,
    /// Adaptive video-only streams
    pub video_only: Vec<StreamDescriptor>,
    /// Adaptive audio-only streams
    pub audio_only: Vec<StreamDescriptor>,
}

impl MetadataDocument {
    /// Create an empty document
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            author: String::new(),
            duration: 0,
            view_count: None,
            expires_in_seconds: None,
            muxed: Vec::new(),
            video_only: Vec::new(),
            audio_only: Vec::new(),
        }
    }

    /// Valid documents carry at least one stream
    pub fn has_streams(&self) -> bool {
        !self.muxed.is_empty() || !self.video_only.is_empty() || !self.audio_only.is_empty()
    }

    /// Total number of streams across all lists
    pub fn stream_count(&self) -> usize {
        self.muxed.len() + self.video_only.len() + self.audio_only.len()
    }
}

/// Output container preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Webm,
    Mp3,
    Ogg,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
            Container::Mp3 => "mp3",
            Container::Ogg => "ogg",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Ok(Container::Mp4),
            "webm" => Ok(Container::Webm),
            "mp3" => Ok(Container::Mp3),
            "ogg" => Ok(Container::Ogg),
            other => Err(format!("Unknown container: {}", other)),
        }
    }
}

/// Quality preference, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Lowest,
    Low,
    Medium,
    High,
    #[default]
    Highest,
}

impl Quality {
    /// Target position on the quality-label scale
    pub fn target_rank(&self) -> usize {
        match self {
            Quality::Lowest => 0,
            Quality::Low => 1,
            Quality::Medium => 2,
            Quality::High => 3,
            // Larger than any real rank so the maximum available always wins
            Quality::Highest => 999,
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lowest" => Ok(Quality::Lowest),
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            "highest" => Ok(Quality::Highest),
            other => Err(format!("Unknown quality: {}", other)),
        }
    }
}

/// Caller's stream preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DownloadPreference {
    pub container: Container,
    pub audio_only: bool,
    pub quality: Quality,
}

impl DownloadPreference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

/// Streams chosen for one download
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Single stream with audio and video
    Muxed(StreamDescriptor),
    /// Single audio-only stream
    AudioOnly(StreamDescriptor),
    /// Single video-only stream
    VideoOnly(StreamDescriptor),
    /// Separate halves that must be muxed after download
    Adaptive {
        video: StreamDescriptor,
        audio: StreamDescriptor,
    },
}

/// Output of stream selection
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStreamSet {
    pub selection: Selection,
    pub container: Container,
    pub video_id: String,
    pub title: String,
}

impl ResolvedStreamSet {
    pub fn is_audio_only(&self) -> bool {
        matches!(self.selection, Selection::AudioOnly(_))
    }

    pub fn needs_mux(&self) -> bool {
        matches!(self.selection, Selection::Adaptive { .. })
    }

    /// Streams in download order (video before audio)
    pub fn streams(&self) -> Vec<&StreamDescriptor> {
        match &self.selection {
            Selection::Muxed(s) | Selection::AudioOnly(s) | Selection::VideoOnly(s) => vec![s],
            Selection::Adaptive { video, audio } => vec![video, audio],
        }
    }

    /// File extension for the final output
    pub fn output_extension(&self) -> &'static str {
        if self.is_audio_only() && self.container == Container::Mp4 {
            "m4a"
        } else {
            self.container.as_str()
        }
    }
}
