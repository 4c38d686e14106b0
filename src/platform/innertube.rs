//! Player response retrieval through the InnerTube API and the watch page

use crate::core::video_info::{MetadataDocument, StreamDescriptor};
use crate::error::YtDlError;
use crate::platform::client::Transport;
use crate::platform::lexer::extract_balanced;
use crate::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Anti-JSON-hijacking guard in front of `sw.js_data`
const XSSI_GUARD: &str = ")]}'";

/// Retrieval strategies, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Mobile native client
    Ios,
    /// TV embedded player client
    TvEmbedded,
    /// Scrape `ytInitialPlayerResponse` from the watch page
    WatchPage,
}

impl Strategy {
    pub const ORDER: [Strategy; 3] = [Strategy::Ios, Strategy::TvEmbedded, Strategy::WatchPage];

    fn needs_visitor_data(&self) -> bool {
        matches!(self, Strategy::Ios | Strategy::TvEmbedded)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Ios => write!(f, "IOS client"),
            Strategy::TvEmbedded => write!(f, "TV embedded client"),
            Strategy::WatchPage => write!(f, "watch page"),
        }
    }
}

/// Resolves a video id into a metadata document
pub struct PlayerResponseResolver {
    transport: Arc<dyn Transport>,
}

impl PlayerResponseResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Try each strategy until one yields a document with streams
    pub async fn resolve(&self, video_id: &str) -> Result<MetadataDocument> {
        info!("Fetching player response for video ID: {}", video_id);
        let mut visitor_data: Option<String> = None;

        for strategy in Strategy::ORDER {
            debug!("Trying {}", strategy);
            match self.attempt(strategy, video_id, &mut visitor_data).await {
                Ok(document) => {
                    info!(
                        "Player response from {}: \"{}\" ({} streams)",
                        strategy,
                        document.title,
                        document.stream_count()
                    );
                    return Ok(document);
                }
                Err(e) => warn!("{} failed: {}", strategy, e),
            }
        }

        Err(YtDlError::RetrievalFailed(video_id.to_string()))
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        video_id: &str,
        visitor_data: &mut Option<String>,
    ) -> Result<MetadataDocument> {
        if strategy.needs_visitor_data() && visitor_data.is_none() {
            *visitor_data = Some(self.fetch_visitor_data().await?);
        }
        let visitor = visitor_data.as_deref().unwrap_or_default();

        let response = match strategy {
            Strategy::Ios => self.post_player(ios_payload(video_id, visitor)).await?,
            Strategy::TvEmbedded => {
                let embed_url = self.transport.base_url().to_string();
                self.post_player(tv_payload(video_id, visitor, &embed_url))
                    .await?
            }
            Strategy::WatchPage => self.fetch_watch_page(video_id).await?,
        };

        response.into_document()
    }

    /// Fetch the visitor identifier from `sw.js_data`
    pub async fn fetch_visitor_data(&self) -> Result<String> {
        let url = format!("{}/sw.js_data", self.transport.base_url());
        let body = self.transport.get_text(&url, None).await?;
        parse_visitor_data(&body)
    }

    async fn post_player(&self, payload: Value) -> Result<PlayerResponse> {
        let url = format!("{}/youtubei/v1/player", self.transport.base_url());
        let body = self.transport.post_json(&url, &payload, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_watch_page(&self, video_id: &str) -> Result<PlayerResponse> {
        let url = format!("{}/watch?v={}&hl=en", self.transport.base_url(), video_id);
        let html = self.transport.get_text(&url, Some(&url)).await?;
        extract_initial_player_response(&html).ok_or_else(|| {
            YtDlError::RetrievalFailed(format!(
                "{}: ytInitialPlayerResponse not found (page layout changed?)",
                video_id
            ))
        })
    }
}

/// Parse `sw.js_data` and read the visitor identifier at `[0][2][0][0][13]`
pub fn parse_visitor_data(body: &str) -> Result<String> {
    let body = body.strip_prefix(XSSI_GUARD).unwrap_or(body);
    let value: Value = serde_json::from_str(body.trim_start())?;
    value[0][2][0][0][13]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| YtDlError::RetrievalFailed("visitor data missing".to_string()))
}

fn ios_payload(video_id: &str, visitor_data: &str) -> Value {
    json!({
        "videoId": video_id,
        "contentCheckOk": true,
        "context": {
            "client": {
                "clientName": "IOS",
                "clientVersion": "19.45.4",
                "deviceMake": "Apple",
                "deviceModel": "iPhone16,2",
                "platform": "MOBILE",
                "osName": "IOS",
                "osVersion": "18.1.0.22B83",
                "visitorData": visitor_data,
                "hl": "en",
                "gl": "US",
                "utcOffsetMinutes": 0
            }
        }
    })
}

fn tv_payload(video_id: &str, visitor_data: &str, embed_url: &str) -> Value {
    json!({
        "videoId": video_id,
        "context": {
            "client": {
                "clientName": "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
                "clientVersion": "2.0",
                "visitorData": visitor_data,
                "hl": "en",
                "gl": "US",
                "utcOffsetMinutes": 0
            },
            "thirdParty": {
                "embedUrl": embed_url
            }
        }
    })
}

/// Pull the `ytInitialPlayerResponse` object out of a watch page
pub fn extract_initial_player_response(html: &str) -> Option<PlayerResponse> {
    let anchor = Regex::new(r"ytInitialPlayerResponse\s*=\s*").ok()?;

    let found = anchor.find_iter(html).find_map(|m| {
        let object = extract_balanced(html, m.end())?;
        match serde_json::from_str(object) {
            Ok(response) => Some(response),
            Err(e) => {
                debug!("Skipping unparsable player response candidate: {}", e);
                None
            }
        }
    });
    found
}

/// Player response document as served by the platform
#[derive(Debug, Default, Deserialize)]
pub struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(rename = "videoDetails")]
    pub video_details: Option<VideoDetails>,
    #[serde(rename = "streamingData")]
    pub streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoDetails {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "lengthSeconds")]
    pub length_seconds: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamingData {
    #[serde(rename = "expiresInSeconds")]
    pub expires_in_seconds: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatData>,
    #[serde(rename = "adaptiveFormats", default)]
    pub adaptive_formats: Vec<FormatData>,
}

#[derive(Debug, Deserialize)]
pub struct FormatData {
    pub itag: u32,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    pub bitrate: Option<u64>,
    #[serde(rename = "averageBitrate")]
    pub average_bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "qualityLabel")]
    pub quality_label: Option<String>,
    #[serde(rename = "contentLength")]
    pub content_length: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "signatureCipher")]
    pub signature_cipher: Option<String>,
    #[serde(rename = "approxDurationMs")]
    pub approx_duration_ms: Option<String>,
}

impl From<FormatData> for StreamDescriptor {
    fn from(data: FormatData) -> Self {
        Self {
            itag: data.itag,
            mime_type: data.mime_type,
            bitrate: data.bitrate,
            average_bitrate: data.average_bitrate,
            width: data.width,
            height: data.height,
            quality_label: data.quality_label,
            content_length: data.content_length.and_then(|s| s.parse().ok()),
            url: data.url,
            signature_cipher: data.signature_cipher,
            approx_duration_ms: data.approx_duration_ms.and_then(|s| s.parse().ok()),
        }
    }
}

impl PlayerResponse {
    /// Structurally valid responses carry video details with a non-empty id
    pub fn is_valid(&self) -> bool {
        self.video_details
            .as_ref()
            .is_some_and(|d| !d.video_id.is_empty())
    }

    /// Convert into a metadata document, rejecting documents without streams
    pub fn into_document(self) -> Result<MetadataDocument> {
        if let Some(status) = &self.playability_status {
            if status.status != "OK" {
                debug!(
                    "Playability status {}: {}",
                    status.status,
                    status.reason.as_deref().unwrap_or("no reason given")
                );
            }
        }

        let valid = self.is_valid();
        let details = match self.video_details {
            Some(details) if valid => details,
            _ => {
                return Err(YtDlError::RetrievalFailed(
                    "response has no video details".to_string(),
                ))
            }
        };

        let mut document = MetadataDocument::new(details.video_id, details.title);
        document.author = details.author;
        document.duration = details
            .length_seconds
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        document.view_count = details.view_count.and_then(|s| s.parse().ok());

        if let Some(streaming) = self.streaming_data {
            document.expires_in_seconds =
                streaming.expires_in_seconds.and_then(|s| s.parse().ok());
            document.muxed = streaming
                .formats
                .into_iter()
                .map(StreamDescriptor::from)
                .collect();
            for stream in streaming.adaptive_formats.into_iter().map(StreamDescriptor::from) {
                if stream.is_audio() {
                    document.audio_only.push(stream);
                } else {
                    document.video_only.push(stream);
                }
            }
        }

        if !document.has_streams() {
            return Err(YtDlError::RetrievalFailed(format!(
                "{}: response has no streams",
                document.video_id
            )));
        }

        Ok(document)
    }
}
