//! In-memory transport and canned documents for tests

use crate::error::YtDlError;
use crate::platform::client::Transport;
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const FAKE_BASE_URL: &str = "https://yt.test";
pub const PLAYER_VERSION: &str = "1a2b3c4d";

/// Synthetic player script.
///
/// Signature program: `[Reverse, Slice(2), Swap(3)]` ("abcdef" -> "acbd").
/// "n" program (`Nf`): `[Slice(1), Reverse]` ("xyz123" -> "321zy").
pub const PLAYER_JS: &str = r#"var _yt_player={};(function(g){var window=this;
var Xy={ab:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
cd:function(a){a.reverse()},ef:function(a,b){a.splice(0,b)}};
var cfg={signatureTimestamp:19834};
Kq=function(a){a=a.split("");Xy.cd(a,7);Xy.ef(a,2);Xy.ab(a,3);return a.join("")};
var Zp={Qa:function(a){a.reverse()},Rb:function(a,b){a.splice(0,b)}};
Nf=function(a){a=a.split("");Zp.Rb(a,1);Zp.Qa(a,0);return a.join("")};
g.url=function(a,b,c){(b=a.get("n"))&&(b=Nf(b),a.set("n",b))};
})(_yt_player);"#;

pub fn iframe_api_body(version: &str) -> String {
    format!(
        "var scriptUrl = 'https:\\/\\/www.youtube.com\\/s\\/player\\/{}\\/www-widgetapi.vflset\\/www-widgetapi.js';",
        version
    )
}

pub fn script_path(version: &str) -> String {
    format!("/s/player/{}/player_ias.vflset/en_US/base.js", version)
}

/// Player response with one muxed, one video-only and one audio-only stream
pub fn player_response_json(video_id: &str) -> Value {
    json!({
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {
            "videoId": video_id,
            "title": "Never Gonna Give You Up",
            "author": "Rick Astley",
            "lengthSeconds": "213",
            "viewCount": "1500000000"
        },
        "streamingData": {
            "expiresInSeconds": "21540",
            "formats": [{
                "itag": 18,
                "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                "bitrate": 503000,
                "width": 640,
                "height": 360,
                "qualityLabel": "360p",
                "contentLength": "8000000",
                "approxDurationMs": "212091",
                "url": "https://rr1.googlevideo.test/videoplayback?itag=18&n=xyz123"
            }],
            "adaptiveFormats": [
                {
                    "itag": 137,
                    "mimeType": "video/mp4; codecs=\"avc1.640028\"",
                    "bitrate": 4000000,
                    "qualityLabel": "1080p",
                    "signatureCipher": "s=abcdef&sp=sig&url=https%3A%2F%2Frr1.googlevideo.test%2Fvideoplayback%3Fitag%3D137"
                },
                {
                    "itag": 140,
                    "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                    "bitrate": 130000,
                    "averageBitrate": 129000,
                    "url": "https://rr1.googlevideo.test/videoplayback?itag=140"
                }
            ]
        }
    })
}

#[derive(Default)]
struct Inner {
    gets: Mutex<HashMap<String, String>>,
    players: Mutex<HashMap<String, Value>>,
    hits: Mutex<HashMap<String, usize>>,
    posts: AtomicUsize,
}

/// Transport answering from canned responses keyed by path
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Inner>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for GET `path` (path includes the query string)
    pub fn with_get(self, path: &str, body: &str) -> Self {
        self.inner
            .gets
            .lock()
            .unwrap()
            .insert(path.to_string(), body.to_string());
        self
    }

    pub fn with_visitor_data(self, visitor: &str) -> Self {
        let body = format!(
            ")]}}'\n{}",
            json!([[null, null, [[["", "", "", "", "", "", "", "", "", "", "", "", "", visitor]]]]])
        );
        self.with_get("/sw.js_data", &body)
    }

    /// Answer player POSTs made with `client_name`
    pub fn with_player(self, client_name: &str, response: Value) -> Self {
        self.inner
            .players
            .lock()
            .unwrap()
            .insert(client_name.to_string(), response);
        self
    }

    /// Serve the bootstrap document and the player script
    pub fn with_script(self, js: &str) -> Self {
        self.with_get("/iframe_api", &iframe_api_body(PLAYER_VERSION))
            .with_get(&script_path(PLAYER_VERSION), js)
    }

    /// Number of GET requests made for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.inner
            .hits
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn post_count(&self) -> usize {
        self.inner.posts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn base_url(&self) -> &str {
        FAKE_BASE_URL
    }

    async fn get_bytes(&self, url: &str, _referer: Option<&str>) -> Result<Vec<u8>> {
        let path = url.strip_prefix(FAKE_BASE_URL).unwrap_or(url);
        *self
            .inner
            .hits
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default() += 1;

        self.inner
            .gets
            .lock()
            .unwrap()
            .get(path)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| YtDlError::HttpError {
                status: 404,
                url: url.to_string(),
            })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        _referer: Option<&str>,
    ) -> Result<String> {
        self.inner.posts.fetch_add(1, Ordering::SeqCst);
        let client = body["context"]["client"]["clientName"]
            .as_str()
            .unwrap_or_default();

        self.inner
            .players
            .lock()
            .unwrap()
            .get(client)
            .map(|response| response.to_string())
            .ok_or_else(|| YtDlError::HttpError {
                status: 400,
                url: url.to_string(),
            })
    }
}
