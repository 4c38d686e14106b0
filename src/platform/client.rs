//! HTTP session used for every upstream request

use crate::error::YtDlError;
use crate::Result;
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{header, redirect, Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default upstream origin
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// User agent of the mobile client the player requests impersonate
pub const IOS_USER_AGENT: &str =
    "com.google.ios.youtube/19.45.4 (iPhone16,2; U; CPU iOS 18_1_0 like Mac OS X; US)";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum redirect hops followed per request
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
    /// Upstream origin, without trailing slash
    pub base_url: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            user_agent: IOS_USER_AGENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Request/response transport used by the resolvers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upstream origin all endpoints are built from
    fn base_url(&self) -> &str;

    /// GET a resource as raw bytes
    async fn get_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>>;

    /// GET a resource as text (lossy UTF-8)
    async fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let bytes = self.get_bytes(url, referer).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// POST a JSON body and return the response text
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        referer: Option<&str>,
    ) -> Result<String>;
}

/// reqwest-backed session holding the cookie jar, timeout and redirect cap.
///
/// API calls get a total deadline of `config.timeout`. Media responses use a
/// second client sharing the same cookie jar with only a connect deadline, so
/// long bodies are bounded by the downloader's idle timeout instead.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    media_client: Client,
    config: HttpClientConfig,
}

impl HttpSession {
    /// Create a session with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a session with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Self::client_builder(&config, jar.clone())
            .timeout(config.timeout)
            .build()?;
        let media_client = Self::client_builder(&config, jar).build()?;

        debug!(
            "HTTP session ready (timeout {:?}, max {} redirects)",
            config.timeout, config.max_redirects
        );

        Ok(Self {
            client,
            media_client,
            config,
        })
    }

    fn client_builder(config: &HttpClientConfig, jar: Arc<Jar>) -> ClientBuilder {
        ClientBuilder::new()
            .connect_timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .cookie_provider(jar)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .user_agent(config.user_agent.as_str())
    }

    /// Get configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn request(
        &self,
        client: &Client,
        method: reqwest::Method,
        url: &str,
        referer: Option<&str>,
    ) -> RequestBuilder {
        let referer = referer
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/", self.config.base_url));

        client
            .request(method, url)
            .header(header::ACCEPT, "*/*")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(header::ORIGIN, self.config.base_url.as_str())
            .header(header::REFERER, referer)
    }

    /// Open a media download, accepting full (200) and partial (206) responses.
    ///
    /// Only the wait for response headers is bounded here; reading the body
    /// is left to the caller.
    pub async fn get_media(&self, url: &str, referer: Option<&str>) -> Result<Response> {
        debug!("Opening media stream: {}", url);
        let pending = self
            .request(&self.media_client, reqwest::Method::GET, url, referer)
            .header(header::RANGE, "bytes=0-")
            .send();
        let response = tokio::time::timeout(self.config.timeout, pending)
            .await
            .map_err(|_| YtDlError::Timeout(url.to_string()))?
            .map_err(|e| YtDlError::from_reqwest(e, Some(url)))?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => Ok(response),
            status => Err(YtDlError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(YtDlError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpSession {
    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn get_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .request(&self.client, reqwest::Method::GET, url, referer)
            .send()
            .await
            .map_err(|e| YtDlError::from_reqwest(e, Some(url)))?;
        let response = ensure_success(response, url)?;
        let body = response
            .bytes()
            .await
            .map_err(|e| YtDlError::from_reqwest(e, Some(url)))?;
        Ok(body.to_vec())
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        referer: Option<&str>,
    ) -> Result<String> {
        debug!("POST {}", url);
        let response = self
            .request(&self.client, reqwest::Method::POST, url, referer)
            .json(body)
            .send()
            .await
            .map_err(|e| YtDlError::from_reqwest(e, Some(url)))?;
        let response = ensure_success(response, url)?;
        response
            .text()
            .await
            .map_err(|e| YtDlError::from_reqwest(e, Some(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;

    fn session_for(server: &mockito::Server) -> HttpSession {
        HttpSession::with_config(HttpClientConfig::default().with_base_url(server.url())).unwrap()
    }

    #[test]
    fn test_http_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.user_agent, IOS_USER_AGENT);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = HttpClientConfig::default().with_base_url("http://localhost:1234/");
        assert_eq!(config.base_url, "http://localhost:1234");
    }

    #[tokio::test]
    async fn test_get_text_sends_default_headers() {
        let mut server = mockito::Server::new_async().await;
        let referer = format!("{}/", server.url());
        let mock = server
            .mock("GET", "/iframe_api")
            .match_header("user-agent", IOS_USER_AGENT)
            .match_header("referer", referer.as_str())
            .with_status(200)
            .with_body("player/abcdef12/")
            .create_async()
            .await;

        let session = session_for(&server);
        let url = format!("{}/iframe_api", server.url());
        let body = session.get_text(&url, None).await.unwrap();

        assert_eq!(body, "player/abcdef12/");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_maps_to_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let session = session_for(&server);
        let url = format!("{}/missing", server.url());
        let err = session.get_bytes(&url, None).await.unwrap_err();

        match err {
            YtDlError::HttpError { status, url: failed } => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/youtubei/v1/player")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"videoId": "dQw4w9WgXcQ"})))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let session = session_for(&server);
        let url = format!("{}/youtubei/v1/player", server.url());
        let body = session
            .post_json(&url, &json!({"videoId": "dQw4w9WgXcQ"}), None)
            .await
            .unwrap();

        assert_eq!(body, r#"{"ok":true}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cookies_persist_across_requests() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sw.js_data")
            .with_status(200)
            .with_header("set-cookie", "VISITOR_INFO1_LIVE=abc123; Path=/")
            .with_body("ok")
            .create_async()
            .await;
        let second = server
            .mock("GET", "/watch")
            .match_header("cookie", "VISITOR_INFO1_LIVE=abc123")
            .with_status(200)
            .with_body("page")
            .create_async()
            .await;

        let session = session_for(&server);
        session
            .get_text(&format!("{}/sw.js_data", server.url()), None)
            .await
            .unwrap();
        let page = session
            .get_text(&format!("{}/watch", server.url()), None)
            .await
            .unwrap();

        assert_eq!(page, "page");
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirects_are_bounded() {
        let mut server = mockito::Server::new_async().await;
        let target = format!("{}/loop", server.url());
        server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", target.as_str())
            .expect_at_least(1)
            .create_async()
            .await;

        let config = HttpClientConfig::default()
            .with_base_url(server.url())
            .with_max_redirects(3);
        let session = HttpSession::with_config(config).unwrap();
        let err = session.get_bytes(&target, None).await.unwrap_err();

        assert!(err.is_transport_error());
    }

    #[tokio::test]
    async fn test_get_media_accepts_partial_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/videoplayback")
            .match_header("range", "bytes=0-")
            .with_status(206)
            .with_body("partial")
            .create_async()
            .await;
        server
            .mock("GET", "/forbidden")
            .with_status(403)
            .create_async()
            .await;

        let session = session_for(&server);
        let ok = session
            .get_media(&format!("{}/videoplayback", server.url()), None)
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::PARTIAL_CONTENT);

        let err = session
            .get_media(&format!("{}/forbidden", server.url()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, YtDlError::HttpError { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out_with_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/s/player/slow/base.js")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"var a=1;")?;
                std::thread::sleep(Duration::from_millis(1500));
                w.write_all(b"var b=2;")
            })
            .create_async()
            .await;

        let config = HttpClientConfig::default()
            .with_base_url(server.url())
            .with_timeout(Duration::from_millis(300));
        let session = HttpSession::with_config(config).unwrap();
        let url = format!("{}/s/player/slow/base.js", server.url());
        let err = session.get_bytes(&url, None).await.unwrap_err();

        match err {
            YtDlError::Timeout(target) => assert_eq!(target, url),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_media_requests_share_cookie_jar() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sw.js_data")
            .with_status(200)
            .with_header("set-cookie", "YSC=xyz; Path=/")
            .with_body("ok")
            .create_async()
            .await;
        let media = server
            .mock("GET", "/videoplayback")
            .match_header("cookie", "YSC=xyz")
            .with_status(200)
            .with_body("media")
            .create_async()
            .await;

        let session = session_for(&server);
        session
            .get_text(&format!("{}/sw.js_data", server.url()), None)
            .await
            .unwrap();
        let response = session
            .get_media(&format!("{}/videoplayback", server.url()), None)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        media.assert_async().await;
    }
}
