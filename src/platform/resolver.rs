//! Stream URL finalization (signature and "n" deciphering)

use crate::core::video_info::StreamDescriptor;
use crate::error::YtDlError;
use crate::platform::cipher::DecipherProgram;
use crate::platform::client::Transport;
use crate::platform::script::ScriptAnalyzer;
use crate::Result;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

const PLAYER_VERSION_PATTERN: &str = r"player\\?/([0-9a-fA-F]{8})\\?/";

/// Player script fetched for one resolution call, with derived programs
#[derive(Debug, Clone)]
pub struct PlayerScript {
    pub version: String,
    signature: Option<DecipherProgram>,
    n_transform: Option<DecipherProgram>,
}

impl PlayerScript {
    /// Analyze the script source once
    pub fn analyze(version: impl Into<String>, source: &str) -> Self {
        let programs = ScriptAnalyzer::new(source).extract_programs();

        Self {
            version: version.into(),
            signature: programs.signature,
            n_transform: programs.n_transform,
        }
    }

    pub fn signature_program(&self) -> Option<&DecipherProgram> {
        self.signature.as_ref()
    }

    pub fn n_program(&self) -> Option<&DecipherProgram> {
        self.n_transform.as_ref()
    }
}

/// Extract the 8-hex-digit player version from the `iframe_api` bootstrap
pub fn parse_player_version(bootstrap: &str) -> Option<String> {
    let re = Regex::new(PLAYER_VERSION_PATTERN).ok()?;
    re.captures(bootstrap)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Value of the first `key` query parameter
fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Replace the first `key` parameter in place (dropping duplicates) or append it
fn set_query_param(url: &mut Url, key: &str, value: &str) {
    if query_param(url, key).is_none() {
        url.query_pairs_mut().append_pair(key, value);
        return;
    }

    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k != key {
                Some((k.into_owned(), v.into_owned()))
            } else if !replaced {
                replaced = true;
                Some((k.into_owned(), value.to_string()))
            } else {
                None
            }
        })
        .collect();

    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// Turns stream descriptors into fetchable URLs.
///
/// The player script is fetched at most once per resolver, even when several
/// streams are finalized concurrently. Create one resolver per resolution
/// call so that a rotated upstream player is picked up by the next call.
pub struct UrlResolver {
    transport: Arc<dyn Transport>,
    script: OnceCell<PlayerScript>,
}

impl UrlResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            script: OnceCell::new(),
        }
    }

    /// Fetch (or reuse) this resolver's player script
    pub async fn player_script(&self) -> Result<&PlayerScript> {
        self.script.get_or_try_init(|| self.load_script()).await
    }

    async fn load_script(&self) -> Result<PlayerScript> {
        let base = self.transport.base_url();
        let bootstrap = self
            .transport
            .get_text(&format!("{}/iframe_api", base), None)
            .await
            .map_err(|e| YtDlError::ScriptUnavailable(format!("iframe_api: {}", e)))?;

        let version = parse_player_version(&bootstrap).ok_or_else(|| {
            YtDlError::ScriptUnavailable("player version not found".to_string())
        })?;

        let script_url = format!(
            "{}/s/player/{}/player_ias.vflset/en_US/base.js",
            base, version
        );
        info!("Fetching player script {}", version);
        let source = self
            .transport
            .get_text(&script_url, None)
            .await
            .map_err(|e| YtDlError::ScriptUnavailable(format!("{}: {}", script_url, e)))?;

        let script = PlayerScript::analyze(version, &source);
        debug!(
            "Player script analyzed (signature: {}, n: {})",
            script.signature.is_some(),
            script.n_transform.is_some()
        );
        Ok(script)
    }

    /// Produce a fetchable URL for `stream`
    pub async fn finalize(&self, stream: &StreamDescriptor) -> Result<String> {
        if let Some(direct) = &stream.url {
            let mut url = match Url::parse(direct) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Unparsable stream url for itag {}: {}", stream.itag, e);
                    return Ok(direct.clone());
                }
            };
            self.rewrite_n(&mut url).await;
            set_query_param(&mut url, "ratebypass", "yes");
            return Ok(url.into());
        }

        let cipher = stream
            .signature_cipher
            .as_deref()
            .ok_or(YtDlError::MissingStreamUrl(stream.itag))?;
        self.decipher(stream.itag, cipher).await
    }

    async fn decipher(&self, itag: u32, cipher: &str) -> Result<String> {
        let mut signature = None;
        let mut base = None;
        let mut target = "sig".to_string();
        for (key, value) in url::form_urlencoded::parse(cipher.as_bytes()) {
            match key.as_ref() {
                "s" if !value.is_empty() => signature = Some(value.into_owned()),
                "url" if !value.is_empty() => base = Some(value.into_owned()),
                "sp" if !value.is_empty() => target = value.into_owned(),
                _ => {}
            }
        }
        let (Some(signature), Some(base)) = (signature, base) else {
            return Err(YtDlError::MissingStreamUrl(itag));
        };

        let script = self.player_script().await?;
        let program = script
            .signature_program()
            .ok_or(YtDlError::DecipherUnavailable)?;

        let mut url = Url::parse(&base)?;
        set_query_param(&mut url, &target, &program.apply(&signature));
        debug!("Deciphered signature for itag {} into '{}'", itag, target);

        self.rewrite_n(&mut url).await;
        set_query_param(&mut url, "ratebypass", "yes");
        Ok(url.into())
    }

    /// Best-effort "n" rewrite; failures leave the parameter untouched
    async fn rewrite_n(&self, url: &mut Url) {
        let Some(n) = query_param(url, "n") else {
            return;
        };

        let script = match self.player_script().await {
            Ok(script) => script,
            Err(e) => {
                warn!("Keeping n parameter as is: {}", e);
                return;
            }
        };

        match script.n_program() {
            Some(program) => {
                let decoded = program.apply(&n);
                debug!("Rewrote n parameter {} -> {}", n, decoded);
                set_query_param(url, "n", &decoded);
            }
            None => warn!("n transform not found in player {}", script.version),
        }
    }
}
