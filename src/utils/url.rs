//! URL utilities for extracting video IDs and building page URLs

use crate::error::YtDlError;
use crate::Result;
use regex::Regex;
use url::Url;

const ID_CHARS: &str = "[a-zA-Z0-9_-]{11}";

fn capture(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check for the 11-character video id shape
pub fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `/shorts/<id>`, `/embed/<id>` and `/live/<id>` paths on youtube.com
fn id_from_path(input: &str) -> Option<String> {
    let parsed = Url::parse(input).ok()?;
    let host = parsed.host_str()?;
    if host != "youtube.com" && !host.ends_with(".youtube.com") {
        return None;
    }

    let mut segments = parsed.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("shorts" | "embed" | "live"), Some(id)) if is_video_id(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Extract the video id from a raw id, a watch URL, a short link or a shorts URL.
///
/// Backslash escapes left over from shell quoting (`watch\?v\=...`) are
/// removed before matching.
pub fn parse_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    let unescaped = Regex::new(r"\\(.)")
        .map(|re| re.replace_all(input, "$1").into_owned())
        .unwrap_or_else(|_| input.to_string());

    if let Some(id) = capture(&format!("[?&]v=({})", ID_CHARS), &unescaped) {
        return Ok(id);
    }
    if is_video_id(input) {
        return Ok(input.to_string());
    }
    if let Some(id) = capture(&format!(r"youtu\.be/({})", ID_CHARS), &unescaped) {
        return Ok(id);
    }
    if let Some(id) = id_from_path(&unescaped) {
        return Ok(id);
    }

    Err(YtDlError::InvalidIdentifier(input.to_string()))
}

/// Watch page URL, used as the referer for media requests
pub fn watch_url(base_url: &str, video_id: &str) -> String {
    format!("{}/watch?v={}", base_url.trim_end_matches('/'), video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id() {
        assert_eq!(
            parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            parse_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            parse_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(parse_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
        assert_eq!(parse_video_id("  dQw4w9WgXcQ\n").unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_parse_shell_escaped() {
        assert_eq!(
            parse_video_id(r"https://www.youtube.com/watch\?v\=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            parse_video_id(r"https://youtu.be\/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_parse_path_forms() {
        assert_eq!(
            parse_video_id("https://www.youtube.com/shorts/brZCOVlyPPo").unwrap(),
            "brZCOVlyPPo"
        );
        assert_eq!(
            parse_video_id("https://m.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert!(parse_video_id("https://example.com/shorts/brZCOVlyPPo").is_err());
    }

    #[test]
    fn test_invalid_identifiers() {
        for input in [
            "",
            "short",
            "dQw4w9WgXcQ1",
            "https://www.youtube.com/watch",
            "https://example.com",
            "https://www.youtube.com/watch?v=tooShort",
        ] {
            assert!(
                matches!(parse_video_id(input), Err(YtDlError::InvalidIdentifier(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            watch_url("https://www.youtube.com/", "dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
