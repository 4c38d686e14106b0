//! Output file naming

use crate::core::video_info::{Container, ResolvedStreamSet};
use std::path::{Path, PathBuf};

/// Longest title kept in a generated file name, in characters
pub const MAX_TITLE_CHARS: usize = 100;

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_ascii_control()
}

/// Strip characters that are invalid in file names, trim, and cap the length
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title.chars().filter(|c| !is_forbidden(*c)).collect();
    let capped: String = cleaned.trim().chars().take(MAX_TITLE_CHARS).collect();
    let capped = capped.trim_end();

    if capped.is_empty() {
        "video".to_string()
    } else {
        capped.to_string()
    }
}

/// `<sanitized title>.<ext>` for a resolved stream set
pub fn output_file_name(set: &ResolvedStreamSet) -> String {
    format!("{}.{}", sanitize_title(&set.title), set.output_extension())
}

/// Temporary paths for the video and audio halves of an adaptive download
pub fn temp_stream_paths(dir: &Path, video_id: &str, container: Container) -> (PathBuf, PathBuf) {
    let audio_ext = if container == Container::Webm {
        "webm"
    } else {
        "m4a"
    };
    (
        dir.join(format!(".tmp_{}_v.{}", video_id, container)),
        dir.join(format!(".tmp_{}_a.{}", video_id, audio_ext)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video_info::{Selection, StreamDescriptor};

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Hello: World?"), "Hello World");
        assert_eq!(sanitize_title("  a/b\\c|d*e<f>\"g  "), "abcdefg");
        assert_eq!(sanitize_title("tab\there"), "tabhere");
        assert_eq!(sanitize_title("???"), "video");
    }

    #[test]
    fn test_sanitize_title_caps_length() {
        let long = "é".repeat(150);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_output_file_name() {
        let set = ResolvedStreamSet {
            selection: Selection::AudioOnly(StreamDescriptor::new(140, "audio/mp4")),
            container: Container::Mp4,
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "Never Gonna Give You Up".to_string(),
        };
        assert_eq!(output_file_name(&set), "Never Gonna Give You Up.m4a");

        let set = ResolvedStreamSet {
            selection: Selection::Muxed(StreamDescriptor::new(43, "video/webm")),
            container: Container::Webm,
            ..set
        };
        assert_eq!(output_file_name(&set), "Never Gonna Give You Up.webm");
    }

    #[test]
    fn test_temp_stream_paths() {
        let (v, a) = temp_stream_paths(Path::new("/out"), "abc", Container::Mp4);
        assert_eq!(v, PathBuf::from("/out/.tmp_abc_v.mp4"));
        assert_eq!(a, PathBuf::from("/out/.tmp_abc_a.m4a"));

        let (v, a) = temp_stream_paths(Path::new("/out"), "abc", Container::Webm);
        assert_eq!(v, PathBuf::from("/out/.tmp_abc_v.webm"));
        assert_eq!(a, PathBuf::from("/out/.tmp_abc_a.webm"));
    }
}
