//! Combining adaptive video and audio files with ffmpeg

use crate::error::YtDlError;
use crate::Result;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Stream-copy muxer backed by an external ffmpeg binary
#[derive(Debug, Clone)]
pub struct Muxer {
    program: String,
}

impl Muxer {
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }

    /// Use a different ffmpeg executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run `ffmpeg -y -i video -i audio -c copy output`
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        info!("Muxing into {}", output.display());
        debug!(
            "{} -y -i {} -i {} -c copy {}",
            self.program,
            video.display(),
            audio.display(),
            output.display()
        );

        let result = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c", "copy"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| YtDlError::MuxFailed(format!("cannot run {}: {}", self.program, e)))?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let tail = stderr.lines().last().unwrap_or_default().trim();
        Err(YtDlError::MuxFailed(match result.status.code() {
            Some(code) if tail.is_empty() => format!("exited with code {}", code),
            Some(code) => format!("exited with code {}: {}", code, tail),
            None => "terminated by signal".to_string(),
        }))
    }
}

impl Default for Muxer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program() {
        let muxer = Muxer::new().with_program("definitely-not-ffmpeg-1234");
        let err = muxer
            .mux(Path::new("v.mp4"), Path::new("a.m4a"), Path::new("out.mp4"))
            .await
            .unwrap_err();
        match err {
            YtDlError::MuxFailed(msg) => assert!(msg.contains("cannot run")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let muxer = Muxer::new().with_program("false");
        let err = muxer
            .mux(Path::new("v.mp4"), Path::new("a.m4a"), Path::new("out.mp4"))
            .await
            .unwrap_err();
        match err {
            YtDlError::MuxFailed(msg) => assert!(msg.contains("exited with code 1")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success() {
        let muxer = Muxer::new().with_program("true");
        muxer
            .mux(Path::new("v.mp4"), Path::new("a.m4a"), Path::new("out.mp4"))
            .await
            .unwrap();
    }
}
