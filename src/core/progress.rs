//! Progress tracking for stream downloads

use std::time::{Duration, Instant};

/// Progress of one stream download
#[derive(Debug, Clone)]
pub struct Progress {
    /// Which stream this is ("video", "audio", or the output name)
    pub label: String,
    /// Total size in bytes, when the server announced one
    pub total_size: Option<u64>,
    /// Number of bytes written so far
    pub downloaded_size: u64,
    /// Current download speed in bytes per second
    pub speed: Option<f64>,
    /// Estimated time remaining
    pub eta: Option<Duration>,
    /// Time when download started
    pub start_time: Instant,
}

impl Progress {
    /// Create a new progress tracker
    pub fn new(label: impl Into<String>, total_size: Option<u64>) -> Self {
        Self {
            label: label.into(),
            total_size: total_size.filter(|t| *t > 0),
            downloaded_size: 0,
            speed: None,
            eta: None,
            start_time: Instant::now(),
        }
    }

    /// Record the running byte count
    pub fn update(&mut self, downloaded_size: u64) {
        self.downloaded_size = downloaded_size;

        let elapsed = self.start_time.elapsed().as_secs_f64().max(0.1);
        let speed = downloaded_size as f64 / elapsed;
        self.speed = Some(speed);

        self.eta = match self.total_size {
            Some(total) if speed > 0.0 && total > downloaded_size => Some(Duration::from_secs(
                ((total - downloaded_size) as f64 / speed) as u64,
            )),
            _ => None,
        };
    }

    /// Completion percentage, when the total is known
    pub fn percent(&self) -> Option<f64> {
        self.total_size
            .map(|total| (self.downloaded_size as f64 / total as f64 * 100.0).min(100.0))
    }

    /// Check if download is complete
    pub fn is_complete(&self) -> bool {
        self.total_size
            .is_some_and(|total| self.downloaded_size >= total)
    }

    /// One-line summary, e.g. `video 50.0% (1.0 MB/2.0 MB) 512.0 KB/s eta 2s`
    pub fn summary(&self) -> String {
        let speed = self
            .speed
            .map(format_bytes_per_second)
            .unwrap_or_else(|| "-".to_string());

        let mut line = match (self.total_size, self.percent()) {
            (Some(total), Some(percent)) => format!(
                "{} {:.1}% ({}/{}) {}",
                self.label,
                percent,
                format_bytes(self.downloaded_size),
                format_bytes(total),
                speed
            ),
            _ => format!(
                "{} {} {}",
                self.label,
                format_bytes(self.downloaded_size),
                speed
            ),
        };
        if let Some(eta) = self.eta {
            line.push_str(&format!(" eta {}", format_duration(eta)));
        }
        line
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format bytes per second as human-readable string
pub fn format_bytes_per_second(bytes_per_second: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_second as u64))
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{}s", s),
        (0, m, 0) => format!("{}m", m),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, 0, _) => format!("{}h", h),
        (h, m, _) => format!("{}h {}m", h, m),
    }
}
