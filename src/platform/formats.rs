//! Stream selection against a download preference

use crate::core::video_info::{
    Container, DownloadPreference, MetadataDocument, Quality, ResolvedStreamSet, Selection,
    StreamDescriptor,
};
use crate::error::YtDlError;
use crate::Result;
use std::cmp::Reverse;
use tracing::debug;

/// Quality labels in ascending order
pub const QUALITY_LABELS: [&str; 9] = [
    "144p", "240p", "360p", "480p", "720p", "1080p", "1440p", "2160p", "4320p",
];

/// Position of a quality label on the ladder; unknown or missing labels rank 0
pub fn quality_rank(label: Option<&str>) -> usize {
    label
        .and_then(|l| {
            let lower = l.to_lowercase();
            QUALITY_LABELS.iter().position(|q| *q == lower)
        })
        .unwrap_or(0)
}

fn quality_distance(stream: &StreamDescriptor, quality: Quality) -> usize {
    quality_rank(stream.quality_label.as_deref()).abs_diff(quality.target_rank())
}

/// Pick the streams best matching `preference`
pub fn select(
    document: &MetadataDocument,
    preference: &DownloadPreference,
) -> Result<ResolvedStreamSet> {
    let muxed = candidates(&document.muxed, StreamDescriptor::is_video);
    let video = candidates(&document.video_only, StreamDescriptor::is_video);
    let audio = candidates(&document.audio_only, StreamDescriptor::is_audio);

    debug!(
        "Selecting from {} muxed, {} video, {} audio candidates",
        muxed.len(),
        video.len(),
        audio.len()
    );

    let (selection, container) = if preference.audio_only {
        let best = best_audio(&audio, preference.container).ok_or_else(|| {
            YtDlError::NoSuitableStream("no resolvable audio stream".to_string())
        })?;
        let container = if best.is_webm() {
            Container::Webm
        } else {
            audio_container(preference.container)
        };
        (Selection::AudioOnly(best.clone()), container)
    } else if let Some(best) = best_muxed(&muxed, preference.container, preference.quality) {
        (Selection::Muxed(best.clone()), container_of(best))
    } else {
        let video = best_video(&video, preference.container, preference.quality);
        let audio = best_audio(&audio, preference.container);
        match (video, audio) {
            (Some(video), Some(audio)) => (
                Selection::Adaptive {
                    video: video.clone(),
                    audio: audio.clone(),
                },
                container_of(video),
            ),
            _ => {
                return Err(YtDlError::NoSuitableStream(
                    "no matching muxed stream and no adaptive video/audio pair".to_string(),
                ))
            }
        }
    };

    Ok(ResolvedStreamSet {
        selection,
        container,
        video_id: document.video_id.clone(),
        title: document.title.clone(),
    })
}

fn candidates(
    streams: &[StreamDescriptor],
    category: fn(&StreamDescriptor) -> bool,
) -> Vec<&StreamDescriptor> {
    streams
        .iter()
        .filter(|s| s.is_resolvable() && category(s))
        .collect()
}

fn container_of(stream: &StreamDescriptor) -> Container {
    if stream.is_webm() {
        Container::Webm
    } else {
        Container::Mp4
    }
}

/// `mp3`/`ogg`/`webm` pass through, everything else becomes `mp4`
fn audio_container(requested: Container) -> Container {
    match requested {
        Container::Mp3 | Container::Ogg | Container::Webm => requested,
        Container::Mp4 => Container::Mp4,
    }
}

/// Closest quality to the target, ties broken by larger content length
pub fn best_muxed<'a>(
    streams: &[&'a StreamDescriptor],
    container: Container,
    quality: Quality,
) -> Option<&'a StreamDescriptor> {
    let mut matching: Vec<&StreamDescriptor> = streams
        .iter()
        .copied()
        .filter(|s| s.matches_container(container))
        .collect();
    matching.sort_by_key(|s| {
        (
            quality_distance(s, quality),
            Reverse(s.content_length.unwrap_or(0)),
        )
    });
    matching.first().copied()
}

/// Closest quality to the target, ties broken by higher bitrate
pub fn best_video<'a>(
    streams: &[&'a StreamDescriptor],
    container: Container,
    quality: Quality,
) -> Option<&'a StreamDescriptor> {
    let mut matching: Vec<&StreamDescriptor> = streams
        .iter()
        .copied()
        .filter(|s| s.matches_container(container))
        .collect();
    matching.sort_by_key(|s| (quality_distance(s, quality), Reverse(s.bitrate.unwrap_or(0))));
    matching.first().copied()
}

/// Highest average bitrate, preferring streams in the requested container
pub fn best_audio<'a>(
    streams: &[&'a StreamDescriptor],
    container: Container,
) -> Option<&'a StreamDescriptor> {
    let preferred: Vec<&StreamDescriptor> = streams
        .iter()
        .copied()
        .filter(|s| s.matches_container(container))
        .collect();
    let mut pool = if preferred.is_empty() {
        streams.to_vec()
    } else {
        preferred
    };
    pool.sort_by_key(|s| Reverse(s.effective_bitrate()));
    pool.first().copied()
}
