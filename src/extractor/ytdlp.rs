//! yt-dlp subprocess resolver.
//!
//! Runs `yt-dlp -J` for one query under a hard timeout and picks an
//! audio-capable stream out of the JSON it prints. The subprocess never
//! downloads media, it only reports metadata and signed stream URLs.

use crate::config::ExtractorConfig;
use crate::error::{PlaybackError, Result};
use crate::extractor::TrackResolver;
use crate::track::Track;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Resolver backed by the yt-dlp command-line extractor.
pub struct YtDlpResolver {
    binary: String,
    timeout: Duration,
    search: bool,
}

impl YtDlpResolver {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout(),
            search: config.search,
        }
    }

    /// The argument handed to yt-dlp. Non-URL input becomes a single-result
    /// search when search mode is on.
    fn target_for(&self, query: &str) -> String {
        let query = query.trim();
        if self.search && !is_url(query) {
            format!("ytsearch1:{query}")
        } else {
            query.to_string()
        }
    }

    async fn run_extractor(&self, target: &str) -> Result<String> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .arg("-J")
                .arg("--no-warnings")
                .arg("--skip-download")
                .arg("-f")
                .arg("bestaudio/best")
                .arg(target)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            warn!(request = %target, timeout_secs = self.timeout.as_secs(), "extraction timed out");
            PlaybackError::ExtractionFailed(format!(
                "extractor timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| PlaybackError::ExtractionFailed(format!("failed to spawn extractor: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("extractor exited nonzero");
            return Err(PlaybackError::ExtractionFailed(detail.to_string()));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| PlaybackError::ExtractionFailed("extractor wrote invalid UTF-8".into()))
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Track> {
        let target = self.target_for(query);
        debug!(%query, request = %target, "resolving track");

        let stdout = self.run_extractor(&target).await?;
        if stdout.trim().is_empty() {
            return Err(PlaybackError::TrackNotFound(query.to_string()));
        }
        let info: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| PlaybackError::ExtractionFailed(format!("bad extractor JSON: {e}")))?;
        parse_track(&info, query)
    }

    fn name(&self) -> &str {
        "yt-dlp"
    }
}

/// Build a [`Track`] from one yt-dlp info object.
///
/// Playlist-shaped objects are scanned in order; the first entry exposing
/// an audio-capable stream wins. A result carrying only video streams is an
/// extraction failure, not a track.
fn parse_track(info: &Value, query: &str) -> Result<Track> {
    let (info, stream_uri) = match info.get("entries").and_then(Value::as_array) {
        Some(entries) => {
            if entries.is_empty() {
                return Err(PlaybackError::TrackNotFound(query.to_string()));
            }
            entries
                .iter()
                .find_map(|entry| pick_stream_uri(entry).map(|uri| (entry, uri)))
                .ok_or_else(|| {
                    PlaybackError::ExtractionFailed(
                        "no audio-capable stream in extractor output".into(),
                    )
                })?
        }
        None => {
            let uri = pick_stream_uri(info).ok_or_else(|| {
                PlaybackError::ExtractionFailed(
                    "no audio-capable stream in extractor output".into(),
                )
            })?;
            (info, uri)
        }
    };

    Ok(Track {
        title: info
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        duration_secs: info.get("duration").and_then(Value::as_f64).unwrap_or(0.0) as u64,
        stream_uri,
        source_uri: info
            .get("webpage_url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        uploader: info
            .get("uploader")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        thumbnail: info
            .get("thumbnail")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Choose the stream URL to play.
///
/// The top-level `url` wins when the selected format carries audio.
/// Otherwise scan `formats` for audio-capable entries and take the last
/// one, which yt-dlp orders as the best.
fn pick_stream_uri(info: &Value) -> Option<String> {
    if let Some(url) = info.get("url").and_then(Value::as_str) {
        if has_audio(info) {
            return Some(url.to_string());
        }
    }
    let formats = info.get("formats")?.as_array()?;
    formats
        .iter()
        .filter(|format| has_audio(format))
        .filter_map(|format| format.get("url").and_then(Value::as_str))
        .next_back()
        .map(str::to_string)
}

fn has_audio(format: &Value) -> bool {
    match format.get("acodec").and_then(Value::as_str) {
        Some(acodec) => acodec != "none",
        // No acodec field at all: assume playable rather than reject
        None => true,
    }
}

fn is_url(query: &str) -> bool {
    query.starts_with("http://") || query.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_video_object() {
        let info = json!({
            "title": "Test Song",
            "duration": 187.3,
            "url": "https://cdn.example/stream.webm",
            "acodec": "opus",
            "webpage_url": "https://example.com/watch?v=abc",
            "uploader": "Some Channel",
            "thumbnail": "https://example.com/thumb.jpg",
        });
        let track = parse_track(&info, "test song").unwrap();
        assert_eq!(track.title, "Test Song");
        assert_eq!(track.duration_secs, 187);
        assert_eq!(track.stream_uri, "https://cdn.example/stream.webm");
        assert_eq!(track.uploader, "Some Channel");
        assert_eq!(track.thumbnail.as_deref(), Some("https://example.com/thumb.jpg"));
    }

    #[test]
    fn unwraps_first_playlist_entry() {
        let info = json!({
            "entries": [
                { "title": "First", "url": "https://cdn.example/1", "acodec": "opus" },
                { "title": "Second", "url": "https://cdn.example/2", "acodec": "opus" },
            ]
        });
        let track = parse_track(&info, "playlist").unwrap();
        assert_eq!(track.title, "First");
    }

    #[test]
    fn skips_playlist_entries_without_audio() {
        let info = json!({
            "entries": [
                { "title": "Video Only", "url": "https://cdn.example/v", "acodec": "none" },
                { "title": "Audible", "url": "https://cdn.example/a", "acodec": "opus" },
            ]
        });
        let track = parse_track(&info, "playlist").unwrap();
        assert_eq!(track.title, "Audible");
    }

    #[test]
    fn playlist_with_no_audio_is_extraction_failed() {
        let info = json!({
            "entries": [
                { "title": "Video Only", "url": "https://cdn.example/v", "acodec": "none" },
            ]
        });
        let err = parse_track(&info, "playlist").unwrap_err();
        assert!(matches!(err, PlaybackError::ExtractionFailed(_)));
    }

    #[test]
    fn empty_playlist_is_not_found() {
        let info = json!({ "entries": [] });
        let err = parse_track(&info, "nothing here").unwrap_err();
        assert!(matches!(err, PlaybackError::TrackNotFound(q) if q == "nothing here"));
    }

    #[test]
    fn falls_back_to_last_audio_format() {
        let info = json!({
            "title": "T",
            "url": "https://cdn.example/video-only",
            "acodec": "none",
            "formats": [
                { "url": "https://cdn.example/low", "acodec": "mp4a" },
                { "url": "https://cdn.example/video", "acodec": "none" },
                { "url": "https://cdn.example/best", "acodec": "opus" },
            ]
        });
        let track = parse_track(&info, "t").unwrap();
        assert_eq!(track.stream_uri, "https://cdn.example/best");
    }

    #[test]
    fn rejects_video_only_results() {
        let info = json!({
            "title": "T",
            "url": "https://cdn.example/video-only",
            "acodec": "none",
            "formats": [
                { "url": "https://cdn.example/video", "acodec": "none" },
            ]
        });
        let err = parse_track(&info, "t").unwrap_err();
        assert!(matches!(err, PlaybackError::ExtractionFailed(_)));
    }

    #[test]
    fn missing_fields_get_placeholders() {
        let info = json!({ "url": "https://cdn.example/s", "acodec": "opus" });
        let track = parse_track(&info, "q").unwrap();
        assert_eq!(track.title, "Unknown");
        assert_eq!(track.uploader, "Unknown");
        assert_eq!(track.duration_secs, 0);
        assert!(track.source_uri.is_empty());
        assert!(track.thumbnail.is_none());
    }

    #[test]
    fn search_prefix_applies_to_plain_queries_only() {
        let resolver = YtDlpResolver::new(&ExtractorConfig::default());
        assert_eq!(resolver.target_for("never gonna"), "ytsearch1:never gonna");
        assert_eq!(
            resolver.target_for("https://example.com/watch?v=abc"),
            "https://example.com/watch?v=abc"
        );
    }

    #[test]
    fn search_can_be_disabled() {
        let config = ExtractorConfig {
            search: false,
            ..ExtractorConfig::default()
        };
        let resolver = YtDlpResolver::new(&config);
        assert_eq!(resolver.target_for("never gonna"), "never gonna");
    }

    #[tokio::test]
    async fn missing_binary_is_extraction_failed() {
        let config = ExtractorConfig {
            binary: "/nonexistent/yt-dlp-test-binary".into(),
            ..ExtractorConfig::default()
        };
        let resolver = YtDlpResolver::new(&config);
        let err = resolver.resolve("anything").await.unwrap_err();
        assert!(matches!(err, PlaybackError::ExtractionFailed(_)));
    }
}
