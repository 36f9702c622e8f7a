//! Resolved track metadata.

use serde::{Deserialize, Serialize};

/// Playable metadata for one audio item, produced by a
/// [`crate::extractor::TrackResolver`]. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Human-readable title
    pub title: String,
    /// Duration in whole seconds (0 when unknown, e.g. live streams)
    pub duration_secs: u64,
    /// Direct audio stream URI handed to the transport (opaque)
    pub stream_uri: String,
    /// Canonical page the track was resolved from
    pub source_uri: String,
    /// Uploader / artist name
    pub uploader: String,
    /// Thumbnail URL, when the source exposes one
    pub thumbnail: Option<String>,
}

impl Track {
    /// Format the duration for display: `42s`, `3:07`, `1:02:09`.
    pub fn format_duration(&self) -> String {
        format_duration(self.duration_secs)
    }
}

/// Format a duration in seconds for display.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        format!(
            "{}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}
