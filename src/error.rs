//! Typed failure taxonomy for playback commands.

use thiserror::Error;

/// Result type alias using the playback error type.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Everything a playback command can fail with.
///
/// Extraction and transport failures are caught at the controller boundary
/// and converted into these variants; callers never see a raw subprocess or
/// transport error.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Cooldown for this chat has not elapsed yet.
    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// The resolver found nothing for the query.
    #[error("No playable track found for: {0}")]
    TrackNotFound(String),

    /// The resolver errored, timed out, or returned no audio-capable entry.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Every join strategy was exhausted; there is no live voice session
    /// to attach to.
    #[error("Playback unavailable: no join strategy succeeded")]
    PlaybackUnavailable,

    /// A pause/resume/leave transport call failed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Pause or resume was addressed to a chat with no active playback.
    #[error("Nothing is playing in this chat")]
    NotPlaying,

    /// The session was cleared while the track was still being resolved;
    /// the extraction result was discarded.
    #[error("Session was reset while the track was being resolved")]
    Stale,
}

impl PlaybackError {
    /// Whether retrying the same command later can reasonably succeed.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::TrackNotFound(_)
                | Self::ExtractionFailed(_)
                | Self::PlaybackUnavailable
        )
    }

    /// Check if this is a rate limit error.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(PlaybackError::RateLimited { retry_after_secs: 2 }.is_recoverable());
        assert!(PlaybackError::TrackNotFound("x".into()).is_recoverable());
        assert!(PlaybackError::PlaybackUnavailable.is_recoverable());
        assert!(!PlaybackError::Stale.is_recoverable());
        assert!(!PlaybackError::NotPlaying.is_recoverable());
    }

    #[test]
    fn rate_limited_message_carries_wait_time() {
        let err = PlaybackError::RateLimited { retry_after_secs: 2 };
        assert!(err.is_rate_limited());
        assert!(err.to_string().contains("2 seconds"));
    }
}
