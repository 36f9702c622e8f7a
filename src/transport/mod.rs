//! Voice transport abstraction.
//!
//! Transports wrap whatever voice-call client a deployment runs. Their
//! capability surface varies at runtime (client versions expose different
//! method sets), so every trait method defaults to
//! [`CallFailure::Unsupported`] and implementations override only what
//! their client actually provides. [`TransportAdapter`] walks the
//! alternatives in a fixed order so callers above it never see the
//! difference.

mod adapter;

pub use adapter::{ControlOp, JoinStrategy, TransportAdapter};

use crate::ChatId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Why one transport call did not take effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// The underlying client does not expose this method. Nothing happened;
    /// the caller should try the next alternative.
    Unsupported,
    /// The method exists but the call failed.
    Failed(String),
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "method not supported by this client"),
            Self::Failed(detail) => write!(f, "{detail}"),
        }
    }
}

/// Outcome of a single transport method call.
pub type CallResult = std::result::Result<(), CallFailure>;

/// Quality hint for the richly-typed join path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl AudioQuality {
    /// Target audio bitrate in bits per second.
    pub const fn bitrate(self) -> u32 {
        match self {
            Self::Low => 48_000,
            Self::Medium => 96_000,
            Self::High => 128_000,
        }
    }
}

/// Asynchronous notifications from the voice layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The current stream for a chat played to its end.
    StreamEnded { chat_id: ChatId },
}

/// Event channel handed to the controller's listener loop.
pub type EventReceiver = mpsc::Receiver<TransportEvent>;

/// One voice-call client.
///
/// Joining a chat that already has a live call switches its stream; the
/// orchestrator relies on that to move from track to track without leaving.
/// Every method is optional. An implementation that overrides nothing is a
/// valid (if useless) transport: the adapter reports it as unavailable.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Join with typed audio parameters carrying a quality hint.
    async fn join_with_quality(
        &self,
        _chat_id: ChatId,
        _stream_uri: &str,
        _quality: AudioQuality,
    ) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Join with typed audio parameters at client defaults.
    async fn join(&self, _chat_id: ChatId, _stream_uri: &str) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Join handing the client a raw stream URL.
    async fn join_raw(&self, _chat_id: ChatId, _stream_uri: &str) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Pause the active stream (newer client API).
    async fn pause_stream(&self, _chat_id: ChatId) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Pause the active stream (older client API).
    async fn pause(&self, _chat_id: ChatId) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Resume a paused stream (newer client API).
    async fn resume_stream(&self, _chat_id: ChatId) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Resume a paused stream (older client API).
    async fn resume(&self, _chat_id: ChatId) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Leave the voice call (newer client API).
    async fn leave_call(&self, _chat_id: ChatId) -> CallResult {
        Err(CallFailure::Unsupported)
    }

    /// Leave the voice call (older client API).
    async fn leave_group_call(&self, _chat_id: ChatId) -> CallResult {
        Err(CallFailure::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareTransport;

    #[async_trait]
    impl VoiceTransport for BareTransport {}

    #[tokio::test]
    async fn defaults_are_unsupported() {
        let transport = BareTransport;
        assert_eq!(
            transport.join(1, "https://cdn.example/s").await,
            Err(CallFailure::Unsupported)
        );
        assert_eq!(transport.pause(1).await, Err(CallFailure::Unsupported));
        assert_eq!(transport.leave_call(1).await, Err(CallFailure::Unsupported));
    }

    #[test]
    fn bitrate_ladder() {
        assert_eq!(AudioQuality::Low.bitrate(), 48_000);
        assert_eq!(AudioQuality::Medium.bitrate(), 96_000);
        assert_eq!(AudioQuality::High.bitrate(), 128_000);
        assert_eq!(AudioQuality::default(), AudioQuality::High);
    }
}
