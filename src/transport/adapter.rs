//! Ordered fallback over the transport's capability surface.

use crate::error::{PlaybackError, Result};
use crate::transport::{AudioQuality, CallFailure, VoiceTransport};
use crate::ChatId;
use std::sync::Arc;
use tracing::{debug, warn};

/// One way of asking the transport to join and stream.
///
/// Tried in declaration order; richer APIs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Typed audio parameters with a quality hint.
    TypedWithQuality,
    /// Typed audio parameters at client defaults.
    TypedPlain,
    /// Raw stream URL.
    RawUrl,
}

impl JoinStrategy {
    pub const ALL: [Self; 3] = [Self::TypedWithQuality, Self::TypedPlain, Self::RawUrl];

    pub const fn name(self) -> &'static str {
        match self {
            Self::TypedWithQuality => "typed_with_quality",
            Self::TypedPlain => "typed_plain",
            Self::RawUrl => "raw_url",
        }
    }
}

/// A control verb with more than one client spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    Pause,
    Resume,
    Leave,
}

impl ControlOp {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Leave => "leave",
        }
    }
}

/// Wraps a [`VoiceTransport`] and hides its ragged capability surface.
///
/// Joins walk [`JoinStrategy::ALL`] until one lands; control verbs try the
/// newer client method, then the older one. An `Unsupported` result means
/// the call had no effect, so moving on to the next alternative is safe.
pub struct TransportAdapter {
    transport: Arc<dyn VoiceTransport>,
    quality: AudioQuality,
}

impl TransportAdapter {
    pub fn new(transport: Arc<dyn VoiceTransport>, quality: AudioQuality) -> Self {
        Self { transport, quality }
    }

    /// Join `chat_id` and start streaming `stream_uri`.
    ///
    /// Returns the strategy that succeeded. When every strategy is
    /// unsupported or fails, the chat has no live voice session and the
    /// error is [`PlaybackError::PlaybackUnavailable`].
    pub async fn join(&self, chat_id: ChatId, stream_uri: &str) -> Result<JoinStrategy> {
        for strategy in JoinStrategy::ALL {
            let outcome = match strategy {
                JoinStrategy::TypedWithQuality => {
                    self.transport
                        .join_with_quality(chat_id, stream_uri, self.quality)
                        .await
                }
                JoinStrategy::TypedPlain => self.transport.join(chat_id, stream_uri).await,
                JoinStrategy::RawUrl => self.transport.join_raw(chat_id, stream_uri).await,
            };
            match outcome {
                Ok(()) => {
                    debug!(chat_id, strategy = strategy.name(), "joined voice chat");
                    return Ok(strategy);
                }
                Err(CallFailure::Unsupported) => {
                    debug!(chat_id, strategy = strategy.name(), "join strategy unsupported");
                }
                Err(CallFailure::Failed(detail)) => {
                    warn!(chat_id, strategy = strategy.name(), %detail, "join strategy failed");
                }
            }
        }
        Err(PlaybackError::PlaybackUnavailable)
    }

    /// Run a control verb, preferring the newer client method.
    pub async fn control(&self, chat_id: ChatId, op: ControlOp) -> Result<()> {
        let newer = match op {
            ControlOp::Pause => self.transport.pause_stream(chat_id).await,
            ControlOp::Resume => self.transport.resume_stream(chat_id).await,
            ControlOp::Leave => self.transport.leave_call(chat_id).await,
        };
        let mut last_failure = match self.settle(chat_id, op, newer) {
            Ok(()) => return Ok(()),
            Err(failure) => failure,
        };

        let older = match op {
            ControlOp::Pause => self.transport.pause(chat_id).await,
            ControlOp::Resume => self.transport.resume(chat_id).await,
            ControlOp::Leave => self.transport.leave_group_call(chat_id).await,
        };
        match self.settle(chat_id, op, older) {
            Ok(()) => return Ok(()),
            Err(Some(detail)) => last_failure = Some(detail),
            Err(None) => {}
        }

        Err(PlaybackError::TransportError(last_failure.unwrap_or_else(
            || format!("{} not supported by this client", op.name()),
        )))
    }

    /// Log one control attempt; `Err` carries the detail of a hard failure.
    fn settle(
        &self,
        chat_id: ChatId,
        op: ControlOp,
        outcome: crate::transport::CallResult,
    ) -> std::result::Result<(), Option<String>> {
        match outcome {
            Ok(()) => {
                debug!(chat_id, op = op.name(), "transport control applied");
                Ok(())
            }
            Err(CallFailure::Unsupported) => {
                debug!(chat_id, op = op.name(), "control method unsupported");
                Err(None)
            }
            Err(CallFailure::Failed(detail)) => {
                warn!(chat_id, op = op.name(), %detail, "control method failed");
                Err(Some(detail))
            }
        }
    }
}
