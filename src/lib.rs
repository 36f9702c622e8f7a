//! Per-chat audio playback orchestration for voice-chat music bots.
//!
//! Each chat owns an independent queue and voice session; many chats run
//! fully in parallel. The crate wires a metadata resolver (yt-dlp by
//! default), a voice transport with a runtime-variable capability surface,
//! and a per-chat state machine (`Idle → Joining → Playing ⇄ Paused`)
//! behind [`controller::PlaybackController`].
//!
//! The command surface (message parsing, keyboards) and the voice wire
//! protocol are deliberately not part of this crate: callers hand in a
//! [`transport::VoiceTransport`] implementation and receive typed outcomes
//! to render however they like.

pub mod cache;
pub mod config;
pub mod controller;
pub mod cooldown;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod metrics;
pub mod session;
pub mod track;
pub mod transport;

pub use cache::MetadataCache;
pub use config::Config;
pub use controller::{AdvanceOutcome, PlayOutcome, PlaybackController, PlaybackState};
pub use cooldown::CooldownGuard;
pub use error::{PlaybackError, Result};
pub use extractor::{TrackResolver, YtDlpResolver};
pub use metrics::Metrics;
pub use session::{QueueSnapshot, SessionStore};
pub use track::Track;
pub use transport::{
    AudioQuality, CallFailure, CallResult, TransportAdapter, TransportEvent, VoiceTransport,
};

/// Chat identifier — one tenant, one queue, one voice session.
///
/// Matches the signed 64-bit ids used by the chat platforms the
/// orchestrator targets.
pub type ChatId = i64;
