//! The playback orchestrator.
//!
//! [`PlaybackController`] ties the resolver, the transport adapter and the
//! per-chat sessions together and enforces the ordering rules:
//!
//! * every command for a chat runs inside that chat's session lock, so
//!   join/leave transport calls for one chat are strictly sequenced;
//! * metadata extraction runs *outside* the lock, with a generation check
//!   on re-entry so a reset that happened meanwhile discards the result;
//! * a chat that is already playing queues further requests FIFO instead
//!   of restarting playback.
//!
//! Only `request_play` is rate limited; control verbs (pause, resume,
//! skip, stop) are cheap and pass straight through.

use crate::cache::MetadataCache;
use crate::config::Config;
use crate::cooldown::CooldownGuard;
use crate::error::{PlaybackError, Result};
use crate::extractor::TrackResolver;
use crate::metrics::Metrics;
use crate::session::{QueueSnapshot, SessionStore};
use crate::track::Track;
use crate::transport::{
    ControlOp, EventReceiver, TransportAdapter, TransportEvent, VoiceTransport,
};
use crate::ChatId;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a successful play request did.
#[derive(Debug, Clone)]
pub enum PlayOutcome {
    /// The chat was idle; the bot joined and the track is playing now.
    Started { track: Track },
    /// The chat was busy; the track waits at the given 1-based position.
    Queued { track: Track, position: usize },
}

/// What happened when playback moved on after a stream ended.
#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    /// The next queued track is playing.
    Advanced { track: Track },
    /// Nothing was left to play; the bot left the voice chat.
    QueueExhausted,
}

/// Coarse per-chat state, as seen by status commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Per-chat playback orchestrator. One instance serves every chat.
pub struct PlaybackController {
    sessions: SessionStore,
    cooldown: CooldownGuard,
    cache: Option<MetadataCache>,
    resolver: Arc<dyn TrackResolver>,
    adapter: TransportAdapter,
    metrics: Arc<Metrics>,
}

impl PlaybackController {
    pub fn new(
        config: &Config,
        resolver: Arc<dyn TrackResolver>,
        transport: Arc<dyn VoiceTransport>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            cooldown: CooldownGuard::new(config.cooldown.window()),
            cache: config
                .cache
                .enabled
                .then(|| MetadataCache::new(config.cache.ttl())),
            resolver,
            adapter: TransportAdapter::new(transport, config.transport.quality),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Latency collector, shared with whatever serves the health surface.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle a play command: resolve `query` and either start playback or
    /// append to the chat's queue.
    ///
    /// Resolution happens outside the session lock so slow extractions for
    /// one chat never block its control verbs or other chats. If the chat
    /// was reset while resolving, the result is discarded with
    /// [`PlaybackError::Stale`].
    pub async fn request_play(&self, chat_id: ChatId, query: &str) -> Result<PlayOutcome> {
        let command_start = Instant::now();
        if !self.cooldown.allow(chat_id) {
            return Err(PlaybackError::RateLimited {
                retry_after_secs: self.cooldown.retry_after_secs(chat_id),
            });
        }

        let slot = self.sessions.session(chat_id);
        let generation = {
            let mut session = slot.lock().await;
            session.touch();
            session.generation()
        };

        let track = self.resolve_cached(query).await?;

        let mut session = slot.lock().await;
        if session.generation() != generation {
            debug!(chat_id, %query, "session reset during extraction, discarding");
            return Err(PlaybackError::Stale);
        }

        let outcome = if session.current().is_some() {
            let position = session.enqueue(track.clone());
            debug!(chat_id, title = %track.title, position, "track queued");
            PlayOutcome::Queued { track, position }
        } else {
            let join_start = Instant::now();
            let strategy = self.adapter.join(chat_id, &track.stream_uri).await?;
            self.metrics.record_join(join_start.elapsed()).await;
            session.set_current(track.clone());
            info!(chat_id, title = %track.title, strategy = strategy.name(), "playback started");
            PlayOutcome::Started { track }
        };
        self.metrics.record_command(command_start.elapsed()).await;
        Ok(outcome)
    }

    /// Move to the next queued track after the current stream ended.
    ///
    /// Tracks whose stream the transport rejects (stale URLs mostly) are
    /// dropped and the next one is tried, at most one pass over what was
    /// queued on entry. With nothing playable left the bot leaves the
    /// voice chat and the chat returns to idle.
    pub async fn advance(&self, chat_id: ChatId) -> AdvanceOutcome {
        let slot = self.sessions.session(chat_id);
        let mut session = slot.lock().await;

        let mut remaining = session.queue_len();
        while remaining > 0 {
            remaining -= 1;
            let Some(track) = session.pop_next() else {
                break;
            };
            let join_start = Instant::now();
            match self.adapter.join(chat_id, &track.stream_uri).await {
                Ok(_) => {
                    self.metrics.record_join(join_start.elapsed()).await;
                    session.set_current(track.clone());
                    info!(chat_id, title = %track.title, "advanced to next track");
                    return AdvanceOutcome::Advanced { track };
                }
                Err(err) => {
                    warn!(chat_id, title = %track.title, error = %err, "dropping unplayable track");
                }
            }
        }

        if let Err(err) = self.adapter.control(chat_id, ControlOp::Leave).await {
            warn!(chat_id, error = %err, "failed to leave voice chat after queue end");
        }
        session.finish_playback();
        info!(chat_id, "queue exhausted");
        AdvanceOutcome::QueueExhausted
    }

    /// User-facing skip: like [`advance`], but an idle chat is an error.
    ///
    /// [`advance`]: PlaybackController::advance
    pub async fn skip(&self, chat_id: ChatId) -> Result<AdvanceOutcome> {
        {
            let session = self.sessions.session(chat_id);
            if session.lock().await.is_idle() {
                return Err(PlaybackError::NotPlaying);
            }
        }
        Ok(self.advance(chat_id).await)
    }

    /// Pause the current track. A second pause is a no-op; the transport is
    /// only called on an actual state change.
    pub async fn pause(&self, chat_id: ChatId) -> Result<()> {
        let slot = self.sessions.session(chat_id);
        let mut session = slot.lock().await;
        if session.is_idle() {
            return Err(PlaybackError::NotPlaying);
        }
        if session.is_paused() {
            return Ok(());
        }
        self.adapter.control(chat_id, ControlOp::Pause).await?;
        session.set_paused(true);
        debug!(chat_id, "playback paused");
        Ok(())
    }

    /// Resume a paused track. Resuming an unpaused chat is a no-op.
    pub async fn resume(&self, chat_id: ChatId) -> Result<()> {
        let slot = self.sessions.session(chat_id);
        let mut session = slot.lock().await;
        if session.is_idle() {
            return Err(PlaybackError::NotPlaying);
        }
        if !session.is_paused() {
            return Ok(());
        }
        self.adapter.control(chat_id, ControlOp::Resume).await?;
        session.set_paused(false);
        debug!(chat_id, "playback resumed");
        Ok(())
    }

    /// Stop playback, drop the queue, and leave the voice chat.
    ///
    /// The session is cleared *before* the transport is asked to leave, so
    /// local state is consistent even when the leave call fails; the
    /// transport error still reaches the caller. Stopping also invalidates
    /// any extraction in flight for this chat.
    pub async fn stop(&self, chat_id: ChatId) -> Result<()> {
        let slot = self.sessions.session(chat_id);
        let mut session = slot.lock().await;
        session.clear();
        info!(chat_id, "session stopped and cleared");
        // Always attempt the leave, even when the session looks idle: an
        // earlier leave may have failed and left the call live. Leaving an
        // already-left call is harmless.
        self.adapter.control(chat_id, ControlOp::Leave).await
    }

    /// Leave the voice chat. Identical to [`stop`]: leaving while keeping
    /// the queue around would resume stale state on the next join.
    ///
    /// [`stop`]: PlaybackController::stop
    pub async fn leave(&self, chat_id: ChatId) -> Result<()> {
        self.stop(chat_id).await
    }

    /// Consistent view of a chat's current track and pending queue.
    pub async fn queue(&self, chat_id: ChatId) -> QueueSnapshot {
        self.sessions.snapshot(chat_id).await
    }

    /// The track playing (or paused) right now, if any.
    pub async fn now_playing(&self, chat_id: ChatId) -> Option<Track> {
        self.sessions.get_current(chat_id).await
    }

    /// Coarse state for status rendering.
    pub async fn state(&self, chat_id: ChatId) -> PlaybackState {
        let slot = self.sessions.session(chat_id);
        let session = slot.lock().await;
        if session.is_idle() {
            PlaybackState::Idle
        } else if session.is_paused() {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    /// Drive playback from transport notifications until the sender side
    /// of the channel is dropped.
    pub fn spawn_event_loop(self: Arc<Self>, mut events: EventReceiver) -> JoinHandle<()> {
        let controller = self;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::StreamEnded { chat_id } => {
                        controller.advance(chat_id).await;
                    }
                }
            }
            debug!("transport event channel closed, stopping event loop");
        })
    }

    async fn resolve_cached(&self, query: &str) -> Result<Track> {
        if let Some(cache) = &self.cache {
            if let Some(track) = cache.get(query) {
                debug!(%query, "metadata cache hit");
                return Ok(track);
            }
        }
        let start = Instant::now();
        let track = self.resolver.resolve(query).await?;
        self.metrics.record_extraction(start.elapsed()).await;
        if let Some(cache) = &self.cache {
            cache.put(query, track.clone());
        }
        Ok(track)
    }
}
