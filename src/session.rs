//! Per-chat session state.
//!
//! [`SessionStore`] is the sole owner of everything mutable about a chat:
//! the current track, the pending FIFO queue, and the paused flag. Every
//! mutation goes through a session's mutex, so command handling and the
//! asynchronous stream-end advance for the same chat are serialized and no
//! caller can observe a half-applied update. Sessions are created lazily
//! and never removed — only cleared — which keeps concurrent lookups free
//! of remove/insert races.

use crate::track::Track;
use crate::ChatId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State for one chat. Only reachable behind the store's per-chat mutex.
#[derive(Debug, Default)]
pub struct ChatSession {
    current: Option<Track>,
    queue: VecDeque<Track>,
    paused: bool,
    generation: u64,
    last_command_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// Append a track; returns its 1-based queue position.
    pub fn enqueue(&mut self, track: Track) -> usize {
        self.queue.push_back(track);
        self.queue.len()
    }

    /// Remove and return the next track, FIFO.
    pub fn pop_next(&mut self) -> Option<Track> {
        self.queue.pop_front()
    }

    /// Install a new current track; playback starts unpaused.
    pub fn set_current(&mut self, track: Track) {
        self.current = Some(track);
        self.paused = false;
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Empty the queue, clear the current track, unpause, and bump the
    /// generation so in-flight extractions for this chat become stale.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
        self.paused = false;
        self.generation += 1;
    }

    /// Playback ran out with nothing queued; back to idle. Unlike
    /// [`clear`], this does not bump the generation, so a play request
    /// already in flight for this chat still lands.
    ///
    /// [`clear`]: ChatSession::clear
    pub fn finish_playback(&mut self) {
        self.current = None;
        self.paused = false;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// A chat with no current track is idle.
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Identity of this session's lifetime; changes only on [`clear`].
    ///
    /// [`clear`]: ChatSession::clear
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record that a command touched this chat just now.
    pub fn touch(&mut self) {
        self.last_command_at = Some(Utc::now());
    }

    pub fn last_command_at(&self) -> Option<DateTime<Utc>> {
        self.last_command_at
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.current.clone(),
            pending: self.queue.iter().cloned().collect(),
        }
    }
}

/// Point-in-time view of a chat's queue, safe to hand to rendering code.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub pending: Vec<Track>,
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }
}

/// Concurrent map of chat id → mutex-guarded session.
///
/// Distinct chats never serialize against each other; operations on one
/// chat are linearizable through its mutex.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, Arc<Mutex<ChatSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `chat_id`, created on first use.
    ///
    /// Callers running a multi-step critical section (command handling,
    /// advance) lock the returned mutex for its whole duration, which also
    /// sequences join/leave transport calls per chat.
    pub fn session(&self, chat_id: ChatId) -> Arc<Mutex<ChatSession>> {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChatSession::default())))
            .clone()
    }

    /// One-shot enqueue; returns the 1-based position.
    pub async fn enqueue(&self, chat_id: ChatId, track: Track) -> usize {
        self.session(chat_id).lock().await.enqueue(track)
    }

    /// One-shot FIFO pop.
    pub async fn pop_next(&self, chat_id: ChatId) -> Option<Track> {
        self.session(chat_id).lock().await.pop_next()
    }

    pub async fn set_current(&self, chat_id: ChatId, track: Track) {
        self.session(chat_id).lock().await.set_current(track);
    }

    pub async fn get_current(&self, chat_id: ChatId) -> Option<Track> {
        self.session(chat_id).lock().await.current().cloned()
    }

    pub async fn clear(&self, chat_id: ChatId) {
        self.session(chat_id).lock().await.clear();
    }

    pub async fn set_paused(&self, chat_id: ChatId, paused: bool) {
        self.session(chat_id).lock().await.set_paused(paused);
    }

    pub async fn is_paused(&self, chat_id: ChatId) -> bool {
        self.session(chat_id).lock().await.is_paused()
    }

    /// Consistent `(current, pending)` view of one chat.
    pub async fn snapshot(&self, chat_id: ChatId) -> QueueSnapshot {
        self.session(chat_id).lock().await.snapshot()
    }

    /// Number of chats ever seen (sessions are cleared, not removed).
    pub fn chat_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            title: title.into(),
            duration_secs: 60,
            stream_uri: format!("https://cdn.example/{title}"),
            source_uri: format!("https://example.com/{title}"),
            uploader: "u".into(),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let store = SessionStore::new();
        assert_eq!(store.enqueue(1, track("a")).await, 1);
        assert_eq!(store.enqueue(1, track("b")).await, 2);

        assert_eq!(store.pop_next(1).await.unwrap().title, "a");
        assert_eq!(store.pop_next(1).await.unwrap().title, "b");
        assert!(store.pop_next(1).await.is_none());
    }

    #[tokio::test]
    async fn single_current_per_chat() {
        let store = SessionStore::new();
        assert!(store.get_current(1).await.is_none());

        store.set_current(1, track("a")).await;
        assert_eq!(store.get_current(1).await.unwrap().title, "a");

        store.set_current(1, track("b")).await;
        assert_eq!(store.get_current(1).await.unwrap().title, "b");

        store.clear(1).await;
        assert!(store.get_current(1).await.is_none());
    }

    #[tokio::test]
    async fn clear_resets_everything_and_bumps_generation() {
        let store = SessionStore::new();
        let slot = store.session(1);

        let generation_before = {
            let mut session = slot.lock().await;
            session.set_current(track("a"));
            session.enqueue(track("b"));
            session.set_paused(true);
            session.generation()
        };

        store.clear(1).await;

        let session = slot.lock().await;
        assert!(session.is_idle());
        assert_eq!(session.queue_len(), 0);
        assert!(!session.is_paused());
        assert_eq!(session.generation(), generation_before + 1);
    }

    #[tokio::test]
    async fn chats_are_independent() {
        let store = SessionStore::new();
        store.enqueue(1, track("a")).await;
        store.enqueue(2, track("b")).await;

        assert_eq!(store.pop_next(1).await.unwrap().title, "a");
        assert_eq!(store.pop_next(2).await.unwrap().title, "b");
        assert_eq!(store.chat_count(), 2);
    }

    #[tokio::test]
    async fn set_current_unpauses() {
        let store = SessionStore::new();
        store.set_paused(1, true).await;
        store.set_current(1, track("a")).await;
        assert!(!store.is_paused(1).await);
    }

    #[tokio::test]
    async fn snapshot_shows_current_and_pending_in_order() {
        let store = SessionStore::new();
        store.set_current(1, track("now")).await;
        store.enqueue(1, track("next")).await;
        store.enqueue(1, track("later")).await;

        let snapshot = store.snapshot(1).await;
        assert_eq!(snapshot.current.unwrap().title, "now");
        let titles: Vec<_> = snapshot.pending.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["next", "later"]);
    }

    #[tokio::test]
    async fn cleared_sessions_stay_resident() {
        let store = SessionStore::new();
        store.enqueue(1, track("a")).await;
        store.clear(1).await;
        assert_eq!(store.chat_count(), 1);
        assert!(store.snapshot(1).await.is_empty());
    }
}
