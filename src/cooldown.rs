//! Per-chat command rate limiting.

use crate::ChatId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Sliding-window limiter: at most one accepted command per chat per window.
///
/// The check-and-set is atomic per key (the map entry holds its shard lock
/// for the duration), so two concurrent calls for the same chat can never
/// both be accepted within one window. Distinct chats never contend beyond
/// shard granularity.
pub struct CooldownGuard {
    last_accepted: DashMap<ChatId, Instant>,
    window: Duration,
}

impl CooldownGuard {
    /// Create a guard with the given minimum spacing. A zero window
    /// accepts everything.
    pub fn new(window: Duration) -> Self {
        Self {
            last_accepted: DashMap::new(),
            window,
        }
    }

    /// Try to accept a command for `key`.
    ///
    /// On success the current instant is recorded as the last-accepted
    /// time and `true` is returned; on rejection the recorded state is
    /// left untouched.
    pub fn allow(&self, key: ChatId) -> bool {
        if self.window.is_zero() {
            return true;
        }
        let now = Instant::now();
        match self.last_accepted.entry(key) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) >= self.window {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Whole seconds until the next command for `key` can be accepted
    /// (rounded up, 0 when the chat is not on cooldown).
    pub fn retry_after_secs(&self, key: ChatId) -> u64 {
        let Some(last) = self.last_accepted.get(&key).map(|entry| *entry.value()) else {
            return 0;
        };
        let elapsed = last.elapsed();
        if elapsed >= self.window {
            return 0;
        }
        let remaining = self.window - elapsed;
        let mut secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs += 1;
        }
        secs
    }
}
