//! Optional TTL cache from query to resolved track.
//!
//! Saves a full extraction round trip when the same query comes in again
//! within the TTL. Expiry is evaluated lazily at read time; there is no
//! background sweeper.

use crate::track::Track;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CacheEntry {
    track: Track,
    inserted_at: Instant,
}

/// Concurrent query → track cache with wall-clock TTL.
pub struct MetadataCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a query. Expired entries are removed on the way out.
    pub fn get(&self, query: &str) -> Option<Track> {
        let key = normalize_query(query);
        {
            let entry = self.entries.get(&key)?;
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.track.clone());
            }
        }
        // Expired: drop it so the map does not grow unbounded. Guarded so a
        // concurrent fresh insert is not thrown away.
        self.entries
            .remove_if(&key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        None
    }

    /// Store a resolved track under its normalized query.
    pub fn put(&self, query: &str, track: Track) {
        self.entries.insert(
            normalize_query(query),
            CacheEntry {
                track,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently held (including not-yet-reaped expired ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case- and whitespace-insensitive cache key.
fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            title: title.into(),
            duration_secs: 180,
            stream_uri: format!("https://cdn.example/{title}.webm"),
            source_uri: format!("https://example.com/{title}"),
            uploader: "uploader".into(),
            thumbnail: None,
        }
    }

    #[test]
    fn hit_within_ttl() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        cache.put("Some Song", track("some song"));
        let hit = cache.get("Some Song").unwrap();
        assert_eq!(hit.title, "some song");
    }

    #[test]
    fn queries_are_normalized() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        cache.put("  Some Song ", track("a"));
        assert!(cache.get("some song").is_some());
        assert!(cache.get("SOME SONG").is_some());
        assert!(cache.get("another song").is_none());
    }

    #[test]
    fn expires_after_ttl() {
        let cache = MetadataCache::new(Duration::from_millis(20));
        cache.put("q", track("a"));
        assert!(cache.get("q").is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("q").is_none());
        // The expired entry was reaped by the read
        assert!(cache.is_empty());
    }

    #[test]
    fn put_refreshes_expiry() {
        let cache = MetadataCache::new(Duration::from_millis(40));
        cache.put("q", track("a"));
        std::thread::sleep(Duration::from_millis(25));
        cache.put("q", track("b"));
        std::thread::sleep(Duration::from_millis(25));
        // First insert would have expired by now; the refresh keeps it alive
        assert_eq!(cache.get("q").unwrap().title, "b");
    }
}
