//! Track metadata resolution.
//!
//! A [`TrackResolver`] turns a free-form query (URL or search terms) into a
//! playable [`Track`]. The production implementation shells out to yt-dlp;
//! tests substitute in-memory resolvers.

mod ytdlp;

pub use ytdlp::YtDlpResolver;

use crate::error::Result;
use crate::track::Track;
use async_trait::async_trait;

/// Resolves a query to a single playable track.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolve `query` to a track with a live stream URI.
    ///
    /// Errors map onto the playback taxonomy: nothing found is
    /// `TrackNotFound`, everything else that goes wrong during resolution
    /// is `ExtractionFailed`.
    async fn resolve(&self, query: &str) -> Result<Track>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        "resolver"
    }
}
