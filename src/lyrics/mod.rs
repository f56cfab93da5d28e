//! Lyric sources and the aggregator that queries them
//!
//! This module provides:
//! - The `LyricSource` contract every provider implements
//! - LRCLIB and Netease sources
//! - A registry mapping source ids to implementations
//! - An aggregator that fans a search out over the enabled sources

pub mod aggregator;
#[cfg(test)]
pub(crate) mod fake;
pub mod http;
pub mod lrclib;
pub mod netease;
pub mod rank;
pub mod registry;
#[cfg(test)]
pub(crate) mod test_server;
pub mod text;

use crate::error::Result;
use crate::track::TrackMetadata;
use async_trait::async_trait;
use serde::Serialize;

pub use aggregator::{Aggregator, SearchOutcome};
pub use lrclib::LrclibSource;
pub use netease::NeteaseSource;
pub use registry::SourceRegistry;

/// A candidate returned by a source search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Id of the source that produced this result.
    pub source_id: String,
    /// Opaque to everything except the originating source.
    pub download_handle: String,
}

/// A provider of lyrics.
///
/// Implementations hold configuration only; anything needed to fetch a
/// result later must be encoded in its download handle.
#[async_trait]
pub trait LyricSource: Send + Sync {
    /// Stable short id, e.g. `lrclib`.
    fn id(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str;

    /// Search for candidates matching `track`, in the provider's ranking.
    ///
    /// # Returns
    /// * `Ok(vec![])` if the provider has no match
    /// * `Err` on transport failure or an unreadable response
    async fn search(&self, track: &TrackMetadata) -> Result<Vec<SearchResult>>;

    /// Fetch the lyric text behind a handle from one of this source's results.
    async fn download(&self, handle: &str) -> Result<String>;
}
