//! Lyric lookup with a local assignment database.
//!
//! A track is first looked up in [`storage::LrcDb`], which remembers lyric
//! files chosen for tracks earlier. On a miss the enabled
//! [`lyrics::LyricSource`]s are searched through the
//! [`lyrics::Aggregator`], and an accepted candidate is saved and assigned
//! so the next lookup is served from the database.

pub mod app;
pub mod config;
pub mod error;
pub mod lookup;
pub mod lyrics;
pub mod player;
pub mod storage;
pub mod track;

pub use error::{Error, Result};
pub use track::TrackMetadata;
