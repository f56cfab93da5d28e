use crate::lyrics::SearchResult;
use crate::player::PlaybackStatus;
use crate::track::TrackMetadata;

/// Outcome of the lookup started by a track change.
#[derive(Debug, Clone)]
pub enum LookupEvent {
    /// Lyrics previously assigned to the track.
    Loaded {
        track: TrackMetadata,
        location: String,
        text: String,
    },
    /// A candidate was downloaded and assigned.
    Downloaded {
        track: TrackMetadata,
        location: String,
        source_id: String,
        text: String,
    },
    /// Candidates waiting for the user to choose (auto download is off).
    Candidates {
        track: TrackMetadata,
        results: Vec<SearchResult>,
    },
    /// The track is assigned "no lyrics".
    Suppressed { track: TrackMetadata },
    NotFound { track: TrackMetadata },
    Failed { track: TrackMetadata, error: String },
    Status(PlaybackStatus),
}
