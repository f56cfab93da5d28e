use super::SearchResult;
use crate::track::TrackMetadata;
use unicode_normalization::UnicodeNormalization;

/// Fold a name for comparison: drop diacritics and anything that is not an
/// ASCII letter or digit, then lowercase.
pub fn normalize_str(s: &str) -> String {
    s.nfkd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Move results whose artist matches the track's artist to the front.
///
/// The sort is stable, so provider order is kept inside both groups. Only
/// applied when the track has both a title and an artist.
pub fn prioritize_artist(results: &mut [SearchResult], track: &TrackMetadata) {
    let (Some(artist), Some(_)) = (track.artist(), track.title()) else {
        return;
    };
    let wanted = normalize_str(artist);
    results.sort_by_key(|r| normalize_str(&r.artist) != wanted);
}
