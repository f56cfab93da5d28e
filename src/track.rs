//! Track identity shared by the store, the sources and the player feed.

use serde::{Deserialize, Deserializer, Serialize};

/// Descriptive metadata of a playable track.
///
/// Every field is optional on the wire. Missing text maps to `None`, and a
/// missing, unparsable or negative track number maps to `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    #[serde(deserialize_with = "lenient_tracknum")]
    pub tracknum: u32,
    pub location: Option<String>,
}

/// The `(title, artist, album, tracknum)` tuple with unset fields normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoKey<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
    pub tracknum: u32,
}

impl TrackMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_tracknum(mut self, tracknum: u32) -> Self {
        self.tracknum = tracknum;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Canonical location, if any. An empty string counts as unset.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }

    /// Non-empty title, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    /// Non-empty artist, if any.
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref().filter(|a| !a.is_empty())
    }

    pub fn info_key(&self) -> InfoKey<'_> {
        InfoKey {
            title: self.title.as_deref().unwrap_or(""),
            artist: self.artist.as_deref().unwrap_or(""),
            album: self.album.as_deref().unwrap_or(""),
            tracknum: self.tracknum,
        }
    }

    /// Whether both identities denote the same track.
    pub fn same_track(&self, other: &TrackMetadata) -> bool {
        match (self.location(), other.location()) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.info_key() == other.info_key(),
        }
    }

    /// Short human label, `Artist - Title`.
    pub fn display_name(&self) -> String {
        match (self.artist(), self.title()) {
            (Some(a), Some(t)) => format!("{a} - {t}"),
            (None, Some(t)) => t.to_string(),
            (Some(a), None) => a.to_string(),
            (None, None) => self.location().unwrap_or("unknown track").to_string(),
        }
    }
}

/// Parse a track number the way players report it: integer, float or text.
pub fn parse_tracknum(raw: &str) -> u32 {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn lenient_tracknum<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let n = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(n)) => u32::try_from(n).unwrap_or(0),
        Some(Raw::Float(f)) if f.is_finite() && f >= 0.0 && f <= u32::MAX as f64 => f as u32,
        Some(Raw::Text(s)) => parse_tracknum(&s),
        _ => 0,
    };
    Ok(n)
}
