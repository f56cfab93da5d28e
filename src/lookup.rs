//! Lyric lookup: assigned files first, sources on a miss.

use crate::error::{Error, Result};
use crate::lyrics::{Aggregator, SearchOutcome, SearchResult};
use crate::storage::LrcDb;
use crate::track::TrackMetadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a lookup found for a track.
#[derive(Debug)]
pub enum Resolution {
    /// A lyric file was assigned earlier.
    Assigned { location: String },
    /// The track was explicitly assigned "no lyrics".
    Suppressed,
    /// Nothing assigned; these are the source candidates (possibly none).
    Candidates(SearchOutcome),
}

/// A downloaded candidate that is now assigned to its track.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub location: String,
    pub path: PathBuf,
    pub text: String,
}

#[derive(Clone)]
pub struct LyricsService {
    db: Arc<LrcDb>,
    aggregator: Aggregator,
    lyrics_dir: PathBuf,
    timeout: Duration,
}

impl LyricsService {
    pub fn new(
        db: Arc<LrcDb>,
        aggregator: Aggregator,
        lyrics_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            aggregator,
            lyrics_dir,
            timeout,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Run a store operation off the async runtime.
    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&LrcDb) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }

    pub async fn find(&self, track: &TrackMetadata) -> Result<Option<String>> {
        let track = track.clone();
        self.with_db(move |db| db.find(&track)).await
    }

    /// Check the store, then search the sources on a miss.
    pub async fn resolve(
        &self,
        track: &TrackMetadata,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        match self.find(track).await? {
            Some(location) if location.is_empty() => Ok(Resolution::Suppressed),
            Some(location) => Ok(Resolution::Assigned { location }),
            None => {
                let outcome = self.aggregator.search(track, self.timeout, cancel).await?;
                Ok(Resolution::Candidates(outcome))
            }
        }
    }

    /// Download `result`, save it next to the other lyrics and assign it.
    ///
    /// Nothing is assigned once `cancel` has fired. A cancel that lands
    /// during the file write leaves the file in place but unassigned.
    pub async fn accept(
        &self,
        track: &TrackMetadata,
        result: &SearchResult,
        cancel: &CancellationToken,
    ) -> Result<Accepted> {
        let text = self
            .aggregator
            .download(result, self.timeout, cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::fs::create_dir_all(&self.lyrics_dir).await?;
        let path = absolute(&self.lyrics_dir.join(lyric_file_name(track, result)))?;
        tokio::fs::write(&path, &text).await?;

        let location = path_to_uri(&path);
        self.assign_unless_cancelled(track, &location, cancel).await?;
        tracing::info!(
            track = %track.display_name(),
            source = %result.source_id,
            %location,
            "assigned downloaded lyrics"
        );

        Ok(Accepted {
            location,
            path,
            text,
        })
    }

    pub async fn assign(&self, track: &TrackMetadata, location: &str) -> Result<()> {
        let track = track.clone();
        let location = location.to_string();
        self.with_db(move |db| db.assign(&track, &location)).await
    }

    /// Assign unless `cancel` fired, checked on the store thread right before
    /// the transaction.
    async fn assign_unless_cancelled(
        &self,
        track: &TrackMetadata,
        location: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let track = track.clone();
        let location = location.to_string();
        let cancel = cancel.clone();
        self.with_db(move |db| {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            db.assign(&track, &location)
        })
        .await
    }

    /// Assign a local file, stored as a `file://` URI.
    pub async fn assign_file(&self, track: &TrackMetadata, path: &Path) -> Result<String> {
        let location = path_to_uri(&absolute(path)?);
        self.assign(track, &location).await?;
        Ok(location)
    }

    /// Remember that the track has no lyrics so sources are not searched again.
    pub async fn assign_none(&self, track: &TrackMetadata) -> Result<()> {
        self.assign(track, "").await
    }

    pub async fn forget(&self, track: &TrackMetadata) -> Result<usize> {
        let track = track.clone();
        self.with_db(move |db| db.delete(&track)).await
    }

    /// Read an assigned lyric file.
    pub async fn load(&self, location: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(uri_to_path(location)).await?)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `Artist - Title.lrc`, preferring the track's own tags over the result's.
pub fn lyric_file_name(track: &TrackMetadata, result: &SearchResult) -> String {
    let pick = |own: Option<&str>, theirs: &str| {
        own.map(str::to_string)
            .or_else(|| Some(theirs.to_string()).filter(|s| !s.is_empty()))
    };
    let stem = match (pick(track.artist(), &result.artist), pick(track.title(), &result.title)) {
        (Some(a), Some(t)) => format!("{a} - {t}"),
        (None, Some(t)) => t,
        (Some(a), None) => a,
        (None, None) => "unknown".to_string(),
    };

    let safe: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.lrc", safe.trim().trim_start_matches('.'))
}

pub fn path_to_uri(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let encoded: Vec<String> = raw
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("file://{}", encoded.join("/"))
}

/// Accepts `file://` URIs and plain paths.
pub fn uri_to_path(location: &str) -> PathBuf {
    match location.strip_prefix("file://") {
        Some(rest) => match urlencoding::decode(rest) {
            Ok(decoded) => PathBuf::from(decoded.into_owned()),
            Err(_) => PathBuf::from(rest),
        },
        None => PathBuf::from(location),
    }
}
