//! LRCLIB source
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use super::http::{check_status, SourceContext};
use super::{rank, text, LyricSource, SearchResult};
use crate::error::{Error, Result};
use crate::track::TrackMetadata;
use async_trait::async_trait;
use serde::Deserialize;

/// LRCLIB API record
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LrclibRecord {
    id: i64,
    #[serde(default)]
    track_name: String,
    #[serde(default)]
    artist_name: String,
    album_name: Option<String>,
    #[serde(default)]
    instrumental: bool,
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
}

impl LrclibRecord {
    /// Synced lyrics first, plain as a fallback.
    fn best_lyrics(&self) -> Option<&str> {
        [&self.synced_lyrics, &self.plain_lyrics]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|l| !l.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct LrclibSource {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibSource {
    pub const ID: &'static str = "lrclib";
    pub const NAME: &'static str = "LRCLIB";
    const DEFAULT_BASE_URL: &'static str = "https://lrclib.net/api";

    pub fn new(ctx: &SourceContext) -> Result<Self> {
        Self::with_base_url(ctx, Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(ctx: &SourceContext, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: ctx.build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, track: &TrackMetadata) -> Result<String> {
        let title = track.title();
        let artist = track.artist();

        let mut url = format!("{}/search?", self.base_url);
        match (title, artist) {
            (Some(t), Some(a)) => url.push_str(&format!(
                "track_name={}&artist_name={}",
                urlencoding::encode(t),
                urlencoding::encode(a)
            )),
            (Some(t), None) => url.push_str(&format!("track_name={}", urlencoding::encode(t))),
            (None, Some(a)) => url.push_str(&format!("q={}", urlencoding::encode(a))),
            (None, None) => {
                return Err(Error::InvalidQuery("need a title or an artist".into()));
            }
        }
        Ok(url)
    }

    fn to_result(&self, record: LrclibRecord) -> SearchResult {
        SearchResult {
            download_handle: format!("{}/get/{}", self.base_url, record.id),
            title: record.track_name,
            artist: record.artist_name,
            album: record.album_name.unwrap_or_default(),
            source_id: Self::ID.to_string(),
        }
    }
}

#[async_trait]
impl LyricSource for LrclibSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, track: &TrackMetadata) -> Result<Vec<SearchResult>> {
        let url = self.search_url(track)?;
        tracing::debug!(%url, "lrclib search");

        let response = check_status(self.client.get(&url).send().await?)?;
        let records: Vec<LrclibRecord> = response.json().await?;

        // Instrumentals and empty entries have nothing to show.
        let mut results: Vec<SearchResult> = records
            .into_iter()
            .filter(|r| !r.instrumental && r.best_lyrics().is_some())
            .map(|r| self.to_result(r))
            .collect();
        rank::prioritize_artist(&mut results, track);
        Ok(results)
    }

    async fn download(&self, handle: &str) -> Result<String> {
        let response = check_status(self.client.get(handle).send().await?)?;
        let record: LrclibRecord = response.json().await?;

        if record.instrumental {
            return Err(Error::NoLyricAvailable);
        }
        record
            .best_lyrics()
            .map(text::normalize)
            .ok_or(Error::NoLyricAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::test_server;
    use serde_json::json;

    fn record(id: i64, artist: &str, synced: Option<&str>, instrumental: bool) -> serde_json::Value {
        json!({
            "id": id,
            "trackName": "Halo",
            "artistName": artist,
            "albumName": "I Am... Sasha Fierce",
            "duration": 261.0,
            "instrumental": instrumental,
            "plainLyrics": synced.map(|_| "Remember those walls I built"),
            "syncedLyrics": synced,
        })
    }

    #[test]
    fn test_search_url_encoding() {
        let src = LrclibSource::with_base_url(&SourceContext::default(), "http://x/api/").unwrap();
        let track = TrackMetadata::new().with_title("Halo & Co").with_artist("Beyoncé");
        assert_eq!(
            src.search_url(&track).unwrap(),
            "http://x/api/search?track_name=Halo%20%26%20Co&artist_name=Beyonc%C3%A9"
        );
        assert!(matches!(
            src.search_url(&TrackMetadata::new()),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_search_filters_and_ranks() {
        let body = json!([
            record(1, "Cover Band", Some("[00:01.00]Remember"), false),
            record(2, "Beyonce", None, false),
            record(3, "Beyoncé", Some("[00:01.00]Remember"), false),
            record(4, "Beyonce", Some("[00:01.00]la"), true),
        ])
        .to_string();
        let server = test_server::serve(move |_| (200, body.clone())).await;
        let src = LrclibSource::with_base_url(&SourceContext::default(), &server.base_url).unwrap();

        let track = TrackMetadata::new().with_title("Halo").with_artist("Beyonce");
        let results = src.search(&track).await.unwrap();

        let handles: Vec<_> = results.iter().map(|r| r.download_handle.as_str()).collect();
        assert_eq!(
            handles,
            vec![
                format!("{}/get/3", server.base_url),
                format!("{}/get/1", server.base_url)
            ]
        );
        assert_eq!(results[0].source_id, "lrclib");
        assert_eq!(results[0].album, "I Am... Sasha Fierce");
        assert!(server.requests()[0].target.starts_with("/search?track_name=Halo"));
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let server = test_server::serve(|_| (500, "oops".to_string())).await;
        let src = LrclibSource::with_base_url(&SourceContext::default(), &server.base_url).unwrap();
        let err = src
            .search(&TrackMetadata::new().with_title("Halo"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_search_malformed_payload() {
        let server = test_server::serve(|_| (200, "{\"not\":\"a list\"}".to_string())).await;
        let src = LrclibSource::with_base_url(&SourceContext::default(), &server.base_url).unwrap();
        let err = src
            .search(&TrackMetadata::new().with_title("Halo"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_download() {
        let server = test_server::serve(|req| {
            let body = match req.target.as_str() {
                "/get/3" => record(3, "Beyonce", Some("[00:01.00]Remember\r\n"), false),
                "/get/4" => record(4, "Beyonce", Some("[00:01.00]la"), true),
                _ => record(5, "Beyonce", None, false),
            };
            (200, body.to_string())
        })
        .await;
        let src = LrclibSource::with_base_url(&SourceContext::default(), &server.base_url).unwrap();

        let text = src
            .download(&format!("{}/get/3", server.base_url))
            .await
            .unwrap();
        assert_eq!(text, "[00:01.00]Remember\n");

        let err = src
            .download(&format!("{}/get/4", server.base_url))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoLyricAvailable));

        let err = src
            .download(&format!("{}/get/5", server.base_url))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoLyricAvailable));
    }
}
