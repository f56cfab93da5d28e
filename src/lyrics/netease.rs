//! Netease Cloud Music source
//!
//! Search goes through the public web API, which answers ten songs per page
//! together with the total match count.

use super::http::{check_status, SourceContext};
use super::{text, LyricSource, SearchResult};
use crate::error::{Error, Result};
use crate::track::TrackMetadata;
use async_trait::async_trait;
use serde::Deserialize;

const PAGE_SIZE: u64 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Option<SearchPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    songs: Vec<Song>,
    #[serde(default)]
    song_count: u64,
}

#[derive(Debug, Deserialize)]
struct Song {
    id: u64,
    name: String,
    #[serde(default)]
    artists: Vec<Named>,
    album: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct LyricResponse {
    #[serde(default)]
    nolyric: bool,
    #[serde(default)]
    uncollected: bool,
    lrc: Option<LyricBody>,
    tlyric: Option<LyricBody>,
}

#[derive(Debug, Deserialize)]
struct LyricBody {
    lyric: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NeteaseSource {
    client: reqwest::Client,
    base_url: String,
    translated: bool,
}

impl NeteaseSource {
    pub const ID: &'static str = "netease";
    pub const TRANSLATED_ID: &'static str = "netease_tr";
    pub const NAME: &'static str = "Netease";
    pub const TRANSLATED_NAME: &'static str = "Netease (translated)";
    const DEFAULT_BASE_URL: &'static str = "https://music.163.com";

    pub fn new(ctx: &SourceContext) -> Result<Self> {
        Self::with_base_url(ctx, Self::DEFAULT_BASE_URL, false)
    }

    /// Variant that prefers the translated lyric when Netease has one.
    pub fn translated(ctx: &SourceContext) -> Result<Self> {
        Self::with_base_url(ctx, Self::DEFAULT_BASE_URL, true)
    }

    pub fn with_base_url(
        ctx: &SourceContext,
        base_url: impl Into<String>,
        translated: bool,
    ) -> Result<Self> {
        Ok(Self {
            client: ctx.build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            translated,
        })
    }

    fn search_keyword(track: &TrackMetadata) -> Result<String> {
        let keys: Vec<&str> = [track.title(), track.artist()].into_iter().flatten().collect();
        if keys.is_empty() {
            return Err(Error::InvalidQuery("need a title or an artist".into()));
        }
        Ok(keys
            .iter()
            .map(|k| urlencoding::encode(k).into_owned())
            .collect::<Vec<_>>()
            .join("+"))
    }

    async fn search_page(&self, keyword: &str, offset: u64) -> Result<SearchPage> {
        let url = format!("{}/api/search/get", self.base_url);
        let mut body = format!("s={keyword}&type=1");
        if offset > 0 {
            body.push_str(&format!("&offset={offset}"));
        }
        tracing::debug!(%url, %body, "netease search");

        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;
        let parsed: SearchResponse = check_status(response)?.json().await?;
        parsed
            .result
            .ok_or_else(|| Error::Parse("netease search response has no result".into()))
    }

    fn to_result(&self, song: Song) -> SearchResult {
        let artist = song
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default();
        SearchResult {
            download_handle: format!(
                "{}/api/song/lyric?id={}&lv=-1&kv=-1&tv=-1",
                self.base_url, song.id
            ),
            title: song.name,
            artist,
            album: song.album.map(|a| a.name).unwrap_or_default(),
            source_id: self.id().to_string(),
        }
    }
}

#[async_trait]
impl LyricSource for NeteaseSource {
    fn id(&self) -> &str {
        if self.translated {
            Self::TRANSLATED_ID
        } else {
            Self::ID
        }
    }

    fn name(&self) -> &str {
        if self.translated {
            Self::TRANSLATED_NAME
        } else {
            Self::NAME
        }
    }

    async fn search(&self, track: &TrackMetadata) -> Result<Vec<SearchResult>> {
        let keyword = Self::search_keyword(track)?;

        let first = self.search_page(&keyword, 0).await?;
        let total = first.song_count;
        let mut songs = first.songs;

        // The second page is the last one worth showing.
        if total > PAGE_SIZE {
            let second = self.search_page(&keyword, PAGE_SIZE).await?;
            songs.extend(second.songs);
        }

        Ok(songs.into_iter().map(|s| self.to_result(s)).collect())
    }

    async fn download(&self, handle: &str) -> Result<String> {
        let response = check_status(self.client.get(handle).send().await?)?;
        let parsed: LyricResponse = response.json().await?;

        if parsed.nolyric || parsed.uncollected {
            return Err(Error::NoLyricAvailable);
        }

        let translated = self
            .translated
            .then(|| parsed.tlyric.and_then(|t| t.lyric))
            .flatten()
            .filter(|l| !l.trim().is_empty());
        let lyric = match translated {
            Some(l) => l,
            None => parsed
                .lrc
                .and_then(|l| l.lyric)
                .ok_or_else(|| Error::Parse("netease lyric response has no lrc".into()))?,
        };
        Ok(text::normalize(&lyric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::test_server;
    use serde_json::json;

    fn songs(range: std::ops::Range<u64>) -> Vec<serde_json::Value> {
        range
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Song {id}"),
                    "artists": [{"name": "Artist"}, {"name": "Feat"}],
                    "album": {"name": "Album"},
                })
            })
            .collect()
    }

    #[test]
    fn test_search_keyword() {
        let track = TrackMetadata::new().with_title("Red Bean").with_artist("Faye Wong");
        assert_eq!(
            NeteaseSource::search_keyword(&track).unwrap(),
            "Red%20Bean+Faye%20Wong"
        );
        assert!(NeteaseSource::search_keyword(&TrackMetadata::new()).is_err());
    }

    #[tokio::test]
    async fn test_search_collects_both_pages_in_order() {
        let server = test_server::serve(|req| {
            let page = if req.body.contains("offset=10") {
                songs(10..12)
            } else {
                songs(0..10)
            };
            (
                200,
                json!({"result": {"songs": page, "songCount": 12}, "code": 200}).to_string(),
            )
        })
        .await;
        let src =
            NeteaseSource::with_base_url(&SourceContext::default(), &server.base_url, false).unwrap();

        let results = src
            .search(&TrackMetadata::new().with_title("Song").with_artist("Artist"))
            .await
            .unwrap();

        assert_eq!(results.len(), 12);
        let titles: Vec<_> = results.iter().map(|r| r.title.clone()).collect();
        let expected: Vec<_> = (0..12).map(|i| format!("Song {i}")).collect();
        assert_eq!(titles, expected);
        assert_eq!(results[0].artist, "Artist");
        assert_eq!(results[0].album, "Album");
        assert_eq!(
            results[11].download_handle,
            format!("{}/api/song/lyric?id=11&lv=-1&kv=-1&tv=-1", server.base_url)
        );

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method == "POST"));
        assert_eq!(requests[0].body, "s=Song+Artist&type=1");
    }

    #[tokio::test]
    async fn test_search_single_page() {
        let server = test_server::serve(|_| {
            (
                200,
                json!({"result": {"songs": songs(0..3), "songCount": 3}}).to_string(),
            )
        })
        .await;
        let src =
            NeteaseSource::with_base_url(&SourceContext::default(), &server.base_url, false).unwrap();
        let results = src
            .search(&TrackMetadata::new().with_title("Song"))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_without_result_is_parse_error() {
        let server = test_server::serve(|_| (200, json!({"code": 400}).to_string())).await;
        let src =
            NeteaseSource::with_base_url(&SourceContext::default(), &server.base_url, false).unwrap();
        let err = src
            .search(&TrackMetadata::new().with_title("Song"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_download_variants() {
        let server = test_server::serve(|req| {
            let body = if req.target.contains("id=1&") {
                json!({"lrc": {"lyric": "[00:01.00]原文"}, "tlyric": {"lyric": "[00:01.00]Original"}})
            } else if req.target.contains("id=2&") {
                json!({"lrc": {"lyric": "[00:01.00]原文"}, "tlyric": {"lyric": ""}})
            } else if req.target.contains("id=3&") {
                json!({"nolyric": true})
            } else if req.target.contains("id=4&") {
                json!({"uncollected": true})
            } else {
                json!({"code": 200})
            };
            (200, body.to_string())
        })
        .await;
        let plain =
            NeteaseSource::with_base_url(&SourceContext::default(), &server.base_url, false).unwrap();
        let translated =
            NeteaseSource::with_base_url(&SourceContext::default(), &server.base_url, true).unwrap();
        let handle = |id: u32| format!("{}/api/song/lyric?id={id}&lv=-1&kv=-1&tv=-1", server.base_url);

        assert_eq!(plain.download(&handle(1)).await.unwrap(), "[00:01.00]原文\n");
        assert_eq!(
            translated.download(&handle(1)).await.unwrap(),
            "[00:01.00]Original\n"
        );
        assert_eq!(translated.download(&handle(2)).await.unwrap(), "[00:01.00]原文\n");
        assert!(matches!(
            plain.download(&handle(3)).await,
            Err(Error::NoLyricAvailable)
        ));
        assert!(matches!(
            plain.download(&handle(4)).await,
            Err(Error::NoLyricAvailable)
        ));
        assert!(matches!(plain.download(&handle(5)).await, Err(Error::Parse(_))));
        assert_eq!(translated.id(), "netease_tr");
    }
}
