//! In-memory source for aggregator and lookup tests.

use super::{LyricSource, SearchResult};
use crate::error::{Error, Result};
use crate::track::TrackMetadata;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum Behavior {
    Pages(Vec<Vec<SearchResult>>),
    Fail(u16),
    Hang,
}

pub struct FakeSource {
    id: String,
    behavior: Behavior,
    delay: Option<Duration>,
    pub downloads: AtomicUsize,
}

/// `n` results from `source_id` with handles `source_id/0..n`.
pub fn candidates(source_id: &str, n: usize) -> Vec<SearchResult> {
    (0..n)
        .map(|i| SearchResult {
            title: format!("Title {i}"),
            artist: "Soldier".into(),
            album: String::new(),
            source_id: source_id.into(),
            download_handle: format!("{source_id}/{i}"),
        })
        .collect()
}

impl FakeSource {
    fn new(id: &str, behavior: Behavior) -> Self {
        Self {
            id: id.into(),
            behavior,
            delay: None,
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn results(id: &str, results: Vec<SearchResult>) -> Self {
        Self::new(id, Behavior::Pages(vec![results]))
    }

    pub fn paged(id: &str, pages: Vec<Vec<SearchResult>>) -> Self {
        Self::new(id, Behavior::Pages(pages))
    }

    pub fn failing(id: &str, status: u16) -> Self {
        Self::new(id, Behavior::Fail(status))
    }

    pub fn hanging(id: &str) -> Self {
        Self::new(id, Behavior::Hang)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LyricSource for FakeSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Fake"
    }

    async fn search(&self, _track: &TrackMetadata) -> Result<Vec<SearchResult>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Pages(pages) => {
                let mut all = Vec::new();
                for page in pages {
                    tokio::task::yield_now().await;
                    all.extend(page.iter().cloned());
                }
                Ok(all)
            }
            Behavior::Fail(status) => Err(Error::Transport {
                status: Some(*status),
                reason: "fake failure".into(),
            }),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn download(&self, handle: &str) -> Result<String> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if handle.ends_with("/nolyric") {
            return Err(Error::NoLyricAvailable);
        }
        Ok(format!("[00:01.00]lyrics from {handle}\n"))
    }
}
