use super::{LyricSource, SearchResult};
use crate::error::{Error, Result, SourceFailure};
use crate::track::TrackMetadata;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Merged results of one aggregate search.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Results in source declaration order, each source's own order kept.
    pub results: Vec<SearchResult>,
    /// Sources that failed and contributed nothing.
    pub failures: Vec<SourceFailure>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Queries a fixed list of sources as one.
#[derive(Clone, Default)]
pub struct Aggregator {
    sources: Vec<Arc<dyn LyricSource>>,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn LyricSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Arc<dyn LyricSource>] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Option<&Arc<dyn LyricSource>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Search every source concurrently and merge the results.
    ///
    /// A source that errors or exceeds `timeout` is recorded in
    /// `failures` and skipped. Only when every source fails is the whole
    /// search an error.
    pub async fn search(
        &self,
        track: &TrackMetadata,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome> {
        let searches = self.sources.iter().map(|source| async move {
            let result = match tokio::time::timeout(timeout, source.search(track)).await {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout),
            };
            (source.id().to_string(), result)
        });

        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            joined = join_all(searches) => joined,
        };

        let mut outcome = SearchOutcome::default();
        for (source_id, result) in joined {
            match result {
                Ok(results) => {
                    tracing::debug!(source = %source_id, count = results.len(), "source search done");
                    outcome.results.extend(results);
                }
                Err(error) => {
                    tracing::warn!(source = %source_id, %error, "lyric source search failed");
                    outcome.failures.push(SourceFailure { source_id, error });
                }
            }
        }

        if !self.sources.is_empty() && outcome.failures.len() == self.sources.len() {
            return Err(Error::AllSourcesFailed(outcome.failures));
        }
        Ok(outcome)
    }

    /// Download a result through the source that produced it.
    pub async fn download(
        &self,
        result: &SearchResult,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let source = self
            .source(&result.source_id)
            .ok_or_else(|| Error::UnknownSource(result.source_id.clone()))?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            r = tokio::time::timeout(timeout, source.download(&result.download_handle)) => {
                r.unwrap_or(Err(Error::Timeout))
            }
        }
    }
}
