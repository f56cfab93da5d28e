pub mod events;

use crate::error::Error;
use crate::lookup::{LyricsService, Resolution};
use crate::player::{PlaybackStatus, PlayerEvent};
use crate::track::TrackMetadata;
use events::LookupEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drives lookups from player notifications.
///
/// Each track change cancels the previous lookup and starts a new one in its
/// own task. Results of a cancelled lookup are never reported or assigned.
pub struct App {
    service: LyricsService,
    auto_download: bool,
    current: Option<(TrackMetadata, CancellationToken)>,
}

impl App {
    pub fn new(service: LyricsService, auto_download: bool) -> Self {
        Self {
            service,
            auto_download,
            current: None,
        }
    }

    pub async fn run(
        &mut self,
        mut rx: mpsc::Receiver<PlayerEvent>,
        tx: mpsc::Sender<LookupEvent>,
    ) {
        while let Some(ev) = rx.recv().await {
            match ev {
                PlayerEvent::TrackChanged(track) => self.on_track_changed(track, &tx),
                PlayerEvent::StatusChanged(status) => {
                    if status == PlaybackStatus::Stopped {
                        self.cancel_current();
                    }
                    let _ = tx.send(LookupEvent::Status(status)).await;
                }
            }
        }
        // End of feed: the lookup in flight still reports through its own
        // sender clone.
        if let Some((track, _)) = self.current.take() {
            tracing::debug!(track = %track.display_name(), "player feed closed");
        }
    }

    fn cancel_current(&mut self) {
        if let Some((track, cancel)) = self.current.take() {
            tracing::debug!(track = %track.display_name(), "cancel lyric lookup");
            cancel.cancel();
        }
    }

    fn on_track_changed(&mut self, track: TrackMetadata, tx: &mpsc::Sender<LookupEvent>) {
        if let Some((current, cancel)) = &self.current
            && current.same_track(&track)
            && !cancel.is_cancelled()
        {
            return;
        }
        self.cancel_current();

        let cancel = CancellationToken::new();
        self.current = Some((track.clone(), cancel.clone()));

        let service = self.service.clone();
        let auto_download = self.auto_download;
        let tx = tx.clone();
        tokio::spawn(async move {
            let event = lookup(&service, track, auto_download, &cancel).await;
            // A newer track took over while this one was in flight.
            if let Some(event) = event
                && !cancel.is_cancelled()
            {
                let _ = tx.send(event).await;
            }
        });
    }
}

async fn lookup(
    service: &LyricsService,
    track: TrackMetadata,
    auto_download: bool,
    cancel: &CancellationToken,
) -> Option<LookupEvent> {
    let resolution = match service.resolve(&track, cancel).await {
        Ok(r) => r,
        Err(Error::Cancelled) => return None,
        Err(e) => {
            return Some(LookupEvent::Failed {
                track,
                error: e.to_string(),
            });
        }
    };

    let outcome = match resolution {
        Resolution::Assigned { location } => {
            return Some(match service.load(&location).await {
                Ok(text) => LookupEvent::Loaded {
                    track,
                    location,
                    text,
                },
                Err(e) => LookupEvent::Failed {
                    track,
                    error: format!("read {location}: {e}"),
                },
            });
        }
        Resolution::Suppressed => return Some(LookupEvent::Suppressed { track }),
        Resolution::Candidates(outcome) if outcome.is_empty() => {
            return Some(LookupEvent::NotFound { track });
        }
        Resolution::Candidates(outcome) => outcome,
    };

    if !auto_download {
        return Some(LookupEvent::Candidates {
            track,
            results: outcome.results,
        });
    }

    // First candidate that actually downloads wins.
    for result in &outcome.results {
        match service.accept(&track, result, cancel).await {
            Ok(accepted) => {
                return Some(LookupEvent::Downloaded {
                    track,
                    location: accepted.location,
                    source_id: result.source_id.clone(),
                    text: accepted.text,
                });
            }
            Err(Error::Cancelled) => return None,
            Err(e) => {
                tracing::debug!(source = %result.source_id, error = %e, "candidate download failed");
            }
        }
    }
    Some(LookupEvent::NotFound { track })
}
