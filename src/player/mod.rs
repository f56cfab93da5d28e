//! Notifications from the media player side.
//!
//! Player control lives outside this crate. Whatever talks to the player
//! reports what it sees as `PlayerEvent`s on a channel; `read_feed` adapts a
//! JSON-lines stream (one event object per line) into that channel.

use crate::track::TrackMetadata;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackChanged(TrackMetadata),
    StatusChanged(PlaybackStatus),
}

/// One line of the JSON feed.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum FeedLine {
    TrackChanged {
        #[serde(default)]
        metadata: TrackMetadata,
    },
    StatusChanged {
        status: PlaybackStatus,
    },
}

pub fn parse_feed_line(line: &str) -> serde_json::Result<PlayerEvent> {
    Ok(match serde_json::from_str::<FeedLine>(line)? {
        FeedLine::TrackChanged { metadata } => PlayerEvent::TrackChanged(metadata),
        FeedLine::StatusChanged { status } => PlayerEvent::StatusChanged(status),
    })
}

/// Pump feed lines into `tx` until the reader ends or the receiver is gone.
pub async fn read_feed<R>(reader: R, tx: mpsc::Sender<PlayerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "player feed read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_feed_line(&line) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, %line, "ignoring malformed player event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feed_line() {
        let ev = parse_feed_line(
            r#"{"event":"track_changed","metadata":{"title":"Tiger","tracknum":"3","location":"file:///a.mp3"}}"#,
        )
        .unwrap();
        assert_eq!(
            ev,
            PlayerEvent::TrackChanged(
                TrackMetadata::new()
                    .with_title("Tiger")
                    .with_tracknum(3)
                    .with_location("file:///a.mp3")
            )
        );

        let ev = parse_feed_line(r#"{"event":"status_changed","status":"paused"}"#).unwrap();
        assert_eq!(ev, PlayerEvent::StatusChanged(PlaybackStatus::Paused));

        assert!(parse_feed_line(r#"{"event":"seeked"}"#).is_err());
    }

    #[tokio::test]
    async fn test_read_feed_skips_bad_lines() {
        let input = concat!(
            "{\"event\":\"status_changed\",\"status\":\"playing\"}\n",
            "not json\n",
            "\n",
            "{\"event\":\"track_changed\"}\n",
        );
        let (tx, mut rx) = mpsc::channel(8);
        read_feed(input.as_bytes(), tx).await;

        assert_eq!(
            rx.recv().await,
            Some(PlayerEvent::StatusChanged(PlaybackStatus::Playing))
        );
        assert_eq!(
            rx.recv().await,
            Some(PlayerEvent::TrackChanged(TrackMetadata::default()))
        );
        assert_eq!(rx.recv().await, None);
    }
}
