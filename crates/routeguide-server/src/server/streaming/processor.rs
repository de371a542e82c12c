use crate::server::{
    store::{FeatureStore, RouteNoteLog},
    telemetry::{increment_route_notes, increment_stream_errors},
};
use core::time::Duration;
use futures::{Stream, StreamExt, TryStreamExt};
use routeguide_core::{
    Error,
    proto::{Point, RouteNote, RouteSummary},
};
use std::{sync::Arc, time::Instant};
use tokio::sync::mpsc;
use tonic::Status;

/// Running totals for a `RecordRoute` call.
#[derive(Debug, Default)]
pub struct RouteTracker {
    point_count: i32,
    feature_count: i32,
    distance: i32,
    last_point: Option<Point>,
}

impl RouteTracker {
    /// Folds one more point of the route into the totals.
    ///
    /// `feature_count` goes up for every point, whether or not a feature is
    /// found there; the lookup still runs.
    pub fn record(&mut self, features: &FeatureStore, point: Point) {
        self.point_count = self.point_count.saturating_add(1);

        let feature = features.get_at(&point);
        tracing::trace!(found = feature.is_found(), "[RecordRoute] lookup");
        self.feature_count = self.feature_count.saturating_add(1);

        if let Some(last) = &self.last_point {
            self.distance = self.distance.saturating_add(last.distance_to(&point));
        }
        self.last_point = Some(point);
    }

    pub fn finish(self, elapsed: Duration) -> RouteSummary {
        RouteSummary {
            point_count: self.point_count,
            feature_count: self.feature_count,
            distance: self.distance,
            elapsed_time: i32::try_from(elapsed.as_secs()).unwrap_or(i32::MAX),
        }
    }
}

/// Consumes a client's route until it half-closes and summarizes it.
///
/// A single summary is produced only after the whole route arrived; if the
/// stream fails first the error is returned and nothing is summarized.
pub async fn summarize_route<S>(
    features: &FeatureStore,
    mut points: S,
) -> Result<RouteSummary, Status>
where
    S: Stream<Item = Result<Point, Status>> + Unpin,
{
    let start = Instant::now();
    let mut tracker = RouteTracker::default();

    while let Some(point) = points.try_next().await.inspect_err(|_| {
        increment_stream_errors();
    })? {
        tracing::debug!(
            latitude = point.latitude,
            longitude = point.longitude,
            "[RecordRoute] (req)"
        );
        tracker.record(features, point);
    }

    Ok(tracker.finish(start.elapsed()))
}

/// Drives one `RouteChat` call.
///
/// For every inbound note the acknowledged note is appended to the log and
/// the location's full history (the new note last) is sent back one message
/// at a time. Returns when the client half-closes its side.
///
/// # Errors
///
/// Returns [`Error::StreamTransport`] when the inbound stream fails (the
/// status is forwarded to the client on a best-effort basis) or when the
/// response stream is dropped.
pub async fn relay_notes<S>(
    mut inbound: S,
    note_log: Arc<RouteNoteLog>,
    resp_tx: mpsc::Sender<Result<RouteNote, Status>>,
) -> routeguide_core::Result<()>
where
    S: Stream<Item = Result<RouteNote, Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            next = inbound.next() => next,
            () = resp_tx.closed() => {
                return Err(Error::StreamTransport {
                    context: "Client dropped the response stream".to_string(),
                });
            }
        };

        let note = match next {
            None => return Ok(()),
            Some(Ok(note)) => note,
            Some(Err(status)) => {
                let context = format!("Inbound note stream failed: {}", status.message());
                if let Err(_e) = resp_tx.send(Err(status)).await {
                    tracing::debug!("Failed to forward err: {_e}");
                }
                return Err(Error::StreamTransport { context });
            }
        };

        tracing::debug!(message = %note.message, "[RouteChat] (req)");
        let history = note_log.append_and_snapshot(note);
        increment_route_notes();

        for note in history {
            if let Err(e) = resp_tx.send(Ok(note)).await {
                return Err(Error::StreamTransport {
                    context: format!("Failed to forward note: {e}"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::wrappers::ReceiverStream;

    fn store() -> FeatureStore {
        FeatureStore::load(
            r#"[{"name": "A", "location": {"latitude": 10, "longitude": 20}}]"#,
        )
        .unwrap()
    }

    fn note(lat: i32, lon: i32, message: &str) -> RouteNote {
        RouteNote {
            location: Some(Point::new(lat, lon)),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_route_summary() {
        let summary = summarize_route(&store(), futures::stream::empty())
            .await
            .unwrap();
        assert_eq!(summary.point_count, 0);
        assert_eq!(summary.feature_count, 0);
        assert_eq!(summary.distance, 0);
        assert!(summary.elapsed_time >= 0);
    }

    #[tokio::test]
    async fn two_point_route_uses_route_distance() {
        let p1 = Point::new(500, 300);
        let p2 = Point::new(0, 0);
        let points = futures::stream::iter([Ok(p1), Ok(p2)]);

        let summary = summarize_route(&store(), points).await.unwrap();
        assert_eq!(summary.point_count, 2);
        // sqrt(500² - 300²) = 400
        assert_eq!(summary.distance, 400);
    }

    #[tokio::test]
    async fn feature_count_ignores_hits_and_misses() {
        let points = futures::stream::iter([
            Ok(Point::new(10, 20)),
            Ok(Point::new(1, 1)),
            Ok(Point::new(2, 2)),
        ]);

        let summary = summarize_route(&store(), points).await.unwrap();
        assert_eq!(summary.point_count, 3);
        assert_eq!(summary.feature_count, 3);
    }

    #[tokio::test]
    async fn negative_radicand_adds_nothing() {
        let points = futures::stream::iter([Ok(Point::new(0, 0)), Ok(Point::new(1, 100))]);
        let summary = summarize_route(&store(), points).await.unwrap();
        assert_eq!(summary.distance, 0);
    }

    #[tokio::test]
    async fn stream_error_yields_no_summary() {
        let points = futures::stream::iter([
            Ok(Point::new(1, 1)),
            Err(Status::aborted("peer reset")),
            Ok(Point::new(2, 2)),
        ]);

        let status = summarize_route(&store(), points).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::Aborted);
    }

    #[tokio::test]
    async fn relay_echoes_location_history() {
        let log = Arc::new(RouteNoteLog::new());

        // First caller leaves N1 at K.
        let (tx, rx) = mpsc::channel(16);
        let inbound = futures::stream::iter([Ok(note(5, 5, "N1 ack=0"))]);
        relay_notes(inbound, Arc::clone(&log), tx).await.unwrap();
        let first: Vec<_> = ReceiverStream::new(rx)
            .map(|n| n.unwrap().message)
            .collect()
            .await;
        assert_eq!(first, ["N1 ack=1"]);

        // Second caller leaves N2 at K and a note at another key.
        let (tx, rx) = mpsc::channel(16);
        let inbound = futures::stream::iter([
            Ok(note(5, 5, "N2 ack=0")),
            Ok(note(6, 5, "elsewhere")),
        ]);
        relay_notes(inbound, Arc::clone(&log), tx).await.unwrap();
        let second: Vec<_> = ReceiverStream::new(rx)
            .map(|n| n.unwrap().message)
            .collect()
            .await;
        assert_eq!(second, ["N1 ack=1", "N2 ack=1", "elsewhere"]);
    }

    #[tokio::test]
    async fn relay_amplifies_per_inbound_note() {
        let log = Arc::new(RouteNoteLog::new());
        let (tx, rx) = mpsc::channel(64);
        let inbound = futures::stream::iter((0..4).map(|i| Ok(note(1, 2, &format!("#{i}")))));

        relay_notes(inbound, log, tx).await.unwrap();
        let received = ReceiverStream::new(rx).count().await;
        // 1 + 2 + 3 + 4
        assert_eq!(received, 10);
    }

    #[tokio::test]
    async fn relay_forwards_inbound_errors() {
        let log = Arc::new(RouteNoteLog::new());
        let (tx, mut rx) = mpsc::channel(16);
        let inbound = futures::stream::iter([
            Ok(note(1, 1, "before")),
            Err(Status::cancelled("gone")),
        ]);

        let err = relay_notes(inbound, log, tx).await.unwrap_err();
        assert!(matches!(err, Error::StreamTransport { .. }));

        assert_eq!(rx.recv().await.unwrap().unwrap().message, "before");
        let status = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(status.code(), tonic::Code::Cancelled);
    }

    #[tokio::test]
    async fn relay_stops_when_client_leaves() {
        let log = Arc::new(RouteNoteLog::new());
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let err = relay_notes(futures::stream::pending(), log, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StreamTransport { .. }));
    }
}
