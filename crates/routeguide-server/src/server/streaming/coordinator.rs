use crate::server::store::FeatureStore;
use routeguide_core::{
    Error,
    proto::{Feature, Rectangle},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tonic::Status;

/// Streams every feature inside `rect` to the client, in store order.
///
/// Each match is sent individually as soon as the channel has room, so a
/// client that disconnects part way has already received the first matches.
/// Nothing is retried or replayed.
///
/// # Arguments
///
/// - `features`: Shared, read-only feature dataset.
/// - `rect`: Area requested by the client (corners in any order).
/// - `resp_tx`: Channel backing the gRPC response stream.
///
/// # Errors
///
/// Returns [`Error::StreamTransport`] if the response stream was dropped
/// (client gone or call cancelled) before every match was delivered.
pub async fn feed_features(
    features: Arc<FeatureStore>,
    rect: Rectangle,
    resp_tx: mpsc::Sender<Result<Feature, Status>>,
) -> routeguide_core::Result<usize> {
    let mut sent = 0;

    for feature in features.list_within(&rect) {
        tracing::debug!(name = %feature.name, "[ListFeatures] (resp)");
        if let Err(e) = resp_tx.send(Ok(feature.clone())).await {
            return Err(Error::StreamTransport {
                context: format!("Failed to forward feature after {sent} sent: {e}"),
            });
        }
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeguide_core::proto::Point;

    fn store() -> Arc<FeatureStore> {
        Arc::new(
            FeatureStore::load(
                r#"[
                    {"name": "A", "location": {"latitude": 1, "longitude": 1}},
                    {"name": "B", "location": {"latitude": 2, "longitude": 2}},
                    {"name": "C", "location": {"latitude": 50, "longitude": 50}},
                    {"name": "D", "location": {"latitude": 3, "longitude": 3}}
                ]"#,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn streams_matches_in_store_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let rect = Rectangle::new(Point::new(10, 10), Point::new(0, 0));

        let sent = feed_features(store(), rect, tx).await.unwrap();
        assert_eq!(sent, 3);

        let mut names = Vec::new();
        while let Some(feature) = rx.recv().await {
            names.push(feature.unwrap().name);
        }
        assert_eq!(names, ["A", "B", "D"]);
    }

    #[tokio::test]
    async fn partial_delivery_when_client_leaves() {
        let (tx, mut rx) = mpsc::channel(1);
        let rect = Rectangle::new(Point::new(10, 10), Point::new(0, 0));

        let feeder = tokio::spawn(feed_features(store(), rect, tx));

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.name, "A");
        drop(rx);

        let err = feeder.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::StreamTransport { .. }));
    }
}
