//! gRPC service implementation for the route guide.
//!
//! This module defines [`RouteGuideService`], the concrete implementation of
//! the [`RouteGuide`] service from the protobuf definition. It owns the two
//! pieces of shared state and hands them to the stream-level logic in
//! [`crate::server::streaming`].
//!
//! ## Responsibilities
//!
//! - Answer `GetFeature` from the read-only [`FeatureStore`].
//! - Spawn a producer per `ListFeatures` and `RouteChat` call, bridged to the
//!   response stream by a bounded channel.
//! - Summarize `RecordRoute` inline once the client half-closes.
//! - Tag every response with the configured `server` name.

use crate::server::{
    config::ServerConfig,
    store::{FeatureStore, RouteNoteLog},
    streaming::{
        coordinator::feed_features,
        processor::{relay_notes, summarize_route},
    },
    telemetry::{increment_calls, increment_stream_errors},
};
use core::pin::Pin;
use routeguide_core::proto::{
    Feature, Point, Rectangle, RouteNote, RouteSummary, SERVER_METADATA_KEY,
    route_guide_server::RouteGuide,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{
    Request, Response, Status, Streaming,
    metadata::{Ascii, MetadataValue},
};

/// The route guide service.
///
/// Cheap to clone: the feature store and note log are shared behind `Arc`s,
/// so every connection and call sees the same state.
#[derive(Clone)]
pub struct RouteGuideService {
    config: ServerConfig,
    features: Arc<FeatureStore>,
    note_log: Arc<RouteNoteLog>,
    server_name: Option<MetadataValue<Ascii>>,
}

impl RouteGuideService {
    pub fn new(config: ServerConfig, features: FeatureStore) -> Self {
        let server_name = config
            .server_name
            .as_deref()
            .and_then(|name| name.parse().ok());

        Self {
            config,
            features: Arc::new(features),
            note_log: Arc::new(RouteNoteLog::new()),
            server_name,
        }
    }

    fn respond<T>(&self, message: T) -> Response<T> {
        let mut response = Response::new(message);
        if let Some(name) = &self.server_name {
            response
                .metadata_mut()
                .insert(SERVER_METADATA_KEY, name.clone());
        }
        response
    }
}

#[tonic::async_trait]
impl RouteGuide for RouteGuideService {
    type ListFeaturesStream = Pin<Box<dyn Stream<Item = Result<Feature, Status>> + Send>>;
    type RouteChatStream = Pin<Box<dyn Stream<Item = Result<RouteNote, Status>> + Send>>;

    /// Returns the feature at the requested point, or an unnamed feature if
    /// there is none. Never fails.
    #[tracing::instrument(skip_all, fields(latitude = req.get_ref().latitude, longitude = req.get_ref().longitude))]
    async fn get_feature(&self, req: Request<Point>) -> Result<Response<Feature>, Status> {
        increment_calls("GetFeature");
        let feature = self.features.get_at(req.get_ref());
        tracing::info!(name = %feature.name, "[GetFeature] (resp)");
        Ok(self.respond(feature))
    }

    /// Streams the features inside the requested rectangle.
    #[tracing::instrument(skip_all)]
    async fn list_features(
        &self,
        req: Request<Rectangle>,
    ) -> Result<Response<Self::ListFeaturesStream>, Status> {
        increment_calls("ListFeatures");
        let rect = req.into_inner();
        tracing::info!(?rect, "[ListFeatures] (req)");

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let features = Arc::clone(&self.features);

        tokio::spawn(async move {
            match feed_features(features, rect, resp_tx).await {
                Ok(sent) => tracing::debug!(sent, "[ListFeatures] done"),
                Err(e) => {
                    increment_stream_errors();
                    tracing::warn!("[ListFeatures] aborted: {e}");
                }
            }
        });

        let stream: Self::ListFeaturesStream = Box::pin(ReceiverStream::new(resp_rx));
        Ok(self.respond(stream))
    }

    /// Summarizes a streamed route once the client finishes sending it.
    #[tracing::instrument(skip_all)]
    async fn record_route(
        &self,
        req: Request<Streaming<Point>>,
    ) -> Result<Response<RouteSummary>, Status> {
        increment_calls("RecordRoute");
        let summary = summarize_route(&self.features, req.into_inner()).await?;
        tracing::info!(?summary, "[RecordRoute] (resp)");
        Ok(self.respond(summary))
    }

    /// Records each inbound note and replies with every note left at the same
    /// location so far.
    #[tracing::instrument(skip_all)]
    async fn route_chat(
        &self,
        req: Request<Streaming<RouteNote>>,
    ) -> Result<Response<Self::RouteChatStream>, Status> {
        increment_calls("RouteChat");
        let inbound = req.into_inner();

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let note_log = Arc::clone(&self.note_log);

        tokio::spawn(async move {
            if let Err(e) = relay_notes(inbound, note_log, resp_tx).await {
                increment_stream_errors();
                tracing::warn!("[RouteChat] aborted: {e}");
            }
        });

        let stream: Self::RouteChatStream = Box::pin(ReceiverStream::new(resp_rx));
        Ok(self.respond(stream))
    }
}
