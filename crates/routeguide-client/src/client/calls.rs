//! One function per route guide operation, each sending synthetic payloads
//! and logging every response with the replica that produced it.

use crate::client::{
    config::Api,
    driver::Caller,
    payload::{NOTES_PER_CHAT, chat_note, random_point, random_rectangle, random_route},
};
use core::future::Future;
use routeguide_core::{
    Error,
    proto::{SERVER_METADATA_KEY, route_guide_client::RouteGuideClient},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Status, codec::CompressionEncoding, metadata::MetadataMap, transport::Channel};

/// Shown when a response carries no `server` metadata.
const UNKNOWN_SERVER: &str = "unknown";

fn server_name(metadata: &MetadataMap) -> &str {
    metadata
        .get(SERVER_METADATA_KEY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN_SERVER)
}

/// Issues route guide calls over a shared channel.
#[derive(Clone)]
pub struct RouteGuideCaller {
    client: RouteGuideClient<Channel>,
}

impl RouteGuideCaller {
    pub fn new(channel: Channel) -> Self {
        let client = RouteGuideClient::new(channel)
            .send_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Gzip);
        Self { client }
    }

    pub async fn get_feature(&mut self) -> Result<(), Status> {
        let point = random_point();
        tracing::info!(?point, "[GetFeature] (req)");

        let response = self.client.get_feature(point).await?;
        let server = server_name(response.metadata()).to_string();
        tracing::info!(%server, feature = ?response.get_ref(), "[GetFeature] (resp)");
        Ok(())
    }

    pub async fn list_features(&mut self) -> Result<(), Status> {
        let rect = random_rectangle();
        tracing::info!(?rect, "[ListFeatures] (req)");

        let response = self.client.list_features(rect).await?;
        let server = server_name(response.metadata()).to_string();
        let mut features = response.into_inner();
        while let Some(feature) = features.message().await? {
            tracing::info!(%server, ?feature, "[ListFeatures] (resp)");
        }
        Ok(())
    }

    pub async fn record_route(&mut self) -> Result<(), Status> {
        let route = random_route();
        for point in &route {
            tracing::info!(?point, "[RecordRoute] (req)");
        }

        let response = self.client.record_route(tokio_stream::iter(route)).await?;
        let server = server_name(response.metadata()).to_string();
        tracing::info!(%server, summary = ?response.get_ref(), "[RecordRoute] (resp)");
        Ok(())
    }

    /// Sends [`NOTES_PER_CHAT`] notes, reading one reply after each, then
    /// half-closes and drains whatever the server still has to say.
    pub async fn route_chat(&mut self) -> Result<(), Status> {
        let (tx, rx) = mpsc::channel(1);
        let closed = |_| -> Status {
            Error::StreamTransport {
                context: "Request stream closed by the server".to_string(),
            }
            .into()
        };

        let first = chat_note(0);
        tracing::info!(note = ?first, "[RouteChat] (req)");
        tx.send(first).await.map_err(closed)?;

        let response = self.client.route_chat(ReceiverStream::new(rx)).await?;
        let server = server_name(response.metadata()).to_string();
        let mut inbound = response.into_inner();

        for seq in 0..NOTES_PER_CHAT {
            if seq > 0 {
                let note = chat_note(seq);
                tracing::info!(?note, "[RouteChat] (req)");
                tx.send(note).await.map_err(closed)?;
            }

            match inbound.message().await? {
                Some(note) => tracing::info!(%server, ?note, "[RouteChat] (resp)"),
                None => return Ok(()),
            }
        }

        drop(tx);
        while let Some(note) = inbound.message().await? {
            tracing::info!(%server, ?note, "[RouteChat] (resp)");
        }
        Ok(())
    }
}

impl Caller for RouteGuideCaller {
    fn call(&mut self, api: Api) -> impl Future<Output = Result<(), Status>> {
        async move {
            match api {
                Api::GetFeature => self.get_feature().await,
                Api::ListFeatures => self.list_features().await,
                Api::RecordRoute => self.record_route().await,
                Api::RouteChat => self.route_chat().await,
            }
        }
    }
}
