//! Server-side components of the route guide service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`store`] - Feature dataset and route note log.
//! - [`streaming`] - Stream-level logic for the streaming RPCs.
//! - [`service`] - The `RouteGuide` gRPC service.
//! - [`fault`] - Fault-injection middleware wrapping every call.
//! - [`telemetry`] - Logging, and optional OpenTelemetry export.
//!
//! [`serve`] wires them together on any incoming connection stream.

pub mod config;
pub mod fault;
pub mod service;
pub mod store;
pub mod streaming;
pub mod telemetry;


use config::ServerConfig;
use core::future::Future;
use fault::FaultInjectionLayer;
use futures::Stream;
use routeguide_core::proto::{FILE_DESCRIPTOR_SET, route_guide_server::RouteGuideServer};
use service::handler::RouteGuideService;
use store::FeatureStore;
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Serves the route guide, health and reflection services on `incoming`
/// until `signal` resolves.
///
/// Health reports `SERVING` for the route guide while running and flips to
/// `NOT_SERVING` as soon as `signal` fires, before in-flight calls drain.
pub async fn serve<I, IO, IE, F>(
    incoming: I,
    config: ServerConfig,
    features: FeatureStore,
    signal: F,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IO::ConnectInfo: Clone + Send + Sync + 'static,
    IE: Into<tower::BoxError>,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<RouteGuideServer<RouteGuideService>>()
        .await;

    let fault_layer = FaultInjectionLayer::new(config.fault_probability);
    let service = RouteGuideService::new(config, features);

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let shutdown = async move {
        signal.await;
        health_reporter
            .set_not_serving::<RouteGuideServer<RouteGuideService>>()
            .await;
    };

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new())
                .layer(fault_layer),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_route_guide_service(service))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    Ok(())
}

fn build_route_guide_service(service: RouteGuideService) -> RouteGuideServer<RouteGuideService> {
    RouteGuideServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
