//! Protocol bindings and the pieces shared by the route guide server and
//! client.
//!
//! - [`proto`] - Generated messages and `RouteGuide` client/server stubs.
//! - [`geo`] - Fixed-point geometry on [`proto::Point`] and
//!   [`proto::Rectangle`].
//! - [`fault`] - The injected-fault signature, built by the server and
//!   recognised by the client.
//! - [`error`] - The unified [`Error`] type.

pub mod error;
pub mod fault;
pub mod geo;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from
/// `proto/routeguide.proto`.
///
/// ## Service
///
/// - `GetFeature` - unary lookup of the feature at a point.
/// - `ListFeatures` - server-streaming scan of a rectangle.
/// - `RecordRoute` - client-streaming route summary.
/// - `RouteChat` - bidirectional note exchange.
///
/// Coordinates are fixed-point degrees scaled by 10^7 (see [`geo`]).
pub mod proto {
    tonic::include_proto!("routeguide");

    /// Encoded descriptor set used to serve gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("routeguide_descriptor");

    /// Fully-qualified service name, as registered with the health service.
    pub const SERVICE_NAME: &str = "routeguide.RouteGuide";

    /// Response metadata key carrying the name of the replica that answered.
    pub const SERVER_METADATA_KEY: &str = "server";
}
