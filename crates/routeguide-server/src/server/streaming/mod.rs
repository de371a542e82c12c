//! Stream-level logic behind the streaming RPCs.
//!
//! The functions here are generic over plain [`futures::Stream`]s and
//! [`tokio::sync::mpsc`] senders, not tonic types, so the gRPC handlers stay
//! thin and the behavior can be driven directly from tests.
//!
//! - [`coordinator`] - Feeds `ListFeatures` results into the response stream.
//! - [`processor`] - Folds `RecordRoute` points into a summary and relays
//!   `RouteChat` notes through the shared note log.

pub mod coordinator;
pub mod processor;
