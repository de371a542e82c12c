//! Error types for the route guide service.
//!
//! This module defines the central `Error` enum, which captures every failure
//! the service and its client can report. It implements `From<Error>` for
//! `tonic::Status` so handlers can propagate errors with `?` and clients see
//! the appropriate status codes.
//!
//! ## Error Cases
//! - `DataLoad`: The embedded feature dataset could not be parsed. Fatal at
//!   startup.
//! - `InjectedFault`: A synthetic unavailability produced by the fault
//!   injector. Recoverable by the caller.
//! - `StreamTransport`: A stream broke mid-call (peer disconnect, decode
//!   failure, internal channel closed). Aborts only the current call.
//! - `InvalidConfiguration`: A startup setting is out of range.

use crate::fault::FAULT_MARKER;
use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the route guide service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The embedded feature dataset is malformed.
    #[error("Failed to load feature data: {reason}")]
    DataLoad { reason: String },

    /// The fault injector short-circuited the call at `path`.
    #[error("{marker}. path: {path}", marker = FAULT_MARKER)]
    InjectedFault { path: String },

    /// A request or response stream failed mid-call.
    #[error("Stream error: {context}")]
    StreamTransport { context: String },

    /// A startup setting failed validation.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::DataLoad { reason } => Status::internal(format!("Data load error: {reason}")),
            e @ Error::InjectedFault { .. } => Status::unavailable(e.to_string()),
            Error::StreamTransport { context } => {
                Status::internal(format!("Stream error: {context}"))
            }
            Error::InvalidConfiguration { reason } => Status::invalid_argument(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn injected_fault_maps_to_unavailable_with_marker() {
        let status: Status = Error::InjectedFault {
            path: "/routeguide.RouteGuide/GetFeature".to_string(),
        }
        .into();

        assert_eq!(status.code(), Code::Unavailable);
        assert_eq!(
            status.message(),
            "grpc server unavailable. path: /routeguide.RouteGuide/GetFeature"
        );
    }

    #[test]
    fn transport_errors_are_internal() {
        let status: Status = Error::StreamTransport {
            context: "peer went away".to_string(),
        }
        .into();

        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("peer went away"));
    }
}
