//! The injected-fault signature.
//!
//! The server turns a random share of calls into `UNAVAILABLE` failures whose
//! message carries [`FAULT_MARKER`] and the full gRPC method path. On the wire
//! such a failure looks like any other unavailability; the marker is what lets
//! a client tell a deliberate fault apart from a genuine outage.

use crate::Error;
use tonic::{Code, Status};

/// Marker string embedded in every injected fault message.
pub const FAULT_MARKER: &str = "grpc server unavailable";

/// Builds the status returned for an injected fault on `path`.
pub fn injected_fault(path: &str) -> Status {
    Error::InjectedFault {
        path: path.to_string(),
    }
    .into()
}

/// Returns `true` if `status` was produced by the fault injector.
///
/// Both the code and the marker must match; an `UNAVAILABLE` from a dead
/// connection is a real error.
pub fn is_injected_fault(status: &Status) -> bool {
    status.code() == Code::Unavailable && status.message().contains(FAULT_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_fault_is_recognised() {
        let status = injected_fault("/routeguide.RouteGuide/RouteChat");
        assert!(is_injected_fault(&status));
        assert!(status.message().ends_with("/routeguide.RouteGuide/RouteChat"));
    }

    #[test]
    fn plain_unavailable_is_not_a_fault() {
        assert!(!is_injected_fault(&Status::unavailable("connection refused")));
    }

    #[test]
    fn marker_with_other_code_is_not_a_fault() {
        assert!(!is_injected_fault(&Status::internal(FAULT_MARKER)));
    }
}
