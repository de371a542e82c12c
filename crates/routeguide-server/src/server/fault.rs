//! Random fault injection for every inbound call.
//!
//! [`FaultInjectionLayer`] wraps the router (or any HTTP service) in a
//! [`FaultInjection`] decorator. For each request it draws one uniform value;
//! when the draw falls at or under the configured probability the request
//! never reaches the inner service and the caller receives an `UNAVAILABLE`
//! status carrying the fault marker and the method path. Unary and streaming
//! calls are treated alike since the decision is made on the request head.
//!
//! Health checks are exempt so orchestrators keep seeing the real serving
//! status.

use crate::server::telemetry::increment_faults_injected;
use core::task::{Context, Poll};
use futures::future::{Either, Ready, ready};
use routeguide_core::fault::injected_fault;
use tonic::codegen::http;
use tower::{Layer, Service};

/// Method paths under this prefix are never faulted.
pub const HEALTH_PATH_PREFIX: &str = "/grpc.health.v1.Health/";

/// Returns `true` if `path` must always reach the inner service.
pub fn is_exempt(path: &str) -> bool {
    path.starts_with(HEALTH_PATH_PREFIX)
}

/// Decides whether a call with uniform `draw` in `[0, 1)` is faulted.
///
/// A zero probability never faults, even on a zero draw.
pub fn should_inject(probability: f64, draw: f64) -> bool {
    probability > 0.0 && draw <= probability
}

/// [`Layer`] producing [`FaultInjection`] services.
#[derive(Clone, Copy, Debug)]
pub struct FaultInjectionLayer {
    probability: f64,
}

impl FaultInjectionLayer {
    pub const fn new(probability: f64) -> Self {
        Self { probability }
    }
}

impl<S> Layer<S> for FaultInjectionLayer {
    type Service = FaultInjection<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FaultInjection {
            inner,
            probability: self.probability,
        }
    }
}

/// Service decorator that fails a random share of calls before they reach
/// `S`. Holds no per-call state.
#[derive(Clone, Debug)]
pub struct FaultInjection<S> {
    inner: S,
    probability: f64,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for FaultInjection<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Self::Response, Self::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let path = req.uri().path();
        if !is_exempt(path) && should_inject(self.probability, rand::random::<f64>()) {
            let status = injected_fault(path);
            tracing::warn!(path, "Injecting fault: {}", status.message());
            increment_faults_injected(path);
            return Either::Left(ready(Ok(status.into_http())));
        }

        Either::Right(self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use routeguide_core::fault::is_injected_fault;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonic::Status;
    use tower::ServiceExt;

    const GET_FEATURE: &str = "/routeguide.RouteGuide/GetFeature";
    const HEALTH_CHECK: &str = "/grpc.health.v1.Health/Check";

    /// Inner service that counts how often it is reached.
    #[derive(Clone, Default)]
    struct Counting {
        hits: Arc<AtomicUsize>,
    }

    impl Service<http::Request<()>> for Counting {
        type Response = http::Response<String>;
        type Error = Infallible;
        type Future = Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: http::Request<()>) -> Self::Future {
            self.hits.fetch_add(1, Ordering::SeqCst);
            ready(Ok(http::Response::new("ok".to_string())))
        }
    }

    async fn call(probability: f64, path: &str, inner: Counting) -> http::Response<String> {
        let request = http::Request::builder().uri(path).body(()).unwrap();
        FaultInjectionLayer::new(probability)
            .layer(inner)
            .oneshot(request)
            .await
            .unwrap()
    }

    #[test]
    fn decision_boundaries() {
        assert!(!should_inject(0.0, 0.0));
        assert!(!should_inject(0.0, 0.5));
        assert!(should_inject(1.0, 0.0));
        assert!(should_inject(1.0, 0.999_999));
        assert!(should_inject(0.3, 0.3));
        assert!(!should_inject(0.3, 0.300_001));
    }

    #[test]
    fn only_health_is_exempt() {
        assert!(is_exempt(HEALTH_CHECK));
        assert!(is_exempt("/grpc.health.v1.Health/Watch"));
        assert!(!is_exempt(GET_FEATURE));
        assert!(!is_exempt("/routeguide.RouteGuide/RouteChat"));
    }

    #[tokio::test]
    async fn zero_probability_always_passes_through() {
        let inner = Counting::default();
        for _ in 0..100 {
            let response = call(0.0, GET_FEATURE, inner.clone()).await;
            assert_eq!(response.body(), "ok");
        }
        assert_eq!(inner.hits.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn full_probability_always_faults() {
        let inner = Counting::default();
        for _ in 0..100 {
            let response = call(1.0, GET_FEATURE, inner.clone()).await;
            let status = Status::from_header_map(response.headers()).unwrap();
            assert!(is_injected_fault(&status));
            assert!(status.message().contains(GET_FEATURE));
        }
        assert_eq!(inner.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_checks_are_never_faulted() {
        let inner = Counting::default();
        for _ in 0..100 {
            let response = call(1.0, HEALTH_CHECK, inner.clone()).await;
            assert_eq!(response.body(), "ok");
        }
        assert_eq!(inner.hits.load(Ordering::SeqCst), 100);
    }
}
