//! Drive loops for the two client modes.
//!
//! Both loops issue one call at a time, each under its own deadline, and pause
//! between calls. A failure carrying the injected-fault signature is logged
//! and skipped; any other failure, a missed deadline included, ends the run.
//! Cancelling the shared [`CancellationToken`] ends either loop with success,
//! abandoning the call in flight.

use crate::client::config::Api;
use core::{future::Future, ops::ControlFlow, time::Duration};
use routeguide_core::fault::is_injected_fault;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Something that can perform one route guide operation.
pub trait Caller {
    fn call(&mut self, api: Api) -> impl Future<Output = Result<(), Status>>;
}

impl<C: Caller + ?Sized> Caller for &mut C {
    fn call(&mut self, api: Api) -> impl Future<Output = Result<(), Status>> {
        (**self).call(api)
    }
}

/// Relative weights of each API in firehose mode, out of [`TOTAL_WEIGHT`].
pub const API_WEIGHTS: [(u32, Api); 4] = [
    (3, Api::GetFeature),
    (2, Api::ListFeatures),
    (2, Api::RecordRoute),
    (3, Api::RouteChat),
];

pub const TOTAL_WEIGHT: u32 = 10;

/// Maps a draw in `0..TOTAL_WEIGHT` onto [`API_WEIGHTS`].
pub fn pick_api(draw: u32) -> Api {
    let mut remaining = draw % TOTAL_WEIGHT;
    for (weight, api) in API_WEIGHTS {
        if remaining < weight {
            return api;
        }
        remaining -= weight;
    }
    API_WEIGHTS[API_WEIGHTS.len() - 1].1
}

pub struct Driver<C> {
    caller: C,
    timeout: Duration,
    wait: Duration,
    cancel: CancellationToken,
}

impl<C: Caller> Driver<C> {
    pub fn new(caller: C, timeout: Duration, wait: Duration, cancel: CancellationToken) -> Self {
        Self {
            caller,
            timeout,
            wait,
            cancel,
        }
    }

    /// Calls `api` `count` times.
    pub async fn run_bounded(&mut self, api: Api, count: usize) -> Result<(), Status> {
        tracing::info!("Calling {api} {count} times");
        for i in 0..count {
            if self.attempt(api).await?.is_break() {
                return Ok(());
            }
            if i + 1 < count && self.pause().await.is_break() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Calls weighted random APIs until cancelled.
    pub async fn run_firehose(&mut self) -> Result<(), Status> {
        loop {
            let api = pick_api(rand::random_range(0..TOTAL_WEIGHT));
            if self.attempt(api).await?.is_break() || self.pause().await.is_break() {
                return Ok(());
            }
        }
    }

    /// Performs one call. Breaks if cancelled, errors on anything but an
    /// injected fault.
    async fn attempt(&mut self, api: Api) -> Result<ControlFlow<()>, Status> {
        let timeout = self.timeout;
        let call = tokio::time::timeout(timeout, self.caller.call(api));

        let result = tokio::select! {
            () = self.cancel.cancelled() => {
                tracing::info!("[{api}] cancelled");
                return Ok(ControlFlow::Break(()));
            }
            result = call => result.unwrap_or_else(|_| {
                Err(Status::deadline_exceeded(format!(
                    "{api} did not complete within {timeout:?}"
                )))
            }),
        };

        match result {
            Ok(()) => Ok(ControlFlow::Continue(())),
            Err(status) if is_injected_fault(&status) => {
                tracing::warn!("[{api}] {}", status.message());
                Ok(ControlFlow::Continue(()))
            }
            Err(status) => {
                tracing::error!("[{api}] {status}");
                Err(status)
            }
        }
    }

    async fn pause(&self) -> ControlFlow<()> {
        tokio::select! {
            () = self.cancel.cancelled() => ControlFlow::Break(()),
            () = tokio::time::sleep(self.wait) => ControlFlow::Continue(()),
        }
    }
}
