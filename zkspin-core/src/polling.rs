//! Submit-then-poll protocol against a [`ProofService`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    error::SpinError,
    hub::ProofService,
    types::{ProofHandle, ProofRequest, ProofResult, ProofStatus},
};

/// Configuration for the polling loop.
#[derive(Clone, Debug)]
pub struct PollingConfig {
    /// Delay between status requests.
    pub interval: Duration,
    /// Upper bound on time spent polling. `None` waits indefinitely.
    pub deadline: Option<Duration>,
    /// Consecutive transport failures tolerated before giving up.
    pub max_consecutive_poll_errors: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2_000),
            deadline: None,
            max_consecutive_poll_errors: 3,
        }
    }
}

/// Drives one proof job from submission to a terminal status.
pub struct ProofPollingClient<S> {
    service: S,
    config: PollingConfig,
}

impl<S: ProofService> ProofPollingClient<S> {
    pub fn new(service: S, config: PollingConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Submit `request` once and poll until the proof succeeds or fails.
    ///
    /// The deadline only stops local waiting; the job keeps running on the hub.
    pub async fn submit_and_await(&self, request: &ProofRequest) -> Result<ProofResult, SpinError> {
        let handle = match self.service.initiate(request).await {
            Ok(handle) => handle,
            Err(SpinError::Submission(reason)) => return Err(SpinError::Submission(reason)),
            Err(e) => return Err(SpinError::Submission(e.to_string())),
        };

        info!(
            id = %handle.id,
            artifact_id = %request.artifact_id,
            input = %request.input,
            "proof job submitted"
        );

        let started = Instant::now();
        let outcome = match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.poll_until_done(&handle))
                .await
                .unwrap_or_else(|_| {
                    Err(SpinError::Timeout {
                        id: handle.id.clone(),
                        waited: started.elapsed(),
                    })
                }),
            None => self.poll_until_done(&handle).await,
        };

        match &outcome {
            Ok(result) => info!(
                id = %handle.id,
                instances = result.instances.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "proof ready"
            ),
            Err(e) => warn!(id = %handle.id, error = %e, "proof job abandoned"),
        }

        outcome
    }

    async fn poll_until_done(&self, handle: &ProofHandle) -> Result<ProofResult, SpinError> {
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            attempts += 1;
            match self.service.fetch(handle).await {
                Ok(snapshot) => {
                    consecutive_errors = 0;
                    debug!(id = %handle.id, attempt = attempts, status = %snapshot.status, "polled proof");

                    match snapshot.status {
                        ProofStatus::Success => return ProofResult::from_snapshot(snapshot),
                        ProofStatus::Failure => {
                            return Err(SpinError::ProofFailed {
                                id: handle.id.clone(),
                                status: snapshot.status.to_string(),
                            })
                        }
                        ProofStatus::Pending | ProofStatus::Other(_) => {}
                    }
                }
                Err(SpinError::PollFailed { reason, .. }) => {
                    consecutive_errors += 1;
                    warn!(
                        id = %handle.id,
                        attempt = attempts,
                        consecutive_errors,
                        error = %reason,
                        "poll attempt failed"
                    );
                    if consecutive_errors > self.config.max_consecutive_poll_errors {
                        return Err(SpinError::PollFailed {
                            id: handle.id.clone(),
                            attempts,
                            reason,
                        });
                    }
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.config.interval).await;
        }
    }
}
