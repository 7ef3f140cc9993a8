//! Orchestrates one proof-driven rotation end to end.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::{
    error::SpinError,
    field::{FieldDecoder, DEFAULT_SCALE_EXPONENT},
    hub::ProofService,
    phase::phase,
    polling::{PollingConfig, ProofPollingClient},
    scheduler::{RotationScheduler, SchedulerConfig, SchedulerPhase},
    types::{OrientationVector, ProofRequest},
    verifier::VerifierSubmitter,
};

/// Artifact id of the deployed rotation circuit.
pub const DEFAULT_ARTIFACT_ID: &str = "596654f8-5562-454b-a6d1-41a93a3e021b";

/// Controller configuration.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub artifact_id: String,
    pub scale_exponent: u32,
    pub polling: PollingConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            artifact_id: DEFAULT_ARTIFACT_ID.to_string(),
            scale_exponent: DEFAULT_SCALE_EXPONENT,
            polling: PollingConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Result of a successful rotation.
#[derive(Clone, Debug)]
pub struct RotationOutcome {
    /// Angle handed to the scheduler, in radians.
    pub phase: f64,
    /// Orientation stored for the next rotation.
    pub next_orientation: OrientationVector,
    /// Receipt returned by the verifier.
    pub receipt: String,
}

/// Clears the in-flight flag when a rotation ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SpinError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| SpinError::Busy)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Wires polling, decoding, phase calculation, verification and animation.
pub struct RotationController<S, V> {
    artifact_id: String,
    poller: ProofPollingClient<S>,
    decoder: FieldDecoder,
    verifier: V,
    scheduler: RotationScheduler,
    orientation: RwLock<OrientationVector>,
    in_flight: AtomicBool,
}

impl<S: ProofService, V: VerifierSubmitter> RotationController<S, V> {
    /// Build a controller starting from the identity orientation.
    ///
    /// Fails with [`SpinError::InvalidConfig`] when the animation timing is
    /// unusable.
    pub fn new(service: S, verifier: V, config: ControllerConfig) -> Result<Self, SpinError> {
        Self::with_orientation(service, verifier, config, OrientationVector::default())
    }

    pub fn with_orientation(
        service: S,
        verifier: V,
        config: ControllerConfig,
        orientation: OrientationVector,
    ) -> Result<Self, SpinError> {
        Ok(Self {
            artifact_id: config.artifact_id,
            poller: ProofPollingClient::new(service, config.polling),
            decoder: FieldDecoder::bn254(config.scale_exponent),
            verifier,
            scheduler: RotationScheduler::new(config.scheduler)?,
            orientation: RwLock::new(orientation),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Last known-good orientation.
    pub async fn orientation(&self) -> OrientationVector {
        self.orientation.read().await.clone()
    }

    /// Observed angle feed for the renderer.
    pub fn subscribe_angle(&self) -> watch::Receiver<f64> {
        self.scheduler.subscribe()
    }

    pub fn angle(&self) -> f64 {
        self.scheduler.angle()
    }

    pub fn is_animating(&self) -> bool {
        self.scheduler.is_animating()
    }

    /// Whether a rotation is polling, animating, or both.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) || self.is_animating()
    }

    /// Wait for the running animation, if any, to finish.
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await
    }

    /// Animation phase feed. The scheduler itself is only driven by `rotate`.
    pub fn subscribe_phase(&self) -> watch::Receiver<SchedulerPhase> {
        self.scheduler.subscribe_phase()
    }

    pub fn service(&self) -> &S {
        self.poller.service()
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Rotate from the stored orientation.
    pub async fn rotate(&self) -> Result<RotationOutcome, SpinError> {
        if self.is_busy() {
            return Err(SpinError::Busy);
        }
        let current = self.orientation().await;
        self.rotate_from(current).await
    }

    /// Request a proof for `current`, derive the rotation angle from its
    /// outputs and animate it.
    ///
    /// Nothing is mutated unless every step up to starting the animation
    /// succeeds.
    pub async fn rotate_from(
        &self,
        current: OrientationVector,
    ) -> Result<RotationOutcome, SpinError> {
        if self.scheduler.is_animating() {
            return Err(SpinError::Busy);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let request = ProofRequest {
            artifact_id: self.artifact_id.clone(),
            input: current,
        };

        let result = self.poller.submit_and_await(&request).await?;
        let decoded = self.decoder.decode_tail(&result.instances)?;
        let phase = phase(request.input.axis()?, decoded.axis())?;

        info!(
            phase,
            decoded = ?decoded.0,
            verifier = self.verifier.name(),
            "submitting proof to verifier"
        );
        let receipt = self
            .verifier
            .submit(&result.proof, &result.instances)
            .await
            .map_err(|e| {
                warn!(error = %e, "verifier rejected proof");
                match e {
                    SpinError::Verifier(_) => e,
                    other => SpinError::Verifier(other.to_string()),
                }
            })?;

        self.scheduler.start(phase)?;

        let next_orientation = OrientationVector::from_decoded(&decoded);
        *self.orientation.write().await = next_orientation.clone();

        info!(phase, %receipt, next = %next_orientation, "rotation verified");

        Ok(RotationOutcome {
            phase,
            next_orientation,
            receipt,
        })
    }
}
