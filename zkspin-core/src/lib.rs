//! zkspin-core
//!
//! Client side of a proof-driven rotation: a remote proving hub computes a
//! proof over a small rotation circuit, and the proof's public outputs decide
//! how far a displayed object turns.
//!
//! # Pipeline
//!
//! ```text
//! orientation ──► hub (submit, poll) ──► instances ──► field decode
//!                                                          │
//!   renderer ◄── scheduler ticks ◄── verifier ◄── phase ◄──┘
//! ```
//!
//! - [`polling::ProofPollingClient`] submits the current orientation once and
//!   polls the hub until the proof completes.
//! - [`field::FieldDecoder`] turns the last four instances, BN254 field
//!   elements holding signed fixed-point values, back into reals.
//! - [`phase::phase`] reads the rotation angle from the first matrix column.
//! - [`verifier::VerifierSubmitter`] receives the proof; awaiting it gates
//!   the animation.
//! - [`scheduler::RotationScheduler`] ramps the observed angle over a fixed
//!   tick budget and rejects new starts meanwhile.
//! - [`controller::RotationController`] runs all of the above and refuses
//!   overlapping rotations.

pub mod controller;
pub mod error;
pub mod field;
pub mod hub;
pub mod phase;
pub mod polling;
pub mod scheduler;
pub mod types;
pub mod verifier;

pub use controller::{ControllerConfig, RotationController, RotationOutcome, DEFAULT_ARTIFACT_ID};
pub use error::SpinError;
pub use field::{bn254_modulus, decode, FieldDecoder, DEFAULT_SCALE_EXPONENT};
pub use hub::{HubClient, ProofService, DEFAULT_HUB_URL};
pub use phase::phase;
pub use polling::{PollingConfig, ProofPollingClient};
pub use scheduler::{RotationScheduler, RotationState, SchedulerConfig, SchedulerPhase};
pub use types::{
    DecodedVector, OrientationVector, ProofHandle, ProofRequest, ProofResult, ProofSnapshot,
    ProofStatus, INITIAL_ORIENTATION,
};
pub use verifier::{LoggingVerifier, VerifierSubmitter};

#[cfg(feature = "evm")]
pub use verifier::EvmVerifier;
