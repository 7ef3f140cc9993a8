//! zkspin-driver
//!
//! Runs proof-driven rotations against the proving hub.
//!
//! Flow per rotation:
//! 1. Submit the current orientation to the hub and poll for the proof
//! 2. Decode the proof's outputs and derive the rotation angle
//! 3. Hand the proof to the verifier (on-chain with the `evm` feature)
//! 4. Animate the angle, logging each tick in place of a renderer

mod config;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use zkspin_core::{HubClient, RotationController, SpinError, VerifierSubmitter};

use crate::config::DriverConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = DriverConfig::from_env()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "zkspin_driver=info,zkspin_core=info".into());
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting zkspin-driver");
    info!("Hub GraphQL: {}", config.hub_url);
    info!("Artifact: {}", config.controller.artifact_id);

    let hub = HubClient::with_url(config.hub_url.clone())?;
    let verifier = build_verifier(&config).await?;
    info!("Verifier: {}", verifier.name());

    let controller = Arc::new(RotationController::new(
        hub,
        verifier,
        config.controller.clone(),
    )?);

    // Renderer stand-in: report the observed angle on every tick
    let mut angle_rx = controller.subscribe_angle();
    let renderer = tokio::spawn(async move {
        while angle_rx.changed().await.is_ok() {
            let angle = *angle_rx.borrow_and_update();
            debug!(angle, degrees = angle.to_degrees(), "tick");
        }
    });

    tokio::select! {
        result = run_rotations(Arc::clone(&controller), config.rotations) => {
            if let Err(e) = &result {
                error!("Rotation failed: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down driver...");
        }
    }

    renderer.abort();
    Ok(())
}

async fn run_rotations<V: VerifierSubmitter>(
    controller: Arc<RotationController<HubClient, V>>,
    rotations: u32,
) -> Result<(), SpinError> {
    for n in 1..=rotations {
        let from = controller.orientation().await;
        info!("Rotation {}/{} from {}", n, rotations, from);

        let outcome = match controller.rotate().await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => {
                warn!("Rotation {} failed, keeping orientation {}: {}", n, from, e);
                continue;
            }
            Err(e) => return Err(e),
        };

        info!(
            "Rotating by {:.4} rad ({:.2}°), receipt {}",
            outcome.phase,
            outcome.phase.to_degrees(),
            outcome.receipt
        );

        controller.wait_idle().await;
        info!(
            "Rotation {} complete at {:.4} rad, next orientation {}",
            n,
            controller.angle(),
            outcome.next_orientation
        );
    }
    Ok(())
}

#[cfg(feature = "evm")]
async fn build_verifier(config: &DriverConfig) -> Result<Box<dyn VerifierSubmitter>> {
    use anyhow::Context;

    match (&config.verifier_rpc_url, &config.verifier_private_key) {
        (Some(rpc), Some(key)) => {
            info!("Enabling EVM verifier at {}", config.verifier_address);
            let verifier = zkspin_core::EvmVerifier::connect(
                rpc,
                &config.verifier_address,
                key,
                config.verifier_confirmations,
            )
            .await
            .context("failed to connect EVM verifier")?;
            Ok(Box::new(verifier))
        }
        _ => {
            warn!("VERIFIER_RPC_URL or VERIFIER_PRIVATE_KEY unset, proofs will only be logged");
            Ok(Box::new(zkspin_core::LoggingVerifier))
        }
    }
}

#[cfg(not(feature = "evm"))]
async fn build_verifier(config: &DriverConfig) -> Result<Box<dyn VerifierSubmitter>> {
    if config.verifier_rpc_url.is_some() {
        warn!("VERIFIER_RPC_URL set but the evm feature is disabled, proofs will only be logged");
    }
    Ok(Box::new(zkspin_core::LoggingVerifier))
}
