//! Tick-driven rotation animation.
//!
//! A [`RotationScheduler`] is either idle or animating. Starting an animation
//! spawns one periodic task that ramps the observed angle linearly from its
//! current value and exits once the tick budget is spent. The observed angle is
//! published on a watch channel for the renderer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SpinError;

/// Timing of the rotation ramp.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Period of the animation timer.
    pub tick_period: Duration,
    /// Ticks after which the animation completes.
    pub tick_budget: u32,
    /// Each tick advances the angle by `target / tick_divisor`.
    pub tick_divisor: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(10),
            tick_budget: 300,
            tick_divisor: 15,
        }
    }
}

/// Whether an animation is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Animating,
}

/// State of one animation.
#[derive(Clone, Debug, PartialEq)]
pub struct RotationState {
    pub active: bool,
    pub tick_count: u32,
    pub target_angle: f64,
    pub base_angle: f64,
}

impl RotationState {
    pub fn idle() -> Self {
        Self {
            active: false,
            tick_count: 0,
            target_angle: 0.0,
            base_angle: 0.0,
        }
    }

    pub fn start(base_angle: f64, target_angle: f64) -> Self {
        Self {
            active: true,
            tick_count: 0,
            target_angle,
            base_angle,
        }
    }

    /// Advance one tick. Returns the angle to display, or `None` when idle.
    ///
    /// The tick at which `tick_count` reaches `tick_budget` is the last one;
    /// afterwards the state is inactive.
    pub fn tick(&mut self, tick_budget: u32, tick_divisor: u32) -> Option<f64> {
        if !self.active {
            return None;
        }

        let angle =
            self.base_angle + f64::from(self.tick_count) * self.target_angle / f64::from(tick_divisor);

        if self.tick_count >= tick_budget {
            *self = Self::idle();
        } else {
            self.tick_count += 1;
        }

        Some(angle)
    }
}

/// Owns the animation task and the observed angle.
pub struct RotationScheduler {
    config: SchedulerConfig,
    phase: Arc<watch::Sender<SchedulerPhase>>,
    angle: Arc<watch::Sender<f64>>,
    cancel: CancellationToken,
}

impl RotationScheduler {
    /// Create an idle scheduler.
    pub fn new(config: SchedulerConfig) -> Result<Self, SpinError> {
        if config.tick_divisor == 0 {
            return Err(SpinError::InvalidConfig(
                "tick_divisor must be greater than zero".into(),
            ));
        }
        if config.tick_period.is_zero() {
            return Err(SpinError::InvalidConfig(
                "tick_period must be greater than zero".into(),
            ));
        }
        let (phase, _) = watch::channel(SchedulerPhase::Idle);
        let (angle, _) = watch::channel(0.0);
        Ok(Self {
            config,
            phase: Arc::new(phase),
            angle: Arc::new(angle),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.borrow()
    }

    pub fn is_animating(&self) -> bool {
        self.phase() == SchedulerPhase::Animating
    }

    /// Current observed angle.
    pub fn angle(&self) -> f64 {
        *self.angle.borrow()
    }

    /// Receiver of the observed angle, updated once per tick.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.angle.subscribe()
    }

    /// Receiver of phase transitions.
    pub fn subscribe_phase(&self) -> watch::Receiver<SchedulerPhase> {
        self.phase.subscribe()
    }

    /// Start ramping towards `base + budget * target / divisor`.
    ///
    /// Returns [`SpinError::Busy`] while an animation is running; the running
    /// animation is left untouched. Must be called from within a tokio runtime.
    pub fn start(&self, target_angle: f64) -> Result<(), SpinError> {
        let claimed = self.phase.send_if_modified(|phase| {
            if *phase == SchedulerPhase::Idle {
                *phase = SchedulerPhase::Animating;
                true
            } else {
                false
            }
        });
        if !claimed {
            warn!(target_angle, "rotation start rejected: already animating");
            return Err(SpinError::Busy);
        }

        let state = RotationState::start(self.angle(), target_angle);
        info!(
            base_angle = state.base_angle,
            target_angle,
            tick_budget = self.config.tick_budget,
            "rotation started"
        );

        tokio::spawn(run_animation(
            state,
            self.config.clone(),
            Arc::clone(&self.phase),
            Arc::clone(&self.angle),
            self.cancel.clone(),
        ));
        Ok(())
    }

    /// Wait until no animation is running.
    pub async fn wait_idle(&self) {
        let mut phase = self.phase.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = phase.wait_for(|p| *p == SchedulerPhase::Idle).await;
    }
}

impl Drop for RotationScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_animation(
    mut state: RotationState,
    config: SchedulerConfig,
    phase: Arc<watch::Sender<SchedulerPhase>>,
    angle: Arc<watch::Sender<f64>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("rotation cancelled");
                break;
            }
            _ = ticker.tick() => {
                match state.tick(config.tick_budget, config.tick_divisor) {
                    Some(next) => {
                        angle.send_replace(next);
                    }
                    None => break,
                }
                if !state.active {
                    info!(angle = *angle.borrow(), "rotation complete");
                    break;
                }
            }
        }
    }

    phase.send_replace(SchedulerPhase::Idle);
}
