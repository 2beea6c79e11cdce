//! Wheel geometry and spin choreography
//!
//! The wheel partitions the roster into equal angular sectors in roster
//! order. A spin animates `rotation` toward a planned target angle that
//! leaves the fixed pointer at the midpoint of the winning sector, after a
//! few full extra turns. Planning is pure; animation is a cooperative loop
//! that suspends on an injectable [`FrameClock`] once per frame.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::SpinConfig;

/// Fixed angle of the pointer, at the top of the wheel.
pub const POINTER_ANGLE: f64 = -FRAC_PI_2;

/// Wheel errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WheelError {
    #[error("wheel requires at least one sector")]
    EmptyWheel,

    #[error("sector index {index} out of range for {sectors} sectors")]
    InvalidSector { index: usize, sectors: usize },
}

/// Current wheel pose: sector layout plus the absolute rotation.
///
/// `rotation` is unbounded and only ever increases while spinning; sector
/// `i` spans `[rotation + i*step, rotation + (i+1)*step)`.
#[derive(Debug, Clone)]
pub struct WheelState {
    sector_count: usize,
    rotation: f64,
    is_spinning: bool,
}

impl WheelState {
    pub fn new(sector_count: usize) -> Result<Self, WheelError> {
        if sector_count == 0 {
            return Err(WheelError::EmptyWheel);
        }
        Ok(Self {
            sector_count,
            rotation: 0.0,
            is_spinning: false,
        })
    }

    pub fn sector_count(&self) -> usize {
        self.sector_count
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn is_spinning(&self) -> bool {
        self.is_spinning
    }

    /// Pose the wheel at an absolute rotation, e.g. to evaluate a plan.
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Angular width of one sector, in radians.
    pub fn sector_angle(&self) -> f64 {
        TAU / self.sector_count as f64
    }

    /// Index of the sector currently under the fixed pointer.
    pub fn sector_at_pointer(&self) -> usize {
        let local = (POINTER_ANGLE - self.rotation).rem_euclid(TAU);
        let index = (local / self.sector_angle()) as usize;
        index.min(self.sector_count - 1)
    }
}

/// A committed spin: target sector plus the exact angle the wheel stops at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinPlan {
    pub target_index: usize,
    pub extra_turns: f64,
    pub final_rotation: f64,
}

/// Terminal state of one spin invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    /// Reached the planned target exactly.
    Completed { final_rotation: f64 },
    /// A spin was already in flight; the request was dropped.
    Ignored,
    /// Stopped cooperatively; rotation is whatever was last rendered.
    Stopped { rotation: f64 },
}

/// Frame pacing: "suspend until the next frame tick".
///
/// `start` marks the beginning of an animation; `next_frame` suspends until
/// the following tick and reports total time elapsed since `start`.
#[async_trait]
pub trait FrameClock: Send {
    fn start(&mut self);

    async fn next_frame(&mut self) -> Duration;
}

/// Display-refresh pacing over a tokio interval (~60 Hz by default).
pub struct IntervalFrameClock {
    period: Duration,
    started: tokio::time::Instant,
    interval: tokio::time::Interval,
}

impl IntervalFrameClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            started: tokio::time::Instant::now(),
            interval: tokio::time::interval(period),
        }
    }
}

#[async_trait]
impl FrameClock for IntervalFrameClock {
    fn start(&mut self) {
        self.started = tokio::time::Instant::now();
        self.interval = tokio::time::interval(self.period);
        self.interval
            .set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    }

    async fn next_frame(&mut self) -> Duration {
        self.interval.tick().await;
        self.started.elapsed()
    }
}

/// Handle for cooperatively stopping an in-flight spin.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Plan the rotation that lands the pointer at the midpoint of
/// `target_index`, after `extra_turns` full turns past the current pose.
pub fn plan_spin(
    wheel: &WheelState,
    target_index: usize,
    extra_turns: f64,
) -> Result<SpinPlan, WheelError> {
    if target_index >= wheel.sector_count {
        return Err(WheelError::InvalidSector {
            index: target_index,
            sectors: wheel.sector_count,
        });
    }

    let step = wheel.sector_angle();
    // Any rotation congruent to `aligned` puts the pointer at the sector
    // midpoint; pick the first one past the extra turns so rotation only
    // grows.
    let aligned = POINTER_ANGLE - step * (target_index as f64 + 0.5);
    let base = wheel.rotation + TAU * extra_turns;
    let final_rotation = base + (aligned - base).rem_euclid(TAU);

    Ok(SpinPlan {
        target_index,
        extra_turns,
        final_rotation,
    })
}

/// Plan one spin per target in order, each continuing from the previous
/// spin's final rotation. Advances `wheel` to the last planned pose.
pub fn plan_run<R>(
    wheel: &mut WheelState,
    targets: &[usize],
    config: &SpinConfig,
    rng: &mut R,
) -> Result<Vec<SpinPlan>, WheelError>
where
    R: Rng + ?Sized,
{
    let mut plans = Vec::with_capacity(targets.len());
    for &target in targets {
        let extra_turns = rng.random_range(config.min_extra_turns..config.max_extra_turns);
        let plan = plan_spin(wheel, target, extra_turns)?;
        wheel.rotation = plan.final_rotation;
        plans.push(plan);
    }
    Ok(plans)
}

/// Drives the wheel through committed spins, one winner at a time.
pub struct SpinChoreographer<C: FrameClock> {
    wheel: WheelState,
    clock: C,
    duration: Duration,
    min_extra_turns: f64,
    max_extra_turns: f64,
    stop: Arc<AtomicBool>,
}

impl<C: FrameClock> SpinChoreographer<C> {
    pub fn new(wheel: WheelState, clock: C, config: &SpinConfig) -> Self {
        Self {
            wheel,
            clock,
            duration: config.duration,
            min_extra_turns: config.min_extra_turns,
            max_extra_turns: config.max_extra_turns,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn wheel(&self) -> &WheelState {
        &self.wheel
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// Plan a spin from the current pose toward `target_index`.
    pub fn plan<R>(&self, target_index: usize, rng: &mut R) -> Result<SpinPlan, WheelError>
    where
        R: Rng + ?Sized,
    {
        let extra_turns = rng.random_range(self.min_extra_turns..self.max_extra_turns);
        plan_spin(&self.wheel, target_index, extra_turns)
    }

    /// Animate toward `plan.final_rotation` over the fixed duration.
    ///
    /// Ease-out cubic, one sample per frame tick, monotonic in time. The
    /// final frame assigns the exact target, so the pointer lands precisely
    /// inside the planned sector. A request while a spin is in flight is a
    /// no-op; a stop leaves `rotation` at the last rendered value.
    pub async fn spin<F>(&mut self, plan: &SpinPlan, mut on_frame: F) -> SpinOutcome
    where
        F: FnMut(&WheelState),
    {
        if self.wheel.is_spinning {
            return SpinOutcome::Ignored;
        }
        self.wheel.is_spinning = true;

        let start = self.wheel.rotation;
        let target = plan.final_rotation;
        self.clock.start();

        loop {
            if self.stop.swap(false, Ordering::SeqCst) {
                self.wheel.is_spinning = false;
                return SpinOutcome::Stopped {
                    rotation: self.wheel.rotation,
                };
            }

            let elapsed = self.clock.next_frame().await;
            let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();

            if progress >= 1.0 {
                self.wheel.rotation = target;
                on_frame(&self.wheel);
                break;
            }

            self.wheel.rotation = start + (target - start) * ease_out_cubic(progress);
            on_frame(&self.wheel);
        }

        self.wheel.is_spinning = false;
        SpinOutcome::Completed {
            final_rotation: target,
        }
    }

    /// One spin per winner, in draw order, returning to idle between spins.
    /// A stop ends the run; remaining winners are not spun.
    pub async fn run<R, F>(
        &mut self,
        targets: &[usize],
        rng: &mut R,
        mut on_frame: F,
    ) -> Result<Vec<SpinOutcome>, WheelError>
    where
        R: Rng + ?Sized,
        F: FnMut(&WheelState),
    {
        let mut outcomes = Vec::with_capacity(targets.len());
        for &target in targets {
            let plan = self.plan(target, rng)?;
            let outcome = self.spin(&plan, &mut on_frame).await;
            let stopped = matches!(outcome, SpinOutcome::Stopped { .. });
            outcomes.push(outcome);
            if stopped {
                break;
            }
        }
        Ok(outcomes)
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}
