//! Roulette core: selection, wheel choreography and result history
//!
//! This module provides:
//! - `select` and `validate_count` for fair winner selection
//! - `WheelState`, `SpinPlan` and `SpinChoreographer` for the wheel
//! - `ResultSink` / `MemoryHistory` for finished-run records

pub mod engine;
pub mod history;
pub mod wheel;

pub use engine::{SelectionError, select, shuffle, validate_count};
pub use history::{MemoryHistory, ResultSink, RouletteRecord};
pub use wheel::{
    FrameClock, IntervalFrameClock, POINTER_ANGLE, SpinChoreographer, SpinOutcome, SpinPlan,
    StopHandle, WheelError, WheelState, plan_run, plan_spin,
};
