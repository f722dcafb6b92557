#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Driving Environment
//!
//! Exposes a simulated vehicle as an [`rl::Env`]. Each episode owns one
//! vehicle and one front camera; every step applies a throttle/steer action,
//! reads the latest camera frame and scores the vehicle's state.
//!
//! ## Key Components
//!
//! -   **[`CameraSensor`]:** attaches an RGB camera to the vehicle and keeps
//!     the most recent decoded 84×84 frame in a guarded last-value cell. What
//!     a read returns before the first frame is set by [`FramePolicy`].
//! -   **[`RewardCalculator`]:** sums four terms (speed tracking, lane
//!     deviation, collision, progress towards an explicit goal) and reports
//!     the breakdown.
//! -   **[`DrivingEnv`]:** the episode state machine. It spawns and destroys
//!     actors, clamps actions, and decides termination.
//! -   **[`OwnedActor`]:** destroy-on-drop wrapper for simulator actors, so no
//!     actor outlives the episode that spawned it.

pub mod actor;
pub mod camera;
pub mod config;
pub mod env;
pub mod error;
pub mod observation;
pub mod reward;

pub use actor::OwnedActor;
pub use camera::{CameraSensor, FramePolicy};
pub use config::{EnvConfig, EnvParams};
pub use env::{DrivingEnv, EpisodeState, StepInfo};
pub use error::EnvError;
pub use observation::{decode, Observation, OBS_CHANNELS, OBS_HEIGHT, OBS_WIDTH};
pub use reward::{RewardBreakdown, RewardCalculator, VehicleSnapshot};
