#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Training Loop
//!
//! The training side of the workspace: the environment contract every
//! simulator adapter implements, the PPO hyperparameters, and the on-policy
//! outer loop that drives an environment, collects rollouts and hands them to
//! a [`Policy`] for its update.
//!
//! The gradient update itself is behind the [`Policy`] trait. The crate ships
//! [`RandomPolicy`], a non-learning baseline that samples the action space and
//! reports rollout diagnostics, so the whole pipeline can run end to end.

pub mod checkpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod logger;
pub mod policy;
pub mod ppo;
pub mod rollout;
pub mod spaces;

pub use checkpoint::Checkpoint;
pub use config::{ConfigError, PpoParams};
pub use env::{Env, Step};
pub use error::RlError;
pub use logger::ScalarLogger;
pub use policy::{Policy, PolicyOutput, PolicySnapshot, RandomPolicy, UpdateStats};
pub use ppo::{Ppo, TrainingReport};
pub use rollout::{RolloutBuffer, Transition};
pub use spaces::{BoxSpace, DType};
