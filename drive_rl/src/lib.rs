#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # drive_rl
//!
//! Trains driving policies against a simulator through a Gym-style
//! environment.
//!
//! ## Overview
//!
//! The workspace wires a driving simulator to an on-policy training loop. A
//! simulated vehicle with a front camera is exposed as a reinforcement
//! learning environment (reset, step, observation, reward), and a PPO-style
//! learner collects rollouts against it.
//!
//! ### The Crates
//!
//! -   **`drive_rl`:** The crate you are currently viewing. It loads the
//!     settings file, runs the training and evaluation drivers, and provides
//!     the `drive_rl` binary.
//! -   **[`sim`]:** The simulator boundary: data types, blueprint library,
//!     session and actor traits, and an in-process headless backend.
//! -   **[`driving`]:** The environment adapter: camera sensor, reward
//!     calculator and episode state machine.
//! -   **[`rl`]:** The environment contract, PPO hyperparameters, rollout
//!     buffer with GAE, learner loop, checkpoints and scalar logs.
//!
//! ## Getting Started
//!
//! ```text
//! drive_rl train --config settings.json --total-timesteps 20000
//! drive_rl evaluate --episodes 5
//! ```
//!
//! Without `--config` every setting takes its default (see [`settings`]).

pub mod app;
pub mod settings;

pub use driving;
pub use rl;
pub use sim;
