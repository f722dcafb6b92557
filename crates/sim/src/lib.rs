#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
//! # Simulator Boundary
//!
//! Everything the driving environment needs from a driving simulator, expressed
//! as a handful of traits and plain data types.
//!
//! ## Key Components
//!
//! -   **Data types:** [`Transform`], [`Rotation`], [`VehicleControl`],
//!     [`Waypoint`], [`CollisionEvent`] and [`RawImage`] live in [`types`].
//! -   **Blueprints:** [`BlueprintLibrary`] holds the templates actors are
//!     spawned from and supports wildcard filtering.
//! -   **Session traits:** [`Client`], [`World`], [`Map`], [`Actor`],
//!     [`Vehicle`] and [`Sensor`] in [`world`] describe the operations the
//!     environment relies on. Implementations own the transport.
//! -   **Headless backend:** [`headless`] ships an in-process kinematic world
//!     that implements every trait. It is used as the offline backend and as
//!     the stub simulator in tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sim::{Client, ClientConfig, HeadlessClient, HeadlessConfig};
//!
//! let client = HeadlessClient::connect(&ClientConfig::default(), HeadlessConfig::default())?;
//! let world = client.world()?;
//! let library = world.blueprint_library()?;
//! let model3 = library.filter("model3")[0].clone();
//! let spawn = world.map()?.spawn_points()[0];
//! let vehicle = world.spawn_vehicle(&model3, &spawn)?;
//! ```

pub mod blueprint;
pub mod error;
pub mod headless;
pub mod types;
pub mod world;

pub use blueprint::{Blueprint, BlueprintLibrary};
pub use error::SimError;
pub use headless::{HeadlessClient, HeadlessConfig, HeadlessWorld, Obstacle, TickMode};
pub use types::{
    ActorId, CollisionEvent, Location, PixelFormat, RawImage, Rotation, Transform, Vector3D,
    VehicleControl, Waypoint,
};
pub use world::{Actor, Client, ClientConfig, FrameCallback, Map, Sensor, Vehicle, World};

pub use glam::Vec3;
