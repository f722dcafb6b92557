//! Session traits.
//!
//! A [`Client`] hands out a shared [`World`]; the world spawns actors and
//! exposes the road [`Map`]. Actors are returned as owned boxed handles. A
//! handle's `destroy` removes the actor from the simulation; callers that want
//! destroy-on-drop semantics wrap the handle themselves.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::blueprint::{Blueprint, BlueprintLibrary};
use crate::error::SimError;
use crate::types::{ActorId, CollisionEvent, RawImage, Transform, VehicleControl, Waypoint};

/// Called by the simulator, possibly from its own thread, for every new frame.
pub type FrameCallback = Box<dyn FnMut(RawImage) + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { host: "localhost".to_owned(), port: 2000, timeout_secs: 10.0 }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

pub trait Client {
    /// # Errors
    /// Returns [`SimError`] if the session is gone.
    fn world(&self) -> Result<Arc<dyn World>, SimError>;

    /// # Errors
    /// Returns [`SimError`] if the session is gone.
    fn server_version(&self) -> Result<String, SimError>;
}

pub trait World: Send + Sync {
    /// # Errors
    /// Returns [`SimError`] if the simulator cannot be queried.
    fn blueprint_library(&self) -> Result<BlueprintLibrary, SimError>;

    /// # Errors
    /// Returns [`SimError`] if the simulator cannot be queried.
    fn map(&self) -> Result<Arc<dyn Map>, SimError>;

    /// # Errors
    /// Returns [`SimError::SpawnFailed`] when the blueprint is not a vehicle or
    /// the spawn point is occupied.
    fn spawn_vehicle(
        &self,
        blueprint: &Blueprint,
        transform: &Transform,
    ) -> Result<Box<dyn Vehicle>, SimError>;

    /// Spawns a sensor rigidly attached to `parent` at the local `transform`.
    ///
    /// # Errors
    /// Returns [`SimError::SpawnFailed`] when the blueprint is not a supported
    /// sensor or the parent does not exist.
    fn spawn_sensor(
        &self,
        blueprint: &Blueprint,
        transform: &Transform,
        parent: ActorId,
    ) -> Result<Box<dyn Sensor>, SimError>;
}

pub trait Map: Send + Sync {
    fn name(&self) -> &str;

    fn spawn_points(&self) -> Vec<Transform>;

    /// Nearest lane-centre waypoint, projected onto the road.
    ///
    /// # Errors
    /// Returns [`SimError`] if the simulator cannot be queried.
    fn waypoint(&self, location: Vec3) -> Result<Waypoint, SimError>;
}

pub trait Actor: Send {
    fn id(&self) -> ActorId;

    /// Blueprint id the actor was spawned from.
    fn type_name(&self) -> &str;

    fn is_alive(&self) -> bool;

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the actor is already gone.
    fn destroy(&mut self) -> Result<(), SimError>;

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the actor is gone.
    fn transform(&self) -> Result<Transform, SimError>;
}

pub trait Vehicle: Actor {
    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the vehicle is gone.
    fn apply_control(&mut self, control: VehicleControl) -> Result<(), SimError>;

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the vehicle is gone.
    fn set_autopilot(&mut self, enabled: bool) -> Result<(), SimError>;

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the vehicle is gone.
    fn velocity(&self) -> Result<Vec3, SimError>;

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the vehicle is gone.
    fn location(&self) -> Result<Vec3, SimError> {
        Ok(self.transform()?.location)
    }

    /// Every collision since the vehicle was spawned, oldest first.
    ///
    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the vehicle is gone.
    fn collision_history(&self) -> Result<Vec<CollisionEvent>, SimError>;
}

pub trait Sensor: Actor {
    /// # Errors
    /// Returns [`SimError::AlreadyListening`] if a callback is registered.
    fn listen(&mut self, callback: FrameCallback) -> Result<(), SimError>;

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] if the sensor is gone.
    fn stop(&mut self) -> Result<(), SimError>;

    fn is_listening(&self) -> bool;
}
