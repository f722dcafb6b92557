//! Front camera attached to the episode's vehicle.
//!
//! The simulator delivers frames on its own schedule, possibly from another
//! thread. Each frame is decoded inside the callback and stored in a
//! [`FrameSlot`], a last-value cell guarded by a mutex and condition variable.
//! Readers always get a complete frame; a frame that arrives while nobody is
//! reading simply replaces the previous one.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use sim::{ActorId, Blueprint, RawImage, Sensor, Transform, World};
use tracing::{debug, warn};

use crate::actor::OwnedActor;
use crate::error::EnvError;
use crate::observation::{decode, Observation};

/// What [`CameraSensor::get_frame`] does before the first frame has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramePolicy {
    /// Return an all-zero observation.
    #[default]
    Zeroed,
    /// Wait for the first frame, failing with [`EnvError::FrameTimeout`].
    Block { timeout_ms: u64 },
}

impl FramePolicy {
    #[must_use]
    pub fn block(timeout: Duration) -> Self {
        Self::Block { timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
    }
}

#[derive(Default)]
struct SlotState {
    latest: Option<Observation>,
    received: u64,
    rejected: u64,
}

#[derive(Default)]
struct FrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl FrameSlot {
    fn publish(&self, image: &RawImage) {
        match decode(image) {
            Ok(observation) => {
                let mut state = self.state.lock();
                state.latest = Some(observation);
                state.received += 1;
                drop(state);
                self.ready.notify_all();
            }
            Err(e) => {
                self.state.lock().rejected += 1;
                warn!("Dropping camera frame: {e}");
            }
        }
    }
}

pub struct CameraSensor {
    sensor: OwnedActor<dyn Sensor>,
    slot: Arc<FrameSlot>,
    policy: FramePolicy,
}

impl CameraSensor {
    /// Spawns a camera from `blueprint`, mounts it on `parent` at `mount`, and
    /// starts listening for frames.
    ///
    /// # Errors
    /// Returns [`EnvError::Sim`] if the sensor cannot be spawned or its
    /// callback registered. A sensor that spawned but could not listen is
    /// destroyed again.
    pub fn attach(
        world: &dyn World,
        blueprint: &Blueprint,
        mount: &Transform,
        parent: ActorId,
        policy: FramePolicy,
    ) -> Result<Self, EnvError> {
        let mut sensor = OwnedActor::new(world.spawn_sensor(blueprint, mount, parent)?);
        let slot = Arc::new(FrameSlot::default());
        let sink = Arc::clone(&slot);
        sensor.get_mut()?.listen(Box::new(move |image: RawImage| sink.publish(&image)))?;
        debug!(camera = %sensor.id(), %parent, ?policy, "camera attached");
        Ok(Self { sensor, slot, policy })
    }

    #[must_use]
    pub fn id(&self) -> ActorId {
        self.sensor.id()
    }

    #[must_use]
    pub fn policy(&self) -> FramePolicy {
        self.policy
    }

    /// Frames decoded since the camera was attached.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.slot.state.lock().received
    }

    /// Frames that failed to decode and were dropped.
    #[must_use]
    pub fn frames_rejected(&self) -> u64 {
        self.slot.state.lock().rejected
    }

    /// Latest decoded frame. The same frame is returned again until a newer one
    /// arrives.
    ///
    /// # Errors
    /// Returns [`EnvError::FrameTimeout`] under [`FramePolicy::Block`] if no
    /// frame arrives in time.
    pub fn get_frame(&self) -> Result<Observation, EnvError> {
        let mut state = self.slot.state.lock();
        match self.policy {
            FramePolicy::Zeroed => Ok(state.latest.clone().unwrap_or_else(Observation::zeroed)),
            FramePolicy::Block { timeout_ms } => {
                let timeout = Duration::from_millis(timeout_ms);
                self.slot.ready.wait_while_for(&mut state, |s| s.latest.is_none(), timeout);
                state.latest.clone().ok_or(EnvError::FrameTimeout(timeout))
            }
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.sensor.is_destroyed()
    }

    /// Stops the frame stream and removes the camera. Safe to call twice.
    ///
    /// # Errors
    /// Returns the simulator error if the live camera could not be removed.
    pub fn destroy(&mut self) -> Result<(), EnvError> {
        if let Ok(sensor) = self.sensor.get_mut() {
            if sensor.is_listening() {
                sensor.stop()?;
            }
        }
        self.sensor.destroy()
    }
}

impl Drop for CameraSensor {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!(camera = %self.sensor.id(), "Failed to destroy camera on drop: {e}");
        }
    }
}
