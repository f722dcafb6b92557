//! The episode state machine.
//!
//! ```text
//!  Uninitialized ──reset──▶ Running ──collision / step limit──▶ Terminated
//!                             ▲  │                                 │
//!                             └──┴────────────reset────────────────┘
//!  any state ──close──▶ Closed
//! ```
//!
//! `reset` tears down the previous episode's camera and vehicle before
//! spawning new ones, so a world never holds more than one of each per
//! environment.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use rl::{BoxSpace, DType, Step};
use serde::Serialize;
use sim::{ActorId, Client, Map, Vehicle, VehicleControl, World};
use tracing::{debug, info};

use crate::actor::OwnedActor;
use crate::camera::CameraSensor;
use crate::config::EnvConfig;
use crate::error::EnvError;
use crate::observation::{Observation, OBS_CHANNELS, OBS_HEIGHT, OBS_WIDTH};
use crate::reward::{RewardBreakdown, RewardCalculator, VehicleSnapshot};

const ACTION_DIM: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Uninitialized,
    Running,
    Terminated,
    Closed,
}

impl fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Terminated => "terminated",
            Self::Closed => "closed",
        })
    }
}

/// Diagnostics attached to every step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    /// 1-based step index within the episode.
    pub step: usize,
    pub reward: RewardBreakdown,
    pub speed: f32,
    pub collisions: usize,
    /// Simulator frame behind the observation, `None` for a zeroed one.
    pub frame: Option<u64>,
}

// Field order matters: the camera is dropped before the vehicle it is mounted on.
struct Episode {
    camera: CameraSensor,
    vehicle: OwnedActor<dyn Vehicle>,
    reward: RewardCalculator,
    steps: usize,
}

impl Episode {
    fn teardown(mut self) -> Result<(), EnvError> {
        self.camera.destroy()?;
        self.vehicle.destroy()
    }
}

pub struct DrivingEnv {
    world: Arc<dyn World>,
    map: Arc<dyn Map>,
    config: EnvConfig,
    state: EpisodeState,
    episode: Option<Episode>,
    episodes: usize,
}

impl DrivingEnv {
    /// Creates an environment on `world`. No actors are spawned until
    /// [`reset`](Self::reset).
    ///
    /// # Errors
    /// Returns [`EnvError::Config`] for an invalid configuration and
    /// [`EnvError::Sim`] if the map cannot be fetched.
    pub fn new(world: Arc<dyn World>, config: EnvConfig) -> Result<Self, EnvError> {
        config.validate()?;
        let map = world.map()?;
        info!(map = map.name(), vehicle = %config.vehicle_filter, goal = ?config.goal, "Driving environment created");
        Ok(Self { world, map, config, state: EpisodeState::Uninitialized, episode: None, episodes: 0 })
    }

    /// # Errors
    /// See [`new`](Self::new); also fails if the client has no world.
    pub fn connect(client: &dyn Client, config: EnvConfig) -> Result<Self, EnvError> {
        Self::new(client.world()?, config)
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Episodes started since creation.
    #[must_use]
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    #[must_use]
    pub fn vehicle_id(&self) -> Option<ActorId> {
        self.episode.as_ref().map(|e| e.vehicle.id())
    }

    #[must_use]
    pub fn camera_id(&self) -> Option<ActorId> {
        self.episode.as_ref().map(|e| e.camera.id())
    }

    #[must_use]
    pub fn goal(&self) -> Option<Vec3> {
        self.episode.as_ref().and_then(|e| e.reward.goal())
    }

    /// Starts a new episode towards the configured goal.
    ///
    /// # Errors
    /// See [`reset_with_goal`](Self::reset_with_goal).
    pub fn reset(&mut self) -> Result<Observation, EnvError> {
        self.reset_with_goal(self.config.goal)
    }

    /// Destroys the current actors, spawns a vehicle with a camera at the first
    /// spawn point and returns the first observation.
    ///
    /// # Errors
    /// Returns [`EnvError::NotRunning`] after [`close`](Self::close),
    /// [`EnvError::BlueprintNotFound`] or [`EnvError::NoSpawnPoints`] if the
    /// world cannot provide the actors, [`EnvError::FrameTimeout`] under a
    /// blocking frame policy, and simulator failures as [`EnvError::Sim`].
    /// Actors spawned before a failure are destroyed again.
    pub fn reset_with_goal(&mut self, goal: Option<Vec3>) -> Result<Observation, EnvError> {
        if self.state == EpisodeState::Closed {
            return Err(EnvError::NotRunning(self.state));
        }
        self.state = EpisodeState::Uninitialized;
        if let Some(previous) = self.episode.take() {
            previous.teardown()?;
        }

        let library = self.world.blueprint_library()?;
        let vehicle_bp = library
            .filter(&self.config.vehicle_filter)
            .first()
            .map(|bp| (*bp).clone())
            .ok_or_else(|| EnvError::BlueprintNotFound(self.config.vehicle_filter.clone()))?;
        let mut camera_bp = library
            .find(&self.config.camera_blueprint)
            .cloned()
            .ok_or_else(|| EnvError::BlueprintNotFound(self.config.camera_blueprint.clone()))?;
        if let Some([width, height]) = self.config.camera_size {
            camera_bp.set_attribute("image_size_x", width);
            camera_bp.set_attribute("image_size_y", height);
        }
        let spawn = self
            .map
            .spawn_points()
            .first()
            .copied()
            .ok_or_else(|| EnvError::NoSpawnPoints(self.map.name().to_owned()))?;

        let mut vehicle = OwnedActor::new(self.world.spawn_vehicle(&vehicle_bp, &spawn)?);
        vehicle.get_mut()?.set_autopilot(false)?;
        let camera = CameraSensor::attach(
            self.world.as_ref(),
            &camera_bp,
            &self.config.camera_mount,
            vehicle.id(),
            self.config.frame_policy,
        )?;
        let observation = camera.get_frame()?;

        self.episodes += 1;
        info!(
            episode = self.episodes,
            vehicle = %vehicle.id(),
            blueprint = vehicle_bp.id(),
            camera = %camera.id(),
            spawn = ?spawn.location,
            ?goal,
            "Episode started"
        );
        self.episode = Some(Episode {
            reward: RewardCalculator::new(&self.config.params, goal, spawn.location),
            camera,
            vehicle,
            steps: 0,
        });
        self.state = EpisodeState::Running;
        Ok(observation)
    }

    /// Applies `[throttle, steer]`, each clamped to [-1, 1], and reports the
    /// resulting observation and reward. The episode is done once the vehicle
    /// has collided.
    ///
    /// # Errors
    /// Returns [`EnvError::NotRunning`] outside a running episode,
    /// [`EnvError::InvalidAction`] for a wrong length or NaN component, and
    /// simulator failures as [`EnvError::Sim`].
    pub fn step(&mut self, action: &[f32]) -> Result<Step<Observation, StepInfo>, EnvError> {
        let control = to_control(action)?;
        let episode = match (self.state, self.episode.as_mut()) {
            (EpisodeState::Running, Some(episode)) => episode,
            (state, _) => return Err(EnvError::NotRunning(state)),
        };

        episode.vehicle.get_mut()?.apply_control(control)?;
        let observation = episode.camera.get_frame()?;
        let snapshot = VehicleSnapshot::capture(episode.vehicle.get()?, self.map.as_ref())?;
        let reward = episode.reward.score(&snapshot);
        episode.steps += 1;

        let done = snapshot.collisions > 0;
        let truncated = !done && self.config.max_episode_steps.is_some_and(|max| episode.steps >= max);
        let info = StepInfo {
            step: episode.steps,
            reward,
            speed: snapshot.speed(),
            collisions: snapshot.collisions,
            frame: observation.frame(),
        };
        debug!(step = info.step, reward = reward.total(), speed = info.speed, done, truncated, "step");
        if done || truncated {
            self.state = EpisodeState::Terminated;
            info!(episode = self.episodes, steps = episode.steps, done, truncated, "Episode ended");
        }

        Ok(Step { observation, reward: reward.total(), done, truncated, info })
    }

    /// Destroys the current actors. Further calls are no-ops.
    ///
    /// # Errors
    /// Returns the simulator error if an actor could not be destroyed.
    pub fn close(&mut self) -> Result<(), EnvError> {
        if self.state == EpisodeState::Closed {
            return Ok(());
        }
        self.state = EpisodeState::Closed;
        if let Some(episode) = self.episode.take() {
            episode.teardown()?;
        }
        info!(episodes = self.episodes, "Driving environment closed");
        Ok(())
    }
}

fn to_control(action: &[f32]) -> Result<VehicleControl, EnvError> {
    let &[throttle, steer] = action else {
        return Err(EnvError::InvalidAction(format!(
            "expected {ACTION_DIM} components (throttle, steer), got {}",
            action.len()
        )));
    };
    if throttle.is_nan() || steer.is_nan() {
        return Err(EnvError::InvalidAction(format!("NaN component in {action:?}")));
    }
    Ok(VehicleControl::new(throttle.clamp(-1.0, 1.0), steer.clamp(-1.0, 1.0)))
}

impl rl::Env for DrivingEnv {
    type Observation = Observation;
    type Info = StepInfo;
    type Error = EnvError;

    fn reset(&mut self) -> Result<Observation, EnvError> {
        DrivingEnv::reset(self)
    }

    fn step(&mut self, action: &[f32]) -> Result<Step<Observation, StepInfo>, EnvError> {
        DrivingEnv::step(self, action)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        DrivingEnv::close(self)
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::new(-1.0, 1.0, &[ACTION_DIM], DType::F32)
    }

    fn observation_space(&self) -> BoxSpace {
        BoxSpace::new(0.0, 255.0, &[OBS_HEIGHT as usize, OBS_WIDTH as usize, OBS_CHANNELS], DType::U8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_clamped() {
        let control = to_control(&[2.0, -2.0]).unwrap();
        assert_eq!(control.throttle, 1.0);
        assert_eq!(control.steer, -1.0);

        let control = to_control(&[0.25, f32::NEG_INFINITY]).unwrap();
        assert_eq!(control.throttle, 0.25);
        assert_eq!(control.steer, -1.0);
    }

    #[test]
    fn malformed_actions_are_rejected() {
        assert!(matches!(to_control(&[0.5]), Err(EnvError::InvalidAction(_))));
        assert!(matches!(to_control(&[0.5, 0.0, 1.0]), Err(EnvError::InvalidAction(_))));
        assert!(matches!(to_control(&[f32::NAN, 0.0]), Err(EnvError::InvalidAction(_))));
    }

    #[test]
    fn state_names() {
        assert_eq!(EpisodeState::Terminated.to_string(), "terminated");
        assert_eq!(EnvError::NotRunning(EpisodeState::Closed).to_string(), "environment is not running (state: closed)");
    }
}
