use glam::Vec3;
use serde::{Deserialize, Serialize};
use sim::Transform;
use tracing::warn;

use crate::camera::FramePolicy;
use crate::error::EnvError;

/// Reward constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvParams {
    /// m/s. Upper bound for `target_speed`.
    pub max_speed: f32,
    /// m/s the speed term is centred on.
    pub target_speed: f32,
    /// Added to every reward once the vehicle has collided.
    pub collision_penalty: f32,
    /// Per metre away from the lane centre.
    pub lane_deviation_penalty: f32,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            max_speed: 30.0,
            target_speed: 20.0,
            collision_penalty: -50.0,
            lane_deviation_penalty: -0.1,
        }
    }
}

/// Serialised flat: the reward constants sit next to the other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EnvConfigFile")]
pub struct EnvConfig {
    #[serde(flatten)]
    pub params: EnvParams,
    /// Wildcard pattern; the first matching blueprint is spawned.
    pub vehicle_filter: String,
    /// Exact blueprint id of the camera.
    pub camera_blueprint: String,
    /// Camera position relative to the vehicle.
    pub camera_mount: Transform,
    /// Camera resolution `[width, height]`; simulator default when unset.
    pub camera_size: Option<[u32; 2]>,
    /// Target for the progress term. Episodes without a goal earn no progress reward.
    pub goal: Option<Vec3>,
    pub frame_policy: FramePolicy,
    /// Truncate episodes after this many steps.
    pub max_episode_steps: Option<usize>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            params: EnvParams::default(),
            vehicle_filter: "model3".to_owned(),
            camera_blueprint: "sensor.camera.rgb".to_owned(),
            camera_mount: Transform::from_location(Vec3::new(1.5, 0.0, 2.4)),
            camera_size: None,
            goal: None,
            frame_policy: FramePolicy::Zeroed,
            max_episode_steps: None,
        }
    }
}

// serde cannot combine `flatten` with `deny_unknown_fields`, so the flat
// layout is read through this mirror.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EnvConfigFile {
    max_speed: f32,
    target_speed: f32,
    collision_penalty: f32,
    lane_deviation_penalty: f32,
    vehicle_filter: String,
    camera_blueprint: String,
    camera_mount: Transform,
    camera_size: Option<[u32; 2]>,
    goal: Option<Vec3>,
    frame_policy: FramePolicy,
    max_episode_steps: Option<usize>,
}

impl Default for EnvConfigFile {
    fn default() -> Self {
        let EnvConfig {
            params,
            vehicle_filter,
            camera_blueprint,
            camera_mount,
            camera_size,
            goal,
            frame_policy,
            max_episode_steps,
        } = EnvConfig::default();
        Self {
            max_speed: params.max_speed,
            target_speed: params.target_speed,
            collision_penalty: params.collision_penalty,
            lane_deviation_penalty: params.lane_deviation_penalty,
            vehicle_filter,
            camera_blueprint,
            camera_mount,
            camera_size,
            goal,
            frame_policy,
            max_episode_steps,
        }
    }
}

impl From<EnvConfigFile> for EnvConfig {
    fn from(file: EnvConfigFile) -> Self {
        Self {
            params: EnvParams {
                max_speed: file.max_speed,
                target_speed: file.target_speed,
                collision_penalty: file.collision_penalty,
                lane_deviation_penalty: file.lane_deviation_penalty,
            },
            vehicle_filter: file.vehicle_filter,
            camera_blueprint: file.camera_blueprint,
            camera_mount: file.camera_mount,
            camera_size: file.camera_size,
            goal: file.goal,
            frame_policy: file.frame_policy,
            max_episode_steps: file.max_episode_steps,
        }
    }
}

impl EnvConfig {
    /// # Errors
    /// Returns [`EnvError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), EnvError> {
        let p = &self.params;
        if !(p.max_speed.is_finite() && p.max_speed > 0.0) {
            return Err(invalid("max_speed", format!("must be a positive number, got {}", p.max_speed)));
        }
        if !(p.target_speed.is_finite() && (0.0..=p.max_speed).contains(&p.target_speed)) {
            return Err(invalid(
                "target_speed",
                format!("must be in [0, {}], got {}", p.max_speed, p.target_speed),
            ));
        }
        if !p.collision_penalty.is_finite() {
            return Err(invalid("collision_penalty", "must be finite".to_owned()));
        }
        if !p.lane_deviation_penalty.is_finite() {
            return Err(invalid("lane_deviation_penalty", "must be finite".to_owned()));
        }
        if p.collision_penalty > 0.0 || p.lane_deviation_penalty > 0.0 {
            warn!(
                collision_penalty = p.collision_penalty,
                lane_deviation_penalty = p.lane_deviation_penalty,
                "Positive penalty configured, collisions or lane deviation will be rewarded"
            );
        }
        if self.vehicle_filter.trim().is_empty() {
            return Err(invalid("vehicle_filter", "must not be empty".to_owned()));
        }
        if self.camera_blueprint.trim().is_empty() {
            return Err(invalid("camera_blueprint", "must not be empty".to_owned()));
        }
        if let Some([w, h]) = self.camera_size {
            if w == 0 || h == 0 {
                return Err(invalid("camera_size", format!("must be non-zero, got {w}x{h}")));
            }
        }
        if self.goal.is_some_and(|g| !g.is_finite()) {
            return Err(invalid("goal", "must be finite".to_owned()));
        }
        if self.max_episode_steps == Some(0) {
            return Err(invalid("max_episode_steps", "must be > 0".to_owned()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> EnvError {
    EnvError::Config { field, reason }
}
