//! Per-step reward.
//!
//! The reward is the sum of four terms:
//!
//! | term           | value                                                |
//! |----------------|------------------------------------------------------|
//! | speed          | `-abs(speed - target_speed) / 10`                    |
//! | lane deviation | `lane_deviation_penalty * distance to lane centre`   |
//! | collision      | `collision_penalty` once any collision happened      |
//! | progress       | `(previous - current distance to goal) * 0.1`        |
//!
//! Nothing is clamped or normalised. Without a goal the progress term is zero.

use glam::Vec3;
use serde::Serialize;
use sim::{Map, Vehicle};

use crate::config::EnvParams;
use crate::error::EnvError;

const SPEED_SCALE: f32 = 10.0;
const PROGRESS_SCALE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RewardBreakdown {
    pub speed: f32,
    pub lane_deviation: f32,
    pub collision: f32,
    pub progress: f32,
}

impl RewardBreakdown {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.speed + self.lane_deviation + self.collision + self.progress
    }
}

/// The vehicle state one reward evaluation depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSnapshot {
    pub velocity: Vec3,
    pub location: Vec3,
    /// Centre of the nearest lane.
    pub lane_center: Vec3,
    /// Length of the collision history.
    pub collisions: usize,
}

impl VehicleSnapshot {
    /// # Errors
    /// Returns [`EnvError::Sim`] if the vehicle or map cannot be queried.
    pub fn capture(vehicle: &dyn Vehicle, map: &dyn Map) -> Result<Self, EnvError> {
        let location = vehicle.location()?;
        Ok(Self {
            velocity: vehicle.velocity()?,
            location,
            lane_center: map.waypoint(location)?.transform.location,
            collisions: vehicle.collision_history()?.len(),
        })
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    #[must_use]
    pub fn lane_deviation(&self) -> f32 {
        self.location.distance(self.lane_center)
    }
}

/// Scores vehicle snapshots for one episode.
///
/// Holds the only state of the reward: the distance to the goal at the
/// previous evaluation.
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    params: EnvParams,
    goal: Option<Vec3>,
    prev_distance: Option<f32>,
}

impl RewardCalculator {
    /// `start` is where the vehicle begins the episode; the first progress term
    /// is measured from there.
    #[must_use]
    pub fn new(params: &EnvParams, goal: Option<Vec3>, start: Vec3) -> Self {
        Self { params: *params, goal, prev_distance: goal.map(|g| start.distance(g)) }
    }

    #[must_use]
    pub fn goal(&self) -> Option<Vec3> {
        self.goal
    }

    #[must_use]
    pub fn prev_distance(&self) -> Option<f32> {
        self.prev_distance
    }

    /// Scores a snapshot and advances the progress baseline.
    pub fn score(&mut self, snapshot: &VehicleSnapshot) -> RewardBreakdown {
        RewardBreakdown {
            speed: -(snapshot.speed() - self.params.target_speed).abs() / SPEED_SCALE,
            lane_deviation: self.params.lane_deviation_penalty * snapshot.lane_deviation(),
            collision: if snapshot.collisions > 0 { self.params.collision_penalty } else { 0.0 },
            progress: self.progress(snapshot.location),
        }
    }

    /// Captures the vehicle's current state and scores it.
    ///
    /// # Errors
    /// Returns [`EnvError::Sim`] if the vehicle or map cannot be queried.
    pub fn compute(&mut self, vehicle: &dyn Vehicle, map: &dyn Map) -> Result<RewardBreakdown, EnvError> {
        let snapshot = VehicleSnapshot::capture(vehicle, map)?;
        Ok(self.score(&snapshot))
    }

    fn progress(&mut self, location: Vec3) -> f32 {
        let (Some(goal), Some(prev)) = (self.goal, self.prev_distance) else {
            return 0.0;
        };
        let current = location.distance(goal);
        self.prev_distance = Some(current);
        (prev - current) * PROGRESS_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(velocity: Vec3, location: Vec3, collisions: usize) -> VehicleSnapshot {
        VehicleSnapshot {
            velocity,
            location,
            lane_center: Vec3::new(location.x, 0.0, location.z),
            collisions,
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn speed_term_uses_velocity_norm() {
        let mut calc = RewardCalculator::new(&EnvParams::default(), None, Vec3::ZERO);
        let reward = calc.score(&snapshot(Vec3::new(3.0, 4.0, 0.0), Vec3::ZERO, 0));
        // |5 - 20| / 10
        assert!(close(reward.speed, -1.5));
        assert_eq!(reward.progress, 0.0);
    }

    #[test]
    fn terms_add_up() {
        let params = EnvParams::default();
        let mut calc = RewardCalculator::new(&params, Some(Vec3::new(100.0, 0.0, 0.0)), Vec3::ZERO);
        // On the line to the goal, two metres off a neighbouring lane centre.
        let reward = calc.score(&VehicleSnapshot {
            velocity: Vec3::new(20.0, 0.0, 0.0),
            location: Vec3::new(10.0, 0.0, 0.0),
            lane_center: Vec3::new(10.0, -2.0, 0.0),
            collisions: 1,
        });
        assert!(close(reward.speed, 0.0));
        assert!(close(reward.lane_deviation, -0.2));
        assert_eq!(reward.collision, -50.0);
        assert!(close(reward.progress, 1.0));
        assert!(close(reward.total(), -50.0 - 0.2 + 1.0));
    }

    #[test]
    fn collision_term_is_flat() {
        let mut calc = RewardCalculator::new(&EnvParams::default(), None, Vec3::ZERO);
        assert_eq!(calc.score(&snapshot(Vec3::ZERO, Vec3::ZERO, 0)).collision, 0.0);
        assert_eq!(calc.score(&snapshot(Vec3::ZERO, Vec3::ZERO, 1)).collision, -50.0);
        assert_eq!(calc.score(&snapshot(Vec3::ZERO, Vec3::ZERO, 9)).collision, -50.0);
    }

    #[test]
    fn progress_tracks_previous_distance() {
        let goal = Vec3::new(50.0, 0.0, 0.0);
        let mut calc = RewardCalculator::new(&EnvParams::default(), Some(goal), Vec3::ZERO);
        assert_eq!(calc.prev_distance(), Some(50.0));

        let first = calc.score(&snapshot(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0));
        assert!(close(first.progress, 1.0));
        assert_eq!(calc.prev_distance(), Some(40.0));

        // Standing still earns nothing; moving away is penalised.
        let second = calc.score(&snapshot(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0));
        assert!(close(second.progress, 0.0));
        let third = calc.score(&snapshot(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0));
        assert!(close(third.progress, -0.5));
    }
}
