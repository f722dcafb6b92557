use std::fmt;

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World-space position in metres.
pub type Location = Vec3;
/// Velocity or impulse in world space.
pub type Vector3D = Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Orientation in degrees, simulator convention (yaw about +Z).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotation {
    #[must_use]
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    #[must_use]
    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::ZYX,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    #[must_use]
    pub fn forward_vector(&self) -> Vec3 {
        self.to_quat() * Vec3::X
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub location: Location,
    #[serde(default)]
    pub rotation: Rotation,
}

impl Transform {
    #[must_use]
    pub const fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    #[must_use]
    pub fn from_location(location: Location) -> Self {
        Self { location, rotation: Rotation::default() }
    }

    #[must_use]
    pub fn forward_vector(&self) -> Vec3 {
        self.rotation.forward_vector()
    }

    /// Maps a point expressed in this transform's local frame to world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.location + self.rotation.to_quat() * local
    }
}

/// Control command for a vehicle. Values outside the documented ranges are
/// clamped by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleControl {
    /// [-1, 1]; negative values act as braking.
    pub throttle: f32,
    /// [-1, 1]; negative steers left.
    pub steer: f32,
    /// [0, 1]
    pub brake: f32,
    pub hand_brake: bool,
    pub reverse: bool,
}

impl VehicleControl {
    #[must_use]
    pub const fn new(throttle: f32, steer: f32) -> Self {
        Self { throttle, steer, brake: 0.0, hand_brake: false, reverse: false }
    }
}

/// A point on the lane graph, located at the lane centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub transform: Transform,
    pub road_id: u32,
    pub lane_id: i32,
    pub lane_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub frame: u64,
    /// Blueprint id of whatever was hit.
    pub other_actor: String,
    pub normal_impulse: Vector3D,
}

impl CollisionEvent {
    #[must_use]
    pub fn intensity(&self) -> f32 {
        self.normal_impulse.length()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Bgra8,
    Rgba8,
}

impl PixelFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
        }
    }
}

/// Camera frame as delivered by the simulator, row-major.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub raw_data: Vec<u8>,
}

impl RawImage {
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}
