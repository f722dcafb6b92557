//! # Headless Simulator
//!
//! An in-process driving world implementing every trait in [`crate::world`].
//! It models a straight multi-lane road along +X (lane `k` is centred at
//! `y = k * lane_width`, +Y is to the driver's right), kinematic bicycle
//! vehicles, guardrails on both road edges, static obstacles and an RGB
//! camera that renders a coarse synthetic view of the road.
//!
//! ## Ticking
//!
//! [`TickMode`] decides when the world advances:
//!
//! -   `Manual`: only [`HeadlessWorld::tick`] advances it. Tests use this to
//!     pin vehicle state exactly.
//! -   `OnControl`: every `apply_control` advances one tick after recording the
//!     command, similar to a synchronous-mode client.
//! -   `Background`: a dedicated thread ticks at a fixed period and frame
//!     callbacks run on that thread, like an asynchronous-mode server.
//!
//! Camera callbacks are always invoked after the world lock is released.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::blueprint::{Blueprint, BlueprintLibrary};
use crate::error::SimError;
use crate::types::{
    ActorId, CollisionEvent, PixelFormat, RawImage, Rotation, Transform, VehicleControl, Waypoint,
};
use crate::world::{Actor, Client, ClientConfig, FrameCallback, Map, Sensor, Vehicle, World};

const VEHICLE_HALF_WIDTH: f32 = 0.95;
const VEHICLE_RADIUS: f32 = 1.2;
const VEHICLE_MASS: f32 = 1_800.0;
const SPAWN_CLEARANCE: f32 = 2.0;
const MARKING_HALF_WIDTH: f32 = 0.12;

const SKY: [u8; 3] = [135, 206, 235];
const GRASS: [u8; 3] = [70, 120, 50];
const ASPHALT: [u8; 3] = [80, 80, 85];
const MARKING: [u8; 3] = [240, 240, 240];
const BARRIER: [u8; 3] = [200, 40, 30];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TickMode {
    Manual,
    #[default]
    OnControl,
    Background { period_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Obstacle {
    pub location: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadlessConfig {
    pub map_name: String,
    pub lanes: u32,
    pub lane_width: f32,
    pub road_length: f32,
    pub spawn_points: Vec<Transform>,
    pub obstacles: Vec<Obstacle>,
    /// Seconds per tick.
    pub dt: f32,
    pub max_speed: f32,
    pub max_acceleration: f32,
    pub max_deceleration: f32,
    pub wheelbase: f32,
    /// Degrees at full steer.
    pub max_steer_angle: f32,
    pub camera_width: u32,
    pub camera_height: u32,
    pub tick_mode: TickMode,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        let lanes = 3;
        let lane_width = 3.5;
        Self {
            map_name: "Headless/StraightRoad".to_owned(),
            lanes,
            lane_width,
            road_length: 1_000.0,
            spawn_points: (0..lanes)
                .map(|lane| Transform::from_location(Vec3::new(10.0, lane as f32 * lane_width, 0.5)))
                .collect(),
            obstacles: Vec::new(),
            dt: 0.05,
            max_speed: 30.0,
            max_acceleration: 4.0,
            max_deceleration: 8.0,
            wheelbase: 2.9,
            max_steer_angle: 35.0,
            camera_width: 160,
            camera_height: 120,
            tick_mode: TickMode::OnControl,
        }
    }
}

impl HeadlessConfig {
    /// Rejects layouts the vehicle model cannot integrate, such as a zero
    /// wheelbase or time step.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidConfig`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.lanes == 0 {
            return Err(invalid("lanes", "must be > 0".to_owned()));
        }
        for (field, value) in [
            ("lane_width", self.lane_width),
            ("road_length", self.road_length),
            ("dt", self.dt),
            ("max_speed", self.max_speed),
            ("max_acceleration", self.max_acceleration),
            ("max_deceleration", self.max_deceleration),
            ("wheelbase", self.wheelbase),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, format!("must be a positive number, got {value}")));
            }
        }
        if !(self.max_steer_angle.is_finite() && (0.0..90.0).contains(&self.max_steer_angle)) {
            return Err(invalid(
                "max_steer_angle",
                format!("must be in [0, 90) degrees, got {}", self.max_steer_angle),
            ));
        }
        if self.camera_width == 0 || self.camera_height == 0 {
            return Err(invalid(
                "camera_width",
                format!("camera must be non-zero, got {}x{}", self.camera_width, self.camera_height),
            ));
        }
        if let Some(obstacle) = self.obstacles.iter().find(|o| !(o.location.is_finite() && o.radius > 0.0)) {
            return Err(invalid("obstacles", format!("bad obstacle {obstacle:?}")));
        }
        if self.spawn_points.iter().any(|t| !t.location.is_finite()) {
            return Err(invalid("spawn_points", "locations must be finite".to_owned()));
        }
        Ok(())
    }

    fn lane_count(&self) -> u32 {
        self.lanes.max(1)
    }

    /// Lateral extent of the paved road, guardrail to guardrail.
    fn road_bounds(&self) -> (f32, f32) {
        let lanes = self.lane_count() as f32;
        (-0.5 * self.lane_width, (lanes - 0.5) * self.lane_width)
    }

    fn nearest_lane(&self, y: f32) -> u32 {
        let lane = (y / self.lane_width).round().max(0.0) as u32;
        lane.min(self.lane_count() - 1)
    }

    fn waypoint(&self, location: Vec3) -> Waypoint {
        let lane = self.nearest_lane(location.y);
        let centre = Vec3::new(
            location.x.clamp(0.0, self.road_length),
            lane as f32 * self.lane_width,
            0.0,
        );
        Waypoint {
            transform: Transform::from_location(centre),
            road_id: 1,
            lane_id: -(lane as i32 + 1),
            lane_width: self.lane_width,
        }
    }
}

fn invalid(field: &'static str, reason: String) -> SimError {
    SimError::InvalidConfig { field, reason }
}

fn default_blueprints(config: &HeadlessConfig) -> BlueprintLibrary {
    BlueprintLibrary::new(vec![
        Blueprint::new("vehicle.tesla.model3", &["vehicle", "tesla", "model3"])
            .with_attribute("number_of_wheels", 4),
        Blueprint::new("vehicle.audi.tt", &["vehicle", "audi", "tt"])
            .with_attribute("number_of_wheels", 4),
        Blueprint::new("vehicle.lincoln.mkz_2020", &["vehicle", "lincoln", "mkz_2020"])
            .with_attribute("number_of_wheels", 4),
        Blueprint::new("sensor.camera.rgb", &["sensor", "camera", "rgb"])
            .with_attribute("image_size_x", config.camera_width)
            .with_attribute("image_size_y", config.camera_height)
            .with_attribute("fov", 90),
    ])
}

struct VehicleBody {
    transform: Transform,
    speed: f32,
    velocity: Vec3,
    control: Option<VehicleControl>,
    autopilot: bool,
    collisions: Vec<CollisionEvent>,
    contacts: BTreeSet<String>,
}

struct CameraBody {
    parent: ActorId,
    mount: Transform,
    width: u32,
    height: u32,
    callback: Option<Arc<Mutex<FrameCallback>>>,
}

enum Body {
    Vehicle(VehicleBody),
    Camera(CameraBody),
}

type Delivery = (Arc<Mutex<FrameCallback>>, RawImage);

struct SimState {
    config: HeadlessConfig,
    actors: BTreeMap<ActorId, Body>,
    undestroyable: BTreeSet<ActorId>,
    next_id: u32,
    frame: u64,
    spawned: usize,
}

impl SimState {
    fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            actors: BTreeMap::new(),
            undestroyable: BTreeSet::new(),
            next_id: 1,
            frame: 0,
            spawned: 0,
        }
    }

    fn allocate_id(&mut self) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;
        self.spawned += 1;
        id
    }

    fn vehicle(&self, id: ActorId) -> Result<&VehicleBody, SimError> {
        match self.actors.get(&id) {
            Some(Body::Vehicle(v)) => Ok(v),
            Some(Body::Camera(_)) => Err(SimError::WrongActorKind(id, "vehicle")),
            None => Err(SimError::ActorDestroyed(id)),
        }
    }

    fn vehicle_mut(&mut self, id: ActorId) -> Result<&mut VehicleBody, SimError> {
        match self.actors.get_mut(&id) {
            Some(Body::Vehicle(v)) => Ok(v),
            Some(Body::Camera(_)) => Err(SimError::WrongActorKind(id, "vehicle")),
            None => Err(SimError::ActorDestroyed(id)),
        }
    }

    fn camera_mut(&mut self, id: ActorId) -> Result<&mut CameraBody, SimError> {
        match self.actors.get_mut(&id) {
            Some(Body::Camera(c)) => Ok(c),
            Some(Body::Vehicle(_)) => Err(SimError::WrongActorKind(id, "camera")),
            None => Err(SimError::ActorDestroyed(id)),
        }
    }

    fn advance(&mut self) {
        self.frame += 1;
        let frame = self.frame;
        let config = &self.config;
        for body in self.actors.values_mut() {
            if let Body::Vehicle(vehicle) = body {
                step_vehicle(config, frame, vehicle);
            }
        }
    }

    fn capture(&self) -> Vec<Delivery> {
        self.actors
            .values()
            .filter_map(|body| match body {
                Body::Camera(camera) => {
                    let callback = camera.callback.as_ref()?;
                    let Some(Body::Vehicle(parent)) = self.actors.get(&camera.parent) else {
                        return None;
                    };
                    let image = render_frame(&self.config, self.frame, parent, camera);
                    Some((Arc::clone(callback), image))
                }
                Body::Vehicle(_) => None,
            })
            .collect()
    }
}

fn step_vehicle(config: &HeadlessConfig, frame: u64, vehicle: &mut VehicleBody) {
    let control = if vehicle.autopilot {
        autopilot_control(config, vehicle)
    } else {
        vehicle.control.unwrap_or_default()
    };
    let throttle = control.throttle.clamp(-1.0, 1.0);
    let mut accel = if throttle >= 0.0 {
        throttle * config.max_acceleration
    } else {
        throttle * config.max_deceleration
    };
    accel -= control.brake.clamp(0.0, 1.0) * config.max_deceleration;
    if control.hand_brake {
        accel = -config.max_deceleration;
    }
    vehicle.speed = (vehicle.speed + accel * config.dt).clamp(0.0, config.max_speed);

    let steer = control.steer.clamp(-1.0, 1.0) * config.max_steer_angle.to_radians();
    let yaw_rate = vehicle.speed / config.wheelbase * steer.tan();
    let yaw = vehicle.transform.rotation.yaw + yaw_rate.to_degrees() * config.dt;
    vehicle.transform.rotation.yaw = (yaw + 180.0).rem_euclid(360.0) - 180.0;

    let direction = if control.reverse { -1.0 } else { 1.0 };
    vehicle.velocity = vehicle.transform.forward_vector() * vehicle.speed * direction;
    vehicle.transform.location += vehicle.velocity * config.dt;

    detect_collisions(config, frame, vehicle);
}

fn autopilot_control(config: &HeadlessConfig, vehicle: &VehicleBody) -> VehicleControl {
    let location = vehicle.transform.location;
    let lane_y = config.nearest_lane(location.y) as f32 * config.lane_width;
    let heading = vehicle.transform.rotation.yaw.to_radians();
    let steer = (0.3 * (lane_y - location.y) - 1.5 * heading).clamp(-1.0, 1.0);
    let throttle = if vehicle.speed < 0.5 * config.max_speed { 0.5 } else { 0.0 };
    VehicleControl::new(throttle, steer)
}

fn detect_collisions(config: &HeadlessConfig, frame: u64, vehicle: &mut VehicleBody) {
    let location = vehicle.transform.location;
    let (low, high) = config.road_bounds();
    let mut touching: BTreeMap<String, &'static str> = BTreeMap::new();

    if location.y - VEHICLE_HALF_WIDTH < low || location.y + VEHICLE_HALF_WIDTH > high {
        touching.insert("guardrail".to_owned(), "static.guardrail");
    }
    for (i, obstacle) in config.obstacles.iter().enumerate() {
        let gap = (location - obstacle.location).truncate().length();
        if gap < obstacle.radius + VEHICLE_RADIUS {
            touching.insert(format!("obstacle-{i}"), "static.prop.streetbarrier");
        }
    }

    let mut crashed = false;
    for (key, other) in &touching {
        if !vehicle.contacts.contains(key) {
            vehicle.collisions.push(CollisionEvent {
                frame,
                other_actor: (*other).to_owned(),
                normal_impulse: -vehicle.velocity * VEHICLE_MASS,
            });
            crashed = true;
        }
    }
    if crashed {
        debug!(frame, "vehicle collision recorded");
        vehicle.speed = 0.0;
        vehicle.velocity = Vec3::ZERO;
    }
    vehicle.contacts = touching.into_keys().collect();
}

fn render_frame(
    config: &HeadlessConfig,
    frame: u64,
    vehicle: &VehicleBody,
    camera: &CameraBody,
) -> RawImage {
    let width = camera.width.max(1);
    let height = camera.height.max(2);
    let horizon = height / 2;
    let eye = vehicle.transform.transform_point(camera.mount.location);
    let forward = vehicle.transform.forward_vector().truncate().extend(0.0).normalize_or_zero();
    let right = Vec3::new(-forward.y, forward.x, 0.0);
    let eye_height = eye.z.max(0.5);

    let mut raw_data = Vec::with_capacity(width as usize * height as usize * 4);
    for row in 0..height {
        for col in 0..width {
            let rgb = if row < horizon {
                SKY
            } else {
                let depth = (row - horizon + 1) as f32 / (height - horizon) as f32;
                let distance = eye_height / (0.5 * depth);
                // 90 degree horizontal field of view
                let lateral = (col as f32 / width as f32 - 0.5) * 2.0 * distance;
                classify_ground(config, eye + forward * distance + right * lateral)
            };
            raw_data.extend_from_slice(&[rgb[2], rgb[1], rgb[0], u8::MAX]);
        }
    }

    RawImage { frame, width, height, format: PixelFormat::Bgra8, raw_data }
}

fn classify_ground(config: &HeadlessConfig, point: Vec3) -> [u8; 3] {
    let (low, high) = config.road_bounds();
    if point.y < low || point.y > high {
        return GRASS;
    }
    if config
        .obstacles
        .iter()
        .any(|o| (point - o.location).truncate().length() < o.radius)
    {
        return BARRIER;
    }
    let boundary = (point.y - low) / config.lane_width;
    if (boundary - boundary.round()).abs() * config.lane_width < MARKING_HALF_WIDTH {
        MARKING
    } else {
        ASPHALT
    }
}

struct Shared {
    state: Mutex<SimState>,
    running: AtomicBool,
}

impl Shared {
    fn tick(&self) -> u64 {
        let (frame, deliveries) = {
            let mut state = self.state.lock();
            state.advance();
            (state.frame, state.capture())
        };
        deliver(deliveries);
        frame
    }
}

fn deliver(deliveries: Vec<Delivery>) {
    for (callback, image) in deliveries {
        let mut callback = callback.lock();
        (&mut *callback)(image);
    }
}

fn spawn_ticker(shared: Arc<Shared>, period: Duration) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name("headless-ticker".to_owned())
        .spawn(move || {
            while shared.running.load(Ordering::Acquire) {
                let started = Instant::now();
                shared.tick();
                if let Some(rest) = period.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to start background ticker, falling back to manual ticking: {e}");
            None
        }
    }
}

/// The headless world. Shared behind an `Arc`; test hooks are inherent methods.
pub struct HeadlessWorld {
    shared: Arc<Shared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl HeadlessWorld {
    #[must_use]
    pub fn new(config: HeadlessConfig) -> Arc<Self> {
        let tick_mode = config.tick_mode;
        let shared = Arc::new(Shared {
            state: Mutex::new(SimState::new(config)),
            running: AtomicBool::new(true),
        });
        let ticker = match tick_mode {
            TickMode::Background { period_ms } => {
                spawn_ticker(Arc::clone(&shared), Duration::from_millis(period_ms.max(1)))
            }
            TickMode::Manual | TickMode::OnControl => None,
        };
        Arc::new(Self { shared, ticker: Mutex::new(ticker) })
    }

    #[must_use]
    pub fn config(&self) -> HeadlessConfig {
        self.shared.state.lock().config.clone()
    }

    /// Advances the world one step and delivers camera frames. Returns the new
    /// frame number.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.shared.tick()
    }

    /// Delivers camera frames for the current state without advancing it.
    /// Returns how many cameras were served.
    #[must_use]
    pub fn emit_frames(&self) -> usize {
        let deliveries = self.shared.state.lock().capture();
        let count = deliveries.len();
        deliver(deliveries);
        count
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.shared.state.lock().frame
    }

    #[must_use]
    pub fn live_actors(&self) -> Vec<ActorId> {
        self.shared.state.lock().actors.keys().copied().collect()
    }

    #[must_use]
    pub fn live_vehicles(&self) -> usize {
        let state = self.shared.state.lock();
        state.actors.values().filter(|b| matches!(b, Body::Vehicle(_))).count()
    }

    #[must_use]
    pub fn live_sensors(&self) -> usize {
        let state = self.shared.state.lock();
        state.actors.values().filter(|b| matches!(b, Body::Camera(_))).count()
    }

    /// Number of actors ever spawned in this world.
    #[must_use]
    pub fn spawned_total(&self) -> usize {
        self.shared.state.lock().spawned
    }

    /// Most recent control applied to a live vehicle.
    #[must_use]
    pub fn last_control(&self, id: ActorId) -> Option<VehicleControl> {
        self.shared.state.lock().vehicle(id).ok().and_then(|v| v.control)
    }

    /// # Errors
    /// Returns [`SimError`] if `id` is not a live vehicle.
    pub fn set_velocity(&self, id: ActorId, velocity: Vec3) -> Result<(), SimError> {
        let mut state = self.shared.state.lock();
        let vehicle = state.vehicle_mut(id)?;
        vehicle.velocity = velocity;
        vehicle.speed = velocity.length();
        Ok(())
    }

    /// # Errors
    /// Returns [`SimError`] if `id` is not a live vehicle.
    pub fn set_transform(&self, id: ActorId, transform: Transform) -> Result<(), SimError> {
        let mut state = self.shared.state.lock();
        state.vehicle_mut(id)?.transform = transform;
        Ok(())
    }

    /// Appends a collision with `other_actor` to the vehicle's history.
    ///
    /// # Errors
    /// Returns [`SimError`] if `id` is not a live vehicle.
    pub fn inject_collision(&self, id: ActorId, other_actor: &str) -> Result<(), SimError> {
        let mut state = self.shared.state.lock();
        let frame = state.frame;
        let vehicle = state.vehicle_mut(id)?;
        vehicle.collisions.push(CollisionEvent {
            frame,
            other_actor: other_actor.to_owned(),
            normal_impulse: -vehicle.velocity * VEHICLE_MASS,
        });
        Ok(())
    }

    /// While `refuse` is set, destroying `id` fails with
    /// [`SimError::DestroyRefused`] and the actor stays in the world.
    pub fn refuse_destroy(&self, id: ActorId, refuse: bool) {
        let mut state = self.shared.state.lock();
        if refuse {
            state.undestroyable.insert(id);
        } else {
            state.undestroyable.remove(&id);
        }
    }

    fn handle(&self, id: ActorId, type_name: &str) -> Handle {
        Handle {
            id,
            type_name: type_name.to_owned(),
            shared: Arc::clone(&self.shared),
            alive: true,
        }
    }
}

impl Drop for HeadlessWorld {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.ticker.lock().take() {
            if handle.join().is_err() {
                warn!("Background ticker panicked");
            }
        }
    }
}

impl World for HeadlessWorld {
    fn blueprint_library(&self) -> Result<BlueprintLibrary, SimError> {
        Ok(default_blueprints(&self.shared.state.lock().config))
    }

    fn map(&self) -> Result<Arc<dyn Map>, SimError> {
        Ok(Arc::new(HeadlessMap { config: self.config() }))
    }

    fn spawn_vehicle(
        &self,
        blueprint: &Blueprint,
        transform: &Transform,
    ) -> Result<Box<dyn Vehicle>, SimError> {
        if !blueprint.id().starts_with("vehicle.") {
            return Err(SimError::SpawnFailed {
                blueprint: blueprint.id().to_owned(),
                reason: "not a vehicle blueprint".to_owned(),
            });
        }
        let mut state = self.shared.state.lock();
        let occupied = state.actors.values().any(|body| match body {
            Body::Vehicle(v) => {
                (v.transform.location - transform.location).truncate().length() < SPAWN_CLEARANCE
            }
            Body::Camera(_) => false,
        });
        if occupied {
            return Err(SimError::SpawnFailed {
                blueprint: blueprint.id().to_owned(),
                reason: "spawn point is occupied".to_owned(),
            });
        }
        let id = state.allocate_id();
        state.actors.insert(
            id,
            Body::Vehicle(VehicleBody {
                transform: *transform,
                speed: 0.0,
                velocity: Vec3::ZERO,
                control: None,
                autopilot: false,
                collisions: Vec::new(),
                contacts: BTreeSet::new(),
            }),
        );
        drop(state);
        debug!(actor = %id, blueprint = blueprint.id(), "spawned vehicle");
        Ok(Box::new(HeadlessVehicle(self.handle(id, blueprint.id()))))
    }

    fn spawn_sensor(
        &self,
        blueprint: &Blueprint,
        transform: &Transform,
        parent: ActorId,
    ) -> Result<Box<dyn Sensor>, SimError> {
        if !blueprint.id().starts_with("sensor.camera") {
            return Err(SimError::SpawnFailed {
                blueprint: blueprint.id().to_owned(),
                reason: "unsupported sensor".to_owned(),
            });
        }
        let mut state = self.shared.state.lock();
        if state.vehicle(parent).is_err() {
            return Err(SimError::SpawnFailed {
                blueprint: blueprint.id().to_owned(),
                reason: format!("parent {parent} is not a live vehicle"),
            });
        }
        let dimension = |key: &str, fallback: u32| {
            blueprint.attribute(key).and_then(|v| v.parse().ok()).unwrap_or(fallback)
        };
        let width = dimension("image_size_x", state.config.camera_width);
        let height = dimension("image_size_y", state.config.camera_height);
        let id = state.allocate_id();
        state.actors.insert(
            id,
            Body::Camera(CameraBody { parent, mount: *transform, width, height, callback: None }),
        );
        drop(state);
        debug!(actor = %id, %parent, width, height, "spawned camera");
        Ok(Box::new(HeadlessCamera(self.handle(id, blueprint.id()))))
    }
}

struct HeadlessMap {
    config: HeadlessConfig,
}

impl Map for HeadlessMap {
    fn name(&self) -> &str {
        &self.config.map_name
    }

    fn spawn_points(&self) -> Vec<Transform> {
        self.config.spawn_points.clone()
    }

    fn waypoint(&self, location: Vec3) -> Result<Waypoint, SimError> {
        Ok(self.config.waypoint(location))
    }
}

struct Handle {
    id: ActorId,
    type_name: String,
    shared: Arc<Shared>,
    alive: bool,
}

impl Handle {
    fn is_alive(&self) -> bool {
        self.alive && self.shared.state.lock().actors.contains_key(&self.id)
    }

    fn destroy(&mut self) -> Result<(), SimError> {
        if !self.alive {
            return Err(SimError::ActorDestroyed(self.id));
        }
        let mut state = self.shared.state.lock();
        if state.undestroyable.contains(&self.id) {
            return Err(SimError::DestroyRefused(self.id));
        }
        self.alive = false;
        match state.actors.remove(&self.id) {
            Some(_) => {
                debug!(actor = %self.id, kind = %self.type_name, "destroyed actor");
                Ok(())
            }
            None => Err(SimError::ActorDestroyed(self.id)),
        }
    }
}

/// Handle to a vehicle in a [`HeadlessWorld`].
pub struct HeadlessVehicle(Handle);

impl Actor for HeadlessVehicle {
    fn id(&self) -> ActorId {
        self.0.id
    }

    fn type_name(&self) -> &str {
        &self.0.type_name
    }

    fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    fn destroy(&mut self) -> Result<(), SimError> {
        self.0.destroy()
    }

    fn transform(&self) -> Result<Transform, SimError> {
        Ok(self.0.shared.state.lock().vehicle(self.0.id)?.transform)
    }
}

impl Vehicle for HeadlessVehicle {
    fn apply_control(&mut self, control: VehicleControl) -> Result<(), SimError> {
        let tick_mode = {
            let mut state = self.0.shared.state.lock();
            state.vehicle_mut(self.0.id)?.control = Some(control);
            state.config.tick_mode
        };
        if tick_mode == TickMode::OnControl {
            self.0.shared.tick();
        }
        Ok(())
    }

    fn set_autopilot(&mut self, enabled: bool) -> Result<(), SimError> {
        self.0.shared.state.lock().vehicle_mut(self.0.id)?.autopilot = enabled;
        Ok(())
    }

    fn velocity(&self) -> Result<Vec3, SimError> {
        Ok(self.0.shared.state.lock().vehicle(self.0.id)?.velocity)
    }

    fn collision_history(&self) -> Result<Vec<CollisionEvent>, SimError> {
        Ok(self.0.shared.state.lock().vehicle(self.0.id)?.collisions.clone())
    }
}

/// Handle to an RGB camera in a [`HeadlessWorld`].
pub struct HeadlessCamera(Handle);

impl Actor for HeadlessCamera {
    fn id(&self) -> ActorId {
        self.0.id
    }

    fn type_name(&self) -> &str {
        &self.0.type_name
    }

    fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    fn destroy(&mut self) -> Result<(), SimError> {
        self.0.destroy()
    }

    fn transform(&self) -> Result<Transform, SimError> {
        let state = self.0.shared.state.lock();
        let Some(Body::Camera(camera)) = state.actors.get(&self.0.id) else {
            return Err(SimError::ActorDestroyed(self.0.id));
        };
        let parent = state.vehicle(camera.parent)?;
        let location = parent.transform.transform_point(camera.mount.location);
        let rotation = Rotation::new(
            parent.transform.rotation.pitch + camera.mount.rotation.pitch,
            parent.transform.rotation.yaw + camera.mount.rotation.yaw,
            parent.transform.rotation.roll + camera.mount.rotation.roll,
        );
        Ok(Transform::new(location, rotation))
    }
}

impl Sensor for HeadlessCamera {
    fn listen(&mut self, callback: FrameCallback) -> Result<(), SimError> {
        let mut state = self.0.shared.state.lock();
        let camera = state.camera_mut(self.0.id)?;
        if camera.callback.is_some() {
            return Err(SimError::AlreadyListening(self.0.id));
        }
        camera.callback = Some(Arc::new(Mutex::new(callback)));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SimError> {
        self.0.shared.state.lock().camera_mut(self.0.id)?.callback = None;
        Ok(())
    }

    fn is_listening(&self) -> bool {
        matches!(
            self.0.shared.state.lock().actors.get(&self.0.id),
            Some(Body::Camera(CameraBody { callback: Some(_), .. }))
        )
    }
}

/// Client for the in-process world. `connect` validates the session settings
/// the same way a networked client would before handing out the world.
pub struct HeadlessClient {
    world: Arc<HeadlessWorld>,
}

impl HeadlessClient {
    /// # Errors
    /// Returns [`SimError::Connection`] for an empty host and
    /// [`SimError::Timeout`] for a non-positive timeout.
    pub fn connect(config: &ClientConfig, world: HeadlessConfig) -> Result<Self, SimError> {
        if config.host.trim().is_empty() {
            return Err(SimError::Connection {
                host: config.host.clone(),
                port: config.port,
                reason: "empty host name".to_owned(),
            });
        }
        if config.timeout_secs <= 0.0 {
            return Err(SimError::Timeout(config.timeout()));
        }
        world.validate()?;
        info!(
            host = %config.host,
            port = config.port,
            map = %world.map_name,
            "Connected to headless simulator"
        );
        Ok(Self { world: HeadlessWorld::new(world) })
    }

    /// Concrete world, for inspection hooks.
    #[must_use]
    pub fn headless_world(&self) -> Arc<HeadlessWorld> {
        Arc::clone(&self.world)
    }
}

impl Client for HeadlessClient {
    fn world(&self) -> Result<Arc<dyn World>, SimError> {
        let world: Arc<dyn World> = self.world.clone();
        Ok(world)
    }

    fn server_version(&self) -> Result<String, SimError> {
        Ok(format!("headless-{}", env!("CARGO_PKG_VERSION")))
    }
}
