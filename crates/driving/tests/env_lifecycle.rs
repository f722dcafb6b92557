use std::sync::Arc;
use std::time::Duration;

use driving::{DrivingEnv, EnvConfig, EnvError, EpisodeState, FramePolicy, Observation};
use rl::{Env, Ppo, PpoParams, RandomPolicy};
use sim::{Client, ClientConfig, HeadlessClient, HeadlessConfig, HeadlessWorld, TickMode, Transform, Vec3};

const SPAWN: Vec3 = Vec3::new(10.0, 0.0, 0.5);

fn headless(tick_mode: TickMode) -> HeadlessConfig {
    HeadlessConfig {
        spawn_points: vec![Transform::from_location(SPAWN)],
        tick_mode,
        ..HeadlessConfig::default()
    }
}

fn env_with(tick_mode: TickMode, config: EnvConfig) -> anyhow::Result<(DrivingEnv, Arc<HeadlessWorld>)> {
    let client = HeadlessClient::connect(&ClientConfig::default(), headless(tick_mode))?;
    let env = DrivingEnv::connect(&client, config)?;
    Ok((env, client.headless_world()))
}

fn assert_observation_shape(obs: &Observation) {
    assert_eq!(Observation::shape(), [84, 84, 3]);
    assert_eq!(obs.pixels().len(), 84 * 84 * 3);
}

#[test]
fn out_of_range_actions_are_clamped() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    let obs = env.reset()?;
    assert_observation_shape(&obs);
    assert_eq!(env.state(), EpisodeState::Running);

    let step = env.step(&[2.0, -2.0])?;
    let vehicle = env.vehicle_id().expect("vehicle spawned");
    let control = world.last_control(vehicle).expect("control applied");
    assert_eq!(control.throttle, 1.0);
    assert_eq!(control.steer, -1.0);
    assert!(!step.done);
    assert!(!step.truncated);
    assert_observation_shape(&step.observation);
    Ok(())
}

#[test]
fn repeated_resets_never_duplicate_actors() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::OnControl, EnvConfig::default())?;
    let mut previous = None;
    for _ in 0..5 {
        env.reset()?;
        env.step(&[0.5, 0.0])?;
        assert_eq!(world.live_vehicles(), 1);
        assert_eq!(world.live_sensors(), 1);
        let vehicle = env.vehicle_id().expect("vehicle spawned");
        if let Some(old) = previous {
            assert_ne!(old, vehicle);
            assert!(!world.live_actors().contains(&old));
        }
        previous = Some(vehicle);
    }
    assert_eq!(world.spawned_total(), 10);
    assert_eq!(env.episodes(), 5);
    Ok(())
}

#[test]
fn done_iff_collision_history_is_non_empty() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    env.reset()?;
    let vehicle = env.vehicle_id().expect("vehicle spawned");

    // Far off the lane centre and well above the target speed: still not done.
    world.set_transform(vehicle, Transform::from_location(Vec3::new(10.0, 1.6, 0.5)))?;
    world.set_velocity(vehicle, Vec3::new(29.0, 0.0, 0.0))?;
    let step = env.step(&[0.0, 0.0])?;
    assert!(!step.done);
    assert_eq!(step.info.reward.collision, 0.0);

    world.inject_collision(vehicle, "static.guardrail")?;
    let step = env.step(&[0.0, 0.0])?;
    assert!(step.done);
    assert_eq!(step.info.collisions, 1);
    assert_eq!(step.info.reward.collision, -50.0);
    assert_eq!(env.state(), EpisodeState::Terminated);

    assert!(matches!(env.step(&[0.0, 0.0]), Err(EnvError::NotRunning(EpisodeState::Terminated))));

    // A fresh vehicle starts with a clean history.
    env.reset()?;
    assert!(!env.step(&[0.0, 0.0])?.done);
    Ok(())
}

#[test]
fn reward_is_the_sum_of_its_terms() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    env.reset()?;
    let vehicle = env.vehicle_id().expect("vehicle spawned");
    world.set_velocity(vehicle, Vec3::new(3.0, 4.0, 0.0))?;

    let step = env.step(&[0.0, 0.0])?;
    let terms = step.info.reward;
    assert!((step.info.speed - 5.0).abs() < 1e-5);
    assert!((terms.speed + 1.5).abs() < 1e-5);
    // The spawn point sits 0.5 m above the lane centre waypoint.
    assert!((terms.lane_deviation + 0.05).abs() < 1e-5);
    assert_eq!(terms.collision, 0.0);
    assert_eq!(terms.progress, 0.0);
    assert!((step.reward - (terms.speed + terms.lane_deviation + terms.collision + terms.progress)).abs() < 1e-6);
    Ok(())
}

#[test]
fn progress_is_measured_towards_the_episode_goal() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    env.reset_with_goal(Some(Vec3::new(110.0, 0.0, 0.5)))?;
    assert_eq!(env.goal(), Some(Vec3::new(110.0, 0.0, 0.5)));
    let vehicle = env.vehicle_id().expect("vehicle spawned");

    let step = env.step(&[0.0, 0.0])?;
    assert!(step.info.reward.progress.abs() < 1e-5);

    world.set_transform(vehicle, Transform::from_location(Vec3::new(20.0, 0.0, 0.5)))?;
    let step = env.step(&[0.0, 0.0])?;
    assert!((step.info.reward.progress - 1.0).abs() < 1e-4);

    // reset() falls back to the configured goal, which is none here.
    env.reset()?;
    assert_eq!(env.goal(), None);
    Ok(())
}

#[test]
fn zeroed_policy_returns_black_frame_until_the_camera_fires() -> anyhow::Result<()> {
    let (mut env, _world) = env_with(TickMode::OnControl, EnvConfig::default())?;
    let first = env.reset()?;
    assert_eq!(first, Observation::zeroed());

    let step = env.step(&[1.0, 0.0])?;
    assert!(step.info.frame.is_some());
    assert!(step.observation.pixels().iter().any(|&b| b != 0));
    assert_observation_shape(&step.observation);
    Ok(())
}

#[test]
fn block_policy_waits_for_an_asynchronous_frame() -> anyhow::Result<()> {
    let config = EnvConfig { frame_policy: FramePolicy::block(Duration::from_secs(5)), ..EnvConfig::default() };
    let (mut env, _world) = env_with(TickMode::Background { period_ms: 5 }, config)?;
    let obs = env.reset()?;
    assert!(obs.frame().is_some());
    assert_observation_shape(&obs);
    env.close()?;
    Ok(())
}

#[test]
fn block_policy_times_out_and_cleans_up() -> anyhow::Result<()> {
    let config = EnvConfig { frame_policy: FramePolicy::block(Duration::from_millis(30)), ..EnvConfig::default() };
    let (mut env, world) = env_with(TickMode::Manual, config)?;
    assert!(matches!(env.reset(), Err(EnvError::FrameTimeout(_))));
    assert!(world.live_actors().is_empty());
    assert_eq!(env.state(), EpisodeState::Uninitialized);
    Ok(())
}

#[test]
fn episodes_truncate_at_the_step_limit() -> anyhow::Result<()> {
    let config = EnvConfig { max_episode_steps: Some(3), ..EnvConfig::default() };
    let (mut env, _world) = env_with(TickMode::Manual, config)?;
    env.reset()?;
    assert!(!env.step(&[0.0, 0.0])?.truncated);
    assert!(!env.step(&[0.0, 0.0])?.truncated);
    let last = env.step(&[0.0, 0.0])?;
    assert!(last.truncated);
    assert!(!last.done);
    assert_eq!(last.info.step, 3);
    assert_eq!(env.state(), EpisodeState::Terminated);
    Ok(())
}

#[test]
fn spawn_failures_are_reported() -> anyhow::Result<()> {
    let config = EnvConfig { vehicle_filter: "firetruck".into(), ..EnvConfig::default() };
    let (mut env, world) = env_with(TickMode::Manual, config)?;
    assert!(matches!(env.reset(), Err(EnvError::BlueprintNotFound(name)) if name == "firetruck"));
    assert!(world.live_actors().is_empty());

    let no_spawns = HeadlessConfig { spawn_points: Vec::new(), ..headless(TickMode::Manual) };
    let client = HeadlessClient::connect(&ClientConfig::default(), no_spawns)?;
    let mut env = DrivingEnv::new(client.world()?, EnvConfig::default())?;
    assert!(matches!(env.reset(), Err(EnvError::NoSpawnPoints(_))));
    Ok(())
}

#[test]
fn step_before_reset_and_after_close_is_rejected() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    assert!(matches!(env.step(&[0.0, 0.0]), Err(EnvError::NotRunning(EpisodeState::Uninitialized))));

    env.reset()?;
    assert!(matches!(env.step(&[0.0]), Err(EnvError::InvalidAction(_))));
    env.close()?;
    env.close()?;
    assert!(world.live_actors().is_empty());
    assert_eq!(env.state(), EpisodeState::Closed);
    assert!(matches!(env.step(&[0.0, 0.0]), Err(EnvError::NotRunning(EpisodeState::Closed))));
    assert!(matches!(env.reset(), Err(EnvError::NotRunning(EpisodeState::Closed))));
    Ok(())
}

#[test]
fn failed_teardown_leaves_no_running_episode() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    env.reset()?;
    let vehicle = env.vehicle_id().expect("vehicle spawned");
    world.refuse_destroy(vehicle, true);

    assert!(matches!(env.reset(), Err(EnvError::Sim(sim::SimError::DestroyRefused(id))) if id == vehicle));
    assert_eq!(env.state(), EpisodeState::Uninitialized);
    assert_eq!(env.vehicle_id(), None);
    assert!(matches!(env.step(&[0.0, 0.0]), Err(EnvError::NotRunning(EpisodeState::Uninitialized))));
    // The camera went first and is gone; the refused vehicle is left behind.
    assert_eq!(world.live_actors(), vec![vehicle]);
    Ok(())
}

#[test]
fn dropping_the_env_destroys_its_actors() -> anyhow::Result<()> {
    let (mut env, world) = env_with(TickMode::Manual, EnvConfig::default())?;
    env.reset()?;
    assert_eq!(world.live_actors().len(), 2);
    drop(env);
    assert!(world.live_actors().is_empty());
    Ok(())
}

#[test]
fn camera_resolution_is_configurable() -> anyhow::Result<()> {
    let config = EnvConfig { camera_size: Some([64, 48]), ..EnvConfig::default() };
    let (mut env, _world) = env_with(TickMode::OnControl, config)?;
    env.reset()?;
    let step = env.step(&[0.3, 0.0])?;
    assert!(step.info.frame.is_some());
    assert_observation_shape(&step.observation);
    Ok(())
}

#[test]
fn spaces_describe_actions_and_images() -> anyhow::Result<()> {
    let (env, _world) = env_with(TickMode::Manual, EnvConfig::default())?;
    let actions = env.action_space();
    assert_eq!(actions.shape, vec![2]);
    assert_eq!((actions.low, actions.high), (-1.0, 1.0));
    let observations = env.observation_space();
    assert_eq!(observations.shape, vec![84, 84, 3]);
    assert_eq!(observations.dtype, rl::DType::U8);
    Ok(())
}

#[test]
fn learner_drives_the_environment() -> anyhow::Result<()> {
    let config = EnvConfig {
        max_episode_steps: Some(8),
        goal: Some(Vec3::new(200.0, 0.0, 0.5)),
        ..EnvConfig::default()
    };
    let (mut env, world) = env_with(TickMode::OnControl, config)?;
    let params = PpoParams { n_steps: 32, batch_size: 16, ..PpoParams::default() };
    let mut ppo = Ppo::new(params, RandomPolicy::new(env.action_space(), 3))?;

    let report = ppo.learn(&mut env, 32)?;
    assert_eq!(report.timesteps, 32);
    assert!(report.episodes >= 4);
    assert_eq!(world.live_vehicles(), 1);

    Env::close(&mut env)?;
    assert!(world.live_actors().is_empty());
    Ok(())
}
