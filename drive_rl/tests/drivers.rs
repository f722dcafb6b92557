use std::fs;

use drive_rl::app;
use drive_rl::settings::{Paths, Settings};
use rl::Checkpoint;

fn small_settings(root: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.model.n_steps = 16;
    settings.model.batch_size = 8;
    settings.env.max_episode_steps = Some(6);
    settings.training.total_timesteps = 16;
    settings.training.run_name = "smoke".into();
    settings.paths = Paths { model_dir: root.join("models"), log_dir: root.join("logs") };
    settings
}

#[test]
fn train_saves_final_model_and_scalars() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = small_settings(dir.path());

    let outcome = app::train(&settings)?;

    assert_eq!(outcome.report.timesteps, 16);
    assert_eq!(outcome.checkpoint, dir.path().join("models/smoke_final.json"));
    assert_eq!(outcome.log_dir, dir.path().join("logs/PPO_1"));
    let checkpoint = Checkpoint::load(&outcome.checkpoint)?;
    assert_eq!(checkpoint.num_timesteps, 16);
    assert_eq!(checkpoint.params, settings.model);
    let scalars = fs::read_to_string(outcome.log_dir.join("scalars.jsonl"))?;
    assert!(scalars.lines().count() > 0);

    // A second run logs to a fresh directory.
    let again = app::train(&settings)?;
    assert_eq!(again.log_dir, dir.path().join("logs/PPO_2"));
    Ok(())
}

#[test]
fn train_rejects_invalid_settings_before_connecting() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut settings = small_settings(dir.path());
    settings.model.batch_size = 64;
    assert!(app::train(&settings).is_err());
    assert!(!dir.path().join("logs").exists());
    Ok(())
}

#[test]
fn connection_failures_surface() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut settings = small_settings(dir.path());
    settings.client.host = String::new();
    let err = app::train(&settings).unwrap_err();
    assert!(format!("{err:#}").contains("connecting to :2000"));
    Ok(())
}

#[test]
fn evaluate_reports_every_episode() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = small_settings(dir.path());
    let summaries = app::evaluate(&settings, 3, 100)?;
    assert_eq!(summaries.len(), 3);
    for (i, summary) in summaries.iter().enumerate() {
        assert_eq!(summary.episode, i + 1);
        assert!(summary.steps >= 1 && summary.steps <= 6);
        assert!(summary.total_reward.is_finite());
    }
    Ok(())
}

#[test]
fn settings_file_is_merged_over_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{
            "model": { "n_steps": 512, "batch_size": 32 },
            "env": { "target_speed": 15.0, "frame_policy": { "kind": "block", "timeout_ms": 500 } },
            "training": { "total_timesteps": 2048 }
        }"#,
    )?;
    let settings = Settings::load(&path)?;
    assert_eq!(settings.model.n_steps, 512);
    assert!((settings.model.gamma - 0.99).abs() < f32::EPSILON);
    assert_eq!(settings.env.params.target_speed, 15.0);
    assert_eq!(settings.env.vehicle_filter, "model3");
    assert_eq!(settings.training.total_timesteps, 2048);
    assert_eq!(settings.training.run_name, "carla_ppo");
    settings.validate()?;

    assert!(Settings::load(&dir.path().join("missing.json")).is_err());
    Ok(())
}
