//! # Training and Evaluation Drivers
//!
//! [`train`] mirrors the classic script: connect to the simulator, build the
//! environment, build the learner, learn for the configured number of steps,
//! save the final model and close the environment. [`evaluate`] runs the
//! baseline policy for a few episodes and reports their returns.

use std::path::PathBuf;

use anyhow::{Context, Result};
use driving::DrivingEnv;
use rl::{Env, Policy, Ppo, RandomPolicy, ScalarLogger, TrainingReport};
use serde::Serialize;
use sim::{Client, HeadlessClient};
use tracing::{info, warn};

use crate::settings::Settings;

const LOG_PREFIX: &str = "PPO";

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub report: TrainingReport,
    pub checkpoint: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: usize,
    pub total_reward: f32,
    pub collided: bool,
}

fn connect(settings: &Settings) -> Result<(HeadlessClient, DrivingEnv)> {
    let client = HeadlessClient::connect(&settings.client, settings.simulator.clone())
        .with_context(|| format!("connecting to {}:{}", settings.client.host, settings.client.port))?;
    info!(version = %client.server_version()?, "Simulator session ready");
    let env = DrivingEnv::connect(&client, settings.env.clone()).context("creating driving environment")?;
    Ok((client, env))
}

/// Trains on the simulator and saves `<model_dir>/<run_name>_final.json`.
///
/// The environment is closed whether or not training succeeds.
///
/// # Errors
/// Returns any configuration, simulator, training or filesystem failure.
pub fn train(settings: &Settings) -> Result<TrainOutcome> {
    settings.validate()?;
    let (_client, mut env) = connect(settings)?;

    let outcome = learn_and_save(settings, &mut env);
    match (&outcome, env.close()) {
        (_, Ok(())) => {}
        (Ok(_), Err(e)) => return Err(e).context("closing environment"),
        (Err(_), Err(e)) => warn!("Failed to close environment after training error: {e}"),
    }
    outcome
}

fn learn_and_save(settings: &Settings, env: &mut DrivingEnv) -> Result<TrainOutcome> {
    let policy = RandomPolicy::new(env.action_space(), settings.training.seed);
    let logger = ScalarLogger::create(&settings.paths.log_dir, LOG_PREFIX)?;
    let log_dir = logger.run_dir().to_path_buf();
    let mut model = Ppo::new(settings.model.clone(), policy)?.with_logger(logger);

    info!(
        total_timesteps = settings.training.total_timesteps,
        log_dir = %log_dir.display(),
        "Training"
    );
    let report = model.learn(env, settings.training.total_timesteps).context("training")?;
    let checkpoint = model.save(&settings.final_model_path()).context("saving final model")?;
    Ok(TrainOutcome { report, checkpoint, log_dir })
}

/// Runs `episodes` episodes with the baseline policy. Episodes that neither
/// collide nor truncate are cut after `max_steps`.
///
/// # Errors
/// Returns any configuration or simulator failure.
pub fn evaluate(settings: &Settings, episodes: usize, max_steps: usize) -> Result<Vec<EpisodeSummary>> {
    settings.validate()?;
    let (_client, mut env) = connect(settings)?;
    let mut policy = RandomPolicy::new(env.action_space(), settings.training.seed);

    let mut summaries = Vec::with_capacity(episodes);
    for episode in 1..=episodes {
        let mut observation = env.reset()?;
        let mut summary = EpisodeSummary { episode, steps: 0, total_reward: 0.0, collided: false };
        while summary.steps < max_steps {
            let action = policy.act(&observation).action;
            let step = env.step(&action)?;
            summary.steps += 1;
            summary.total_reward += step.reward;
            summary.collided = step.done;
            let last = step.is_last();
            observation = step.observation;
            if last {
                break;
            }
        }
        info!(
            episode,
            steps = summary.steps,
            reward = summary.total_reward,
            collided = summary.collided,
            "Evaluation episode finished"
        );
        summaries.push(summary);
    }
    env.close()?;
    Ok(summaries)
}
