use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, CHECKPOINT_VERSION};
use crate::config::PpoParams;
use crate::env::Env;
use crate::error::RlError;
use crate::logger::ScalarLogger;
use crate::policy::{Policy, PolicySnapshot, UpdateStats};
use crate::rollout::{RolloutBuffer, Transition};

/// Episodes kept for the running reward/length means.
const EPISODE_WINDOW: usize = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub timesteps: usize,
    pub iterations: usize,
    pub episodes: usize,
    pub mean_episode_reward: Option<f32>,
    pub mean_episode_length: Option<f32>,
    pub last_update: Option<UpdateStats>,
}

/// On-policy PPO outer loop.
///
/// Collects `n_steps` transitions per iteration, computes GAE(λ) advantages,
/// and delegates the parameter update to the policy. Episodes that end by
/// truncation are bootstrapped with the value of their final observation.
pub struct Ppo<P> {
    params: PpoParams,
    policy: P,
    logger: Option<ScalarLogger>,
    num_timesteps: usize,
    iterations: usize,
    episodes: usize,
    episode_rewards: VecDeque<f32>,
    episode_lengths: VecDeque<usize>,
}

impl<P> Ppo<P> {
    /// # Errors
    /// Returns [`RlError::Config`] if the hyperparameters are invalid.
    pub fn new(params: PpoParams, policy: P) -> Result<Self, RlError> {
        params.validate()?;
        Ok(Self {
            params,
            policy,
            logger: None,
            num_timesteps: 0,
            iterations: 0,
            episodes: 0,
            episode_rewards: VecDeque::with_capacity(EPISODE_WINDOW),
            episode_lengths: VecDeque::with_capacity(EPISODE_WINDOW),
        })
    }

    #[must_use]
    pub fn with_logger(mut self, logger: ScalarLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn params(&self) -> &PpoParams {
        &self.params
    }

    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[must_use]
    pub fn num_timesteps(&self) -> usize {
        self.num_timesteps
    }

    /// Trains for at least `total_timesteps` more environment steps, rounded
    /// up to whole rollouts.
    ///
    /// # Errors
    /// Propagates environment failures as [`RlError::Env`], and policy or
    /// logging failures unchanged.
    pub fn learn<E>(&mut self, env: &mut E, total_timesteps: usize) -> Result<TrainingReport, RlError>
    where
        E: Env,
        P: Policy<E::Observation>,
    {
        let target = self.num_timesteps + total_timesteps;
        let mut buffer = RolloutBuffer::new(self.params.n_steps, self.params.gamma, self.params.gae_lambda);
        let mut observation = env.reset().map_err(RlError::env)?;
        let mut episode_start = true;
        let mut episode_reward = 0.0_f32;
        let mut episode_length = 0_usize;
        let mut last_update = None;

        info!(
            total_timesteps,
            n_steps = self.params.n_steps,
            batch_size = self.params.batch_size,
            "Starting training"
        );

        while self.num_timesteps < target {
            buffer.clear();
            while !buffer.is_full() {
                let output = self.policy.act(&observation);
                let step = env.step(&output.action).map_err(RlError::env)?;
                self.num_timesteps += 1;
                episode_reward += step.reward;
                episode_length += 1;

                let mut reward = step.reward;
                if step.truncated && !step.done {
                    reward += self.params.gamma * self.policy.value(&step.observation);
                }
                let ended = step.is_last();
                buffer.push(Transition {
                    observation,
                    action: output.action,
                    reward,
                    episode_start,
                    value: output.value,
                    log_prob: output.log_prob,
                })?;

                if ended {
                    debug!(reward = episode_reward, length = episode_length, info = ?step.info, "episode finished");
                    self.finish_episode(episode_reward, episode_length)?;
                    episode_reward = 0.0;
                    episode_length = 0;
                    observation = env.reset().map_err(RlError::env)?;
                    episode_start = true;
                } else {
                    observation = step.observation;
                    episode_start = false;
                }
            }

            let last_value = self.policy.value(&observation);
            buffer.compute_returns_and_advantage(last_value, episode_start);
            let stats = self.policy.update(&buffer, &self.params)?;
            self.iterations += 1;
            self.log_iteration(&stats)?;
            last_update = Some(stats);
        }

        if let Some(logger) = self.logger.as_mut() {
            logger.flush()?;
        }
        let report = TrainingReport {
            timesteps: self.num_timesteps,
            iterations: self.iterations,
            episodes: self.episodes,
            mean_episode_reward: mean(self.episode_rewards.iter().copied()),
            mean_episode_length: mean(self.episode_lengths.iter().map(|&l| l as f32)),
            last_update,
        };
        info!(
            timesteps = report.timesteps,
            episodes = report.episodes,
            mean_reward = ?report.mean_episode_reward,
            "Training finished"
        );
        Ok(report)
    }

    /// Saves hyperparameters, progress and policy state.
    ///
    /// # Errors
    /// Returns [`RlError`] on serialisation or filesystem failure.
    pub fn save(&self, path: &Path) -> Result<PathBuf, RlError>
    where
        P: PolicySnapshot,
    {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            algorithm: "PPO".to_owned(),
            policy: self.policy.name().to_owned(),
            num_timesteps: self.num_timesteps,
            params: self.params.clone(),
            policy_state: self.policy.state(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        }
        .save(path)
    }

    fn finish_episode(&mut self, reward: f32, length: usize) -> Result<(), RlError> {
        self.episodes += 1;
        if self.episode_rewards.len() == EPISODE_WINDOW {
            self.episode_rewards.pop_front();
            self.episode_lengths.pop_front();
        }
        self.episode_rewards.push_back(reward);
        self.episode_lengths.push_back(length);
        if let Some(logger) = self.logger.as_mut() {
            logger.record("episode/reward", self.num_timesteps, f64::from(reward))?;
            logger.record("episode/length", self.num_timesteps, length as f64)?;
        }
        Ok(())
    }

    fn log_iteration(&mut self, stats: &UpdateStats) -> Result<(), RlError> {
        let ep_rew_mean = mean(self.episode_rewards.iter().copied());
        info!(
            iteration = self.iterations,
            timesteps = self.num_timesteps,
            episodes = self.episodes,
            ep_rew_mean = ?ep_rew_mean,
            value_loss = stats.value_loss,
            explained_variance = stats.explained_variance,
            "Rollout complete"
        );
        let Some(logger) = self.logger.as_mut() else {
            return Ok(());
        };
        let step = self.num_timesteps;
        if let Some(value) = ep_rew_mean {
            logger.record("rollout/ep_rew_mean", step, f64::from(value))?;
        }
        if let Some(value) = mean(self.episode_lengths.iter().map(|&l| l as f32)) {
            logger.record("rollout/ep_len_mean", step, f64::from(value))?;
        }
        logger.record("train/policy_loss", step, f64::from(stats.policy_loss))?;
        logger.record("train/value_loss", step, f64::from(stats.value_loss))?;
        logger.record("train/entropy", step, f64::from(stats.entropy))?;
        logger.record("train/explained_variance", step, f64::from(stats.explained_variance))?;
        logger.record("train/learning_rate", step, self.params.learning_rate)?;
        logger.flush()
    }
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, count) = values.fold((0.0_f32, 0_usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f32)
}
