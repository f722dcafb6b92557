//! Policy seam of the training loop.
//!
//! A [`Policy`] proposes actions with their value and log-probability
//! estimates and consumes finished rollouts in [`Policy::update`]. The
//! gradient step of a real PPO implementation lives behind that method.

use serde::Serialize;
use serde_json::json;

use crate::config::PpoParams;
use crate::error::RlError;
use crate::rollout::RolloutBuffer;
use crate::spaces::BoxSpace;

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutput {
    pub action: Vec<f32>,
    pub value: f32,
    pub log_prob: f32,
}

/// Diagnostics reported by one policy update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateStats {
    pub minibatches: usize,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub explained_variance: f32,
}

/// Name and serialisable state, used for checkpoints.
pub trait PolicySnapshot {
    fn name(&self) -> &str;

    fn state(&self) -> serde_json::Value;
}

pub trait Policy<O>: PolicySnapshot {
    fn act(&mut self, observation: &O) -> PolicyOutput;

    fn value(&mut self, observation: &O) -> f32;

    /// Consumes a rollout whose advantages and returns are computed.
    ///
    /// # Errors
    /// Implementation specific.
    fn update(&mut self, rollout: &RolloutBuffer<O>, params: &PpoParams) -> Result<UpdateStats, RlError>;
}

/// Uniform policy over the action space with a constant zero value estimate.
pub struct RandomPolicy {
    space: BoxSpace,
    seed: u64,
    rng: fastrand::Rng,
}

impl RandomPolicy {
    #[must_use]
    pub fn new(space: BoxSpace, seed: u64) -> Self {
        Self { space, seed, rng: fastrand::Rng::with_seed(seed) }
    }
}

impl PolicySnapshot for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn state(&self) -> serde_json::Value {
        json!({ "action_space": self.space, "seed": self.seed })
    }
}

impl<O> Policy<O> for RandomPolicy {
    fn act(&mut self, _observation: &O) -> PolicyOutput {
        PolicyOutput {
            action: self.space.sample(&mut self.rng),
            value: 0.0,
            log_prob: self.space.uniform_log_prob(),
        }
    }

    fn value(&mut self, _observation: &O) -> f32 {
        0.0
    }

    fn update(&mut self, rollout: &RolloutBuffer<O>, params: &PpoParams) -> Result<UpdateStats, RlError> {
        let advantages = rollout.advantages();
        let returns = rollout.returns();
        let values: Vec<f32> = rollout.transitions().iter().map(|t| t.value).collect();

        // The policy never changes, so the probability ratio is 1 and the
        // clipped surrogate reduces to the mean advantage.
        let batches = rollout.minibatches(params.batch_size, &mut self.rng);
        let mut policy_loss = 0.0;
        let mut value_loss = 0.0;
        for batch in &batches {
            let n = batch.len() as f32;
            policy_loss -= batch.iter().map(|&i| advantages[i]).sum::<f32>() / n;
            value_loss += batch.iter().map(|&i| (returns[i] - values[i]).powi(2)).sum::<f32>() / n;
        }
        let count = batches.len().max(1) as f32;

        Ok(UpdateStats {
            minibatches: batches.len(),
            policy_loss: policy_loss / count,
            value_loss: value_loss / count,
            entropy: -self.space.uniform_log_prob(),
            explained_variance: explained_variance(&values, returns),
        })
    }
}

/// `1 - Var(returns - values) / Var(returns)`; 0 when returns are constant.
#[must_use]
pub fn explained_variance(values: &[f32], returns: &[f32]) -> f32 {
    let var_returns = variance(returns);
    if var_returns <= f32::EPSILON {
        return 0.0;
    }
    let residuals: Vec<f32> = returns.iter().zip(values).map(|(r, v)| r - v).collect();
    1.0 - variance(&residuals) / var_returns
}

fn variance(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    let n = xs.len() as f32;
    let mean = xs.iter().sum::<f32>() / n;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::Transition;
    use crate::spaces::DType;

    #[test]
    fn random_policy_is_reproducible() {
        let space = BoxSpace::new(-1.0, 1.0, &[2], DType::F32);
        let mut a = RandomPolicy::new(space.clone(), 11);
        let mut b = RandomPolicy::new(space, 11);
        for _ in 0..5 {
            let x = Policy::<()>::act(&mut a, &());
            let y = Policy::<()>::act(&mut b, &());
            assert_eq!(x, y);
            assert!((x.log_prob + 2.0 * 2f32.ln()).abs() < 1e-6);
        }
    }

    #[test]
    fn update_reports_value_error() {
        let space = BoxSpace::new(-1.0, 1.0, &[1], DType::F32);
        let mut policy = RandomPolicy::new(space, 0);
        let mut rollout = RolloutBuffer::new(4, 1.0, 1.0);
        for _ in 0..4 {
            rollout
                .push(Transition {
                    observation: (),
                    action: vec![0.0],
                    reward: 1.0,
                    episode_start: false,
                    value: 0.0,
                    log_prob: 0.0,
                })
                .unwrap();
        }
        rollout.compute_returns_and_advantage(0.0, true);
        let params = PpoParams { batch_size: 2, n_steps: 4, ..PpoParams::default() };
        let stats = policy.update(&rollout, &params).unwrap();
        assert_eq!(stats.minibatches, 2);
        // returns are 4, 3, 2, 1
        assert!((stats.value_loss - 7.5).abs() < 1e-5);
        assert!((stats.policy_loss + 2.5).abs() < 1e-5);
    }

    #[test]
    fn explained_variance_bounds() {
        assert!((explained_variance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert_eq!(explained_variance(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
