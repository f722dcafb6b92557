//! PPO hyperparameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be > 0, got {value}")]
    InvalidCount { field: &'static str, value: usize },
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },
    #[error("batch_size ({batch_size}) must not exceed n_steps ({n_steps})")]
    BatchLargerThanRollout { batch_size: usize, n_steps: usize },
}

/// Hyperparameters handed to the training loop. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PpoParams {
    pub learning_rate: f64,
    /// Discount factor.
    pub gamma: f32,
    /// Generalized Advantage Estimation smoothing.
    pub gae_lambda: f32,
    /// Entropy bonus weight.
    pub ent_coef: f32,
    /// Value loss weight.
    pub vf_coef: f32,
    /// Minibatch size for the policy update.
    pub batch_size: usize,
    /// Environment steps per rollout.
    pub n_steps: usize,
}

impl Default for PpoParams {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            gamma: 0.99,
            gae_lambda: 0.95,
            ent_coef: 0.01,
            vf_coef: 0.5,
            batch_size: 64,
            n_steps: 2048,
        }
    }
}

impl PpoParams {
    /// # Errors
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("learning_rate", self.learning_rate, f64::MIN_POSITIVE, 1.0)?;
        check_range("gamma", f64::from(self.gamma), 0.0, 1.0)?;
        check_range("gae_lambda", f64::from(self.gae_lambda), 0.0, 1.0)?;
        check_range("ent_coef", f64::from(self.ent_coef), 0.0, f64::from(f32::MAX))?;
        check_range("vf_coef", f64::from(self.vf_coef), 0.0, f64::from(f32::MAX))?;
        if self.n_steps == 0 {
            return Err(ConfigError::InvalidCount { field: "n_steps", value: self.n_steps });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidCount { field: "batch_size", value: self.batch_size });
        }
        if self.batch_size > self.n_steps {
            return Err(ConfigError::BatchLargerThanRollout {
                batch_size: self.batch_size,
                n_steps: self.n_steps,
            });
        }
        if self.n_steps % self.batch_size != 0 {
            warn!(
                n_steps = self.n_steps,
                batch_size = self.batch_size,
                "n_steps is not a multiple of batch_size, the last minibatch will be truncated"
            );
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}
