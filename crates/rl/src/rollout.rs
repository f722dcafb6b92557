//! On-policy rollout storage.
//!
//! Transitions are stored in time order for a single environment. After the
//! rollout is full, [`RolloutBuffer::compute_returns_and_advantage`] fills in
//! GAE(λ) advantages and the matching returns.

use crate::error::RlError;

#[derive(Debug, Clone)]
pub struct Transition<O> {
    pub observation: O,
    pub action: Vec<f32>,
    pub reward: f32,
    /// `observation` is the first of its episode.
    pub episode_start: bool,
    pub value: f32,
    pub log_prob: f32,
}

#[derive(Debug)]
pub struct RolloutBuffer<O> {
    capacity: usize,
    gamma: f32,
    gae_lambda: f32,
    transitions: Vec<Transition<O>>,
    advantages: Vec<f32>,
    returns: Vec<f32>,
}

impl<O> RolloutBuffer<O> {
    #[must_use]
    pub fn new(capacity: usize, gamma: f32, gae_lambda: f32) -> Self {
        Self {
            capacity,
            gamma,
            gae_lambda,
            transitions: Vec::with_capacity(capacity),
            advantages: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// # Errors
    /// Returns [`RlError::BufferFull`] once `capacity` transitions are stored.
    pub fn push(&mut self, transition: Transition<O>) -> Result<(), RlError> {
        if self.is_full() {
            return Err(RlError::BufferFull(self.capacity));
        }
        self.transitions.push(transition);
        Ok(())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.transitions.len() >= self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
        self.advantages.clear();
        self.returns.clear();
    }

    #[must_use]
    pub fn transitions(&self) -> &[Transition<O>] {
        &self.transitions
    }

    /// Empty until [`compute_returns_and_advantage`](Self::compute_returns_and_advantage) runs.
    #[must_use]
    pub fn advantages(&self) -> &[f32] {
        &self.advantages
    }

    #[must_use]
    pub fn returns(&self) -> &[f32] {
        &self.returns
    }

    /// Computes GAE(λ) over the stored transitions.
    ///
    /// `last_value` is the value estimate of the observation that follows the
    /// last stored transition; `last_episode_start` says whether that
    /// observation begins a new episode, in which case it is not bootstrapped.
    pub fn compute_returns_and_advantage(&mut self, last_value: f32, last_episode_start: bool) {
        let n = self.transitions.len();
        self.advantages = vec![0.0; n];
        let mut last_gae = 0.0;
        for t in (0..n).rev() {
            let (next_value, next_non_terminal) = if t + 1 == n {
                (last_value, if last_episode_start { 0.0 } else { 1.0 })
            } else {
                let next = &self.transitions[t + 1];
                (next.value, if next.episode_start { 0.0 } else { 1.0 })
            };
            let current = &self.transitions[t];
            let delta = current.reward + self.gamma * next_value * next_non_terminal - current.value;
            last_gae = delta + self.gamma * self.gae_lambda * next_non_terminal * last_gae;
            self.advantages[t] = last_gae;
        }
        self.returns = self
            .advantages
            .iter()
            .zip(&self.transitions)
            .map(|(adv, tr)| adv + tr.value)
            .collect();
    }

    /// Shuffled index chunks of at most `batch_size` entries covering the buffer.
    pub fn minibatches(&self, batch_size: usize, rng: &mut fastrand::Rng) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.transitions.len()).collect();
        rng.shuffle(&mut indices);
        indices.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect()
    }
}
