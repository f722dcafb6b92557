use std::fmt;

use crate::spaces::BoxSpace;

/// Result of advancing an environment by one action.
#[derive(Debug, Clone)]
pub struct Step<O, I> {
    pub observation: O,
    pub reward: f32,
    /// The episode reached a terminal state.
    pub done: bool,
    /// The episode was cut short (time limit) without reaching a terminal state.
    pub truncated: bool,
    pub info: I,
}

impl<O, I> Step<O, I> {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.done || self.truncated
    }
}

/// Reinforcement learning environment contract.
///
/// Modelled on the classic Gym interface: [`reset`] starts an episode and
/// returns the first observation, [`step`] applies one action and reports the
/// new observation, reward and termination flags, and [`close`] releases any
/// resources the environment holds. The spaces describe valid actions and
/// observations.
///
/// [`reset`]: Env::reset
/// [`step`]: Env::step
/// [`close`]: Env::close
pub trait Env {
    type Observation: Clone;
    type Info: fmt::Debug;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Starts a new episode and returns its first observation.
    ///
    /// # Errors
    /// Environment specific.
    fn reset(&mut self) -> Result<Self::Observation, Self::Error>;

    /// Advances the environment by one action.
    ///
    /// # Errors
    /// Environment specific.
    fn step(&mut self, action: &[f32]) -> Result<Step<Self::Observation, Self::Info>, Self::Error>;

    /// Releases resources. Calling it twice is allowed.
    ///
    /// # Errors
    /// Environment specific.
    fn close(&mut self) -> Result<(), Self::Error>;

    fn action_space(&self) -> BoxSpace;

    fn observation_space(&self) -> BoxSpace;
}
