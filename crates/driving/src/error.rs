use std::time::Duration;

use sim::SimError;
use thiserror::Error;

use crate::env::EpisodeState;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("no blueprint matches '{0}'")]
    BlueprintNotFound(String),
    #[error("map '{0}' has no spawn points")]
    NoSpawnPoints(String),
    #[error("no camera frame arrived within {0:?}")]
    FrameTimeout(Duration),
    #[error("environment is not running (state: {0})")]
    NotRunning(EpisodeState),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("cannot decode frame {frame}: {reason}")]
    Decode { frame: u64, reason: String },
    #[error("invalid environment config: {field} {reason}")]
    Config { field: &'static str, reason: String },
}
