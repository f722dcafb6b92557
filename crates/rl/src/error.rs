use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum RlError {
    #[error("invalid hyperparameters: {0}")]
    Config(#[from] ConfigError),
    #[error("environment failure: {0}")]
    Env(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("rollout buffer is full ({0} transitions)")]
    BufferFull(usize),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RlError {
    pub(crate) fn env<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Env(Box::new(err))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
