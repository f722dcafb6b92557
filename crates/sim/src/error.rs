use std::time::Duration;

use thiserror::Error;

use crate::types::ActorId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("failed to connect to simulator at {host}:{port}: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("simulator did not answer within {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn '{blueprint}': {reason}")]
    SpawnFailed { blueprint: String, reason: String },
    #[error("actor {0} has already been destroyed")]
    ActorDestroyed(ActorId),
    #[error("actor {0} is not a {1}")]
    WrongActorKind(ActorId, &'static str),
    #[error("simulator refused to destroy actor {0}")]
    DestroyRefused(ActorId),
    #[error("sensor {0} is already listening")]
    AlreadyListening(ActorId),
    #[error("invalid world setting '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
