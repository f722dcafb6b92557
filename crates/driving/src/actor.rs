use std::fmt;

use sim::{Actor, ActorId, SimError};
use tracing::{debug, warn};

use crate::error::EnvError;

/// Owned simulator actor, destroyed when dropped.
///
/// `destroy` is idempotent: the first call removes the actor from the
/// simulation, later calls do nothing. An actor the simulator already removed
/// counts as destroyed.
pub struct OwnedActor<A: ?Sized + Actor> {
    id: ActorId,
    inner: Option<Box<A>>,
}

impl<A: ?Sized + Actor> OwnedActor<A> {
    #[must_use]
    pub fn new(actor: Box<A>) -> Self {
        Self { id: actor.id(), inner: Some(actor) }
    }

    #[must_use]
    pub fn id(&self) -> ActorId {
        self.id
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_none()
    }

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] after [`destroy`](Self::destroy).
    pub fn get(&self) -> Result<&A, EnvError> {
        self.inner.as_deref().ok_or_else(|| EnvError::from(SimError::ActorDestroyed(self.id)))
    }

    /// # Errors
    /// Returns [`SimError::ActorDestroyed`] after [`destroy`](Self::destroy).
    pub fn get_mut(&mut self) -> Result<&mut A, EnvError> {
        self.inner.as_deref_mut().ok_or_else(|| EnvError::from(SimError::ActorDestroyed(self.id)))
    }

    /// # Errors
    /// Returns the simulator error if a live actor could not be destroyed.
    pub fn destroy(&mut self) -> Result<(), EnvError> {
        let Some(mut actor) = self.inner.take() else {
            return Ok(());
        };
        if !actor.is_alive() {
            debug!(actor = %self.id, "actor already removed by the simulator");
            return Ok(());
        }
        actor.destroy()?;
        debug!(actor = %self.id, kind = actor.type_name(), "actor destroyed");
        Ok(())
    }
}

impl<A: ?Sized + Actor> Drop for OwnedActor<A> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!(actor = %self.id, "Failed to destroy actor on drop: {e}");
        }
    }
}

impl<A: ?Sized + Actor> fmt::Debug for OwnedActor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedActor")
            .field("id", &self.id)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
