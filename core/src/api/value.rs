//! Handles to values produced by evaluation.

use crate::handles::Key;

use super::EnvId;

/// A reference to a value living in an environment's engine heap.
///
/// Created by a successful [`super::Environment::eval`]. The handle is only a
/// key: the value itself stays inside the engine instance, and the handle
/// is valid only with the environment that produced it, until it is passed
/// to [`super::Environment::release_value`] or the environment is released.
/// Misuse is detected and reported, never undefined.
///
/// The handle is deliberately not `Clone`: releasing consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "values must be released with Environment::release_value"]
pub struct ValueHandle {
    owner: EnvId,
    key: Key,
}

impl ValueHandle {
    pub(crate) fn new(owner: EnvId, key: Key) -> Self {
        Self { owner, key }
    }

    /// The environment that produced this value.
    pub fn owner(&self) -> EnvId {
        self.owner
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Rebuild a handle from parts previously obtained through
    /// [`ValueHandle::owner`] and [`ValueHandle::key`], e.g. after a trip
    /// through the C boundary. The parts are validated on use.
    pub fn from_parts(owner: EnvId, key: Key) -> Self {
        Self { owner, key }
    }
}
