//! Public error type for the reactor API.
//!
//! Script faults and contract violations both surface here as plain data.
//! Nothing raised inside the engine propagates as a panic; it is captured
//! where it happens and converted at the API boundary.

use std::io;

use super::EnvId;
use crate::diagnostics::ScriptError;

/// Public error type for all reactor operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bootstrap was requested a second time.
    #[error("engine already initialized")]
    AlreadyInitialized,

    /// An environment was requested before bootstrap.
    #[error("engine not initialized; call reactor_core::init first")]
    NotInitialized,

    /// The environment was released; it and its values are unusable.
    #[error("released environment")]
    ReleasedEnvironment,

    /// The value handle was already released (or reclaimed).
    #[error("stale value handle")]
    StaleValue,

    /// A value handle was passed to an environment that did not create it.
    #[error("value belongs to environment {owner}, not {used}")]
    ForeignValue { owner: EnvId, used: EnvId },

    /// Compilation, execution or string coercion threw.
    ///
    /// Displays as the formatted exception report.
    #[error("{0}")]
    Script(#[from] ScriptError),

    /// The engine thread could not be started.
    #[error("failed to start engine thread: {0}")]
    Spawn(#[source] io::Error),

    /// The engine thread exited while a request was outstanding.
    #[error("engine thread exited unexpectedly")]
    EngineGone,

    /// Invalid API usage (e.g. contradictory options).
    #[error("API error: {0}")]
    Api(String),

    /// A call argument could not be encoded.
    #[error("can't encode argument: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The script fault behind this error, if it is one.
    pub fn as_script(&self) -> Option<&ScriptError> {
        match self {
            Error::Script(err) => Some(err),
            _ => None,
        }
    }

    /// True for errors caused by breaking the handle lifecycle contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::NotInitialized
                | Error::AlreadyInitialized
                | Error::ReleasedEnvironment
                | Error::StaleValue
                | Error::ForeignValue { .. }
        )
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
