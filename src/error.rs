//! Errors for the render pool.

/// Errors raised by [`crate::Worker`] and [`crate::Pool`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine or the server script failed.
    #[error(transparent)]
    Core(#[from] reactor_core::Error),

    /// The worker was closed before or during the request.
    #[error("worker closed")]
    Closed,

    /// `render` returned something that is not a response object.
    #[error("can't decode render response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// The script fault behind this error, if it is one.
    pub fn as_script(&self) -> Option<&reactor_core::ScriptError> {
        match self {
            Error::Core(err) => err.as_script(),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
