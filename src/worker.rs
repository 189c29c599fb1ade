//! A single environment loaded with a server script.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Environment, Error, Result};

/// Filename the server script is evaluated under.
pub const SERVER_FILENAME: &str = "server.js";

/// Global function every server script must define.
const RENDER_FUNCTION: &str = "render";

/// A component to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Component name, meaningful to the server script.
    pub name: String,
    pub props: serde_json::Value,
}

/// What the server script's `render` returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
    /// Failure reported by the script itself, as opposed to a thrown error.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Wall time of the request, including (de)serialization.
    #[serde(skip)]
    pub timer: Duration,
}

/// Lowercase hex SHA-256 of `code`, used to tell script versions apart.
pub fn checksum(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// An environment with a server script loaded into it.
///
/// Requests on one worker run one at a time. Once closed, a worker refuses
/// all further requests with [`Error::Closed`].
#[derive(Debug)]
pub struct Worker {
    version: String,
    env: Mutex<Option<Environment>>,
}

impl Worker {
    /// Create an environment and evaluate `code` in it.
    pub fn new(code: &str) -> Result<Self> {
        let env = Environment::new()?;
        // On error `env` is dropped here, which releases it.
        env.eval_release(code, SERVER_FILENAME)?;
        tracing::debug!(env = %env.id(), "worker loaded");
        Ok(Self {
            version: checksum(code),
            env: Mutex::new(Some(env)),
        })
    }

    /// Checksum of the code this worker was created with.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn lock(&self) -> MutexGuard<'_, Option<Environment>> {
        self.env.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Call the script's `render` with `request` as a JSON string.
    pub fn render(&self, request: &Request) -> Result<Response> {
        let started = Instant::now();
        let payload = serde_json::to_string(request).map_err(reactor_core::Error::Json)?;

        let guard = self.lock();
        let env = guard.as_ref().ok_or(Error::Closed)?;
        let value = env.call(RENDER_FUNCTION, &[serde_json::Value::String(payload)])?;
        let text = env.value_to_string(&value);
        env.release_value(value)?;
        drop(guard);

        let mut response: Response = serde_json::from_slice(&text?)?;
        response.timer = started.elapsed();
        Ok(response)
    }

    /// Release the environment. Further calls are no-ops.
    pub fn close(&self) {
        let mut guard = self.lock();
        if let Some(env) = guard.take() {
            if let Err(err) = env.release() {
                tracing::warn!(env = %env.id(), error = %err, "failed to release worker environment");
            }
        }
    }
}
