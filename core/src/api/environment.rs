//! Isolated execution environments.

use core::fmt;
use core::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Error, EnvironmentOptions, ValueHandle, bootstrap};
use crate::engine::{self, Command, EngineLink};

/// Process-unique identity of an [`Environment`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnvId(NonZeroU64);

impl EnvId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        EnvId(NonZeroU64::new(id).expect("environment id counter overflowed"))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Rebuild an id from [`EnvId::get`]. `0` is never an id.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(EnvId)
    }
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One engine instance plus one execution context.
///
/// The environment is the unit of isolation: nothing is shared between two
/// environments, and they may be driven from different threads at the same
/// time. Calls on the *same* environment serialize on its instance lock; a
/// call blocks until every earlier call has finished.
///
/// Values produced by [`Environment::eval`] must be released with
/// [`Environment::release_value`]; releasing the environment reclaims any
/// that were not.
///
/// # Example
///
/// ```no_run
/// use reactor_core::api::Environment;
///
/// reactor_core::init().unwrap();
/// let env = Environment::new().unwrap();
/// let value = env.eval("1 + 1", "t.js").unwrap();
/// assert_eq!(env.value_to_string(&value).unwrap(), b"2");
/// env.release_value(value).unwrap();
/// env.release().unwrap();
/// ```
pub struct Environment {
    id: EnvId,
    link: Mutex<Option<EngineLink>>,
}

impl Environment {
    /// Create an environment with default options.
    pub fn new() -> Result<Self, Error> {
        Self::with_options(EnvironmentOptions::default())
    }

    pub fn with_options(options: EnvironmentOptions) -> Result<Self, Error> {
        if !bootstrap::is_initialized() {
            return Err(Error::NotInitialized);
        }
        options.validate()?;

        let id = EnvId::next();
        let link = engine::spawn(id, options)?;
        tracing::debug!(env = %id, "environment created");

        Ok(Self {
            id,
            link: Mutex::new(Some(link)),
        })
    }

    pub fn id(&self) -> EnvId {
        self.id
    }

    /// Take the instance lock. Callers on other threads block here until
    /// the current holder's request has been answered.
    fn lock(&self) -> MutexGuard<'_, Option<EngineLink>> {
        // A panic while holding the lock cannot leave the link half-updated.
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_link<T>(&self, f: impl FnOnce(&EngineLink) -> Result<T, Error>) -> Result<T, Error> {
        let guard = self.lock();
        match guard.as_ref() {
            Some(link) => f(link),
            None => Err(Error::ReleasedEnvironment),
        }
    }

    fn check_owner(&self, value: &ValueHandle) -> Result<(), Error> {
        if value.owner() == self.id {
            Ok(())
        } else {
            tracing::warn!(owner = %value.owner(), used = %self.id, "foreign value handle");
            Err(Error::ForeignValue {
                owner: value.owner(),
                used: self.id,
            })
        }
    }

    /// Compile and run `code`, tagged with `filename` for diagnostics.
    ///
    /// On success the result stays in the engine and a handle to it is
    /// returned. A compile error, a thrown value or an engine abort comes
    /// back as [`Error::Script`]; effects of a script that threw partway
    /// are not rolled back.
    pub fn eval(&self, code: impl AsRef<[u8]>, filename: &str) -> Result<ValueHandle, Error> {
        let code = code.as_ref().to_vec();
        tracing::trace!(env = %self.id, filename, bytes = code.len(), "eval");
        let key = self.with_link(|link| {
            link.request(|reply| Command::Eval {
                code,
                filename: filename.to_string(),
                reply,
            })?
            .map_err(Error::Script)
        })?;
        Ok(ValueHandle::new(self.id, key))
    }

    /// Evaluate `code` and drop the result, keeping only the error.
    pub fn eval_release(&self, code: impl AsRef<[u8]>, filename: &str) -> Result<(), Error> {
        let value = self.eval(code, filename)?;
        self.release_value(value)
    }

    /// Call the global function `name` with JSON-encoded `args`.
    pub fn call(&self, name: &str, args: &[serde_json::Value]) -> Result<ValueHandle, Error> {
        let args = args
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        let code = format!("{}({})", name, args.join(","));
        self.eval(code, "")
    }

    /// The engine's string form of `value`, as caller-owned bytes.
    ///
    /// The length is exact; embedded zero bytes are preserved. Coercion may
    /// run script code (a custom `toString`), so it can fail with
    /// [`Error::Script`].
    pub fn value_to_string(&self, value: &ValueHandle) -> Result<Vec<u8>, Error> {
        self.check_owner(value)?;
        let key = value.key();
        self.with_link(|link| link.request(|reply| Command::Stringify { key, reply })?)
    }

    /// Like [`Environment::value_to_string`], replacing invalid UTF-8.
    pub fn value_to_string_lossy(&self, value: &ValueHandle) -> Result<String, Error> {
        let bytes = self.value_to_string(value)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Free `value`'s engine-side reference.
    pub fn release_value(&self, value: ValueHandle) -> Result<(), Error> {
        self.check_owner(&value)?;
        let key = value.key();
        self.with_link(|link| link.request(|reply| Command::ReleaseValue { key, reply })?)
    }

    /// Number of values produced and not yet released.
    pub fn live_values(&self) -> Result<usize, Error> {
        self.with_link(|link| link.request(|reply| Command::LiveValues { reply }))
    }

    pub fn is_released(&self) -> bool {
        self.lock().is_none()
    }

    /// Tear down the execution context and the engine instance.
    ///
    /// Blocks until any in-flight call on this environment has finished.
    /// Releasing twice is a no-op.
    pub fn release(&self) -> Result<(), Error> {
        let mut guard = self.lock();
        let Some(link) = guard.take() else {
            return Ok(());
        };
        let result = link.shutdown();
        drop(guard);
        tracing::debug!(env = %self.id, "environment released");
        result
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Environment")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(env = %self.id, error = %err, "failed to release environment");
        }
    }
}
