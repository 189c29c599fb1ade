//! Configuration for bootstrap and environments.

use super::Error;

/// Process-wide engine options, applied once by [`super::init_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Worker threads for the engine platform. `0` lets the engine pick.
    pub thread_pool_size: u32,
    /// Engine command-line flags (e.g. `"--harmony --stack-size=2000"`),
    /// applied before initialization.
    pub flags: Option<String>,
}

/// Heap bounds for one engine instance, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapLimits {
    pub initial_bytes: usize,
    pub max_bytes: usize,
}

/// Per-environment options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOptions {
    /// Heap limits for the engine instance; engine defaults when `None`.
    pub heap_limits: Option<HeapLimits>,
    /// Capture stack traces for uncaught exceptions, keeping at most this
    /// many frames. Thrown `Error` objects carry a stack either way.
    pub stack_trace_limit: Option<u32>,
    /// Stack size of the environment's engine thread.
    pub thread_stack_size: Option<usize>,
}

impl EnvironmentOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(limits) = self.heap_limits {
            if limits.initial_bytes > limits.max_bytes {
                return Err(Error::Api(format!(
                    "initial heap size ({}) cannot exceed max heap size ({})",
                    limits.initial_bytes, limits.max_bytes
                )));
            }
        }
        if self.thread_stack_size == Some(0) {
            return Err(Error::Api("thread stack size must be non-zero".into()));
        }
        Ok(())
    }
}
