//! C boundary for the reactor engine bridge.
//!
//! Environments live in a process-wide, generation-checked table and are
//! referred to by [`EnvHandle`]; values are referred to by [`ValueHandle`].
//! Stale, zeroed or foreign handles are reported through [`Status`] or an
//! error buffer. Every export catches Rust panics before they reach the
//! caller.
//!
//! See `include/reactor.h` for the C declarations.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use reactor_core::handles::HandleTable;
use reactor_core::{Environment, Error};

pub mod types;

pub use types::{ByteBuffer, EnvHandle, EvalResult, Status, StringResult, ValueHandle, Version};

static ENVIRONMENTS: Lazy<RwLock<HandleTable<Arc<Environment>>>> =
    Lazy::new(|| RwLock::new(HandleTable::new()));

/// Run `f`, turning a panic into `on_panic()`.
fn guarded<T>(name: &str, on_panic: impl FnOnce() -> T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(export = name, panic = %message, "panic caught at the C boundary");
            on_panic()
        }
    }
}

fn lookup(handle: EnvHandle) -> Option<Arc<Environment>> {
    let key = handle.key()?;
    let table = ENVIRONMENTS.read().unwrap_or_else(PoisonError::into_inner);
    table.get(key).cloned()
}

/// Borrow `len` bytes at `ptr`. A null pointer reads as empty.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads of `len` bytes.
unsafe fn bytes<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    // SAFETY: guaranteed by the caller.
    unsafe { core::slice::from_raw_parts(ptr, len) }
}

/// The "no value" handle and zeroed generations count as stale.
fn resolve_value(handle: ValueHandle) -> Result<reactor_core::ValueHandle, Error> {
    handle.to_core().ok_or(Error::StaleValue)
}

/// Bootstrap the engine. Must be called once before any environment is
/// created; a second call returns `AlreadyInitialized`.
#[unsafe(no_mangle)]
pub extern "C" fn reactor_init() -> Status {
    guarded("reactor_init", || Status::Panic, || reactor_core::init().into())
}

#[unsafe(no_mangle)]
pub extern "C" fn reactor_version() -> Version {
    guarded(
        "reactor_version",
        || Version {
            major: 0,
            minor: 0,
            build: 0,
            patch: 0,
        },
        || reactor_core::version().into(),
    )
}

/// Create an environment and write its handle to `out`.
///
/// # Safety
///
/// `out` must be null or valid for a write of one [`EnvHandle`]. Null
/// returns `InvalidEnvironment` without creating anything.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn reactor_environment_new(out: *mut EnvHandle) -> Status {
    guarded(
        "reactor_environment_new",
        || Status::Panic,
        || {
            if out.is_null() {
                return Status::InvalidEnvironment;
            }
            let env = match Environment::new() {
                Ok(env) => env,
                Err(err) => return Status::from(&err),
            };
            let key = ENVIRONMENTS
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(Arc::new(env));
            // SAFETY: checked non-null above; validity is the caller's contract.
            unsafe { out.write(EnvHandle::from_key(key)) };
            Status::Ok
        },
    )
}

/// Tear down an environment. The handle is invalid afterwards; releasing
/// it again returns `InvalidEnvironment`.
#[unsafe(no_mangle)]
pub extern "C" fn reactor_environment_release(env: EnvHandle) -> Status {
    guarded(
        "reactor_environment_release",
        || Status::Panic,
        || {
            let Some(key) = env.key() else {
                return Status::InvalidEnvironment;
            };
            let removed = ENVIRONMENTS
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key);
            match removed {
                // Other threads may still hold a clone mid-call; `release`
                // waits for them and makes their later calls fail cleanly.
                Some(environment) => environment.release().into(),
                None => Status::InvalidEnvironment,
            }
        },
    )
}

/// Compile and run `code` in `env`.
///
/// # Safety
///
/// `code` and `filename` must each be null or valid for reads of their
/// given lengths. Neither needs to be NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn reactor_eval(
    env: EnvHandle,
    code: *const u8,
    code_len: usize,
    filename: *const u8,
    filename_len: usize,
) -> EvalResult {
    guarded(
        "reactor_eval",
        || EvalResult::error("panic during eval"),
        || {
            let Some(environment) = lookup(env) else {
                return EvalResult::error(Error::ReleasedEnvironment.to_string());
            };
            // SAFETY: forwarded caller contract.
            let code = unsafe { bytes(code, code_len) };
            let filename = String::from_utf8_lossy(unsafe { bytes(filename, filename_len) });
            match environment.eval(code, &filename) {
                Ok(value) => EvalResult::value(ValueHandle::from_core(value)),
                Err(err) => EvalResult::error(err.to_string()),
            }
        },
    )
}

/// The string form of `value`. On success `error` is empty and `string`
/// holds the exact bytes (possibly none).
#[unsafe(no_mangle)]
pub extern "C" fn reactor_value_to_string(env: EnvHandle, value: ValueHandle) -> StringResult {
    let failed = |err: &Error| StringResult {
        string: ByteBuffer::EMPTY,
        error: ByteBuffer::from_error(err),
    };
    guarded(
        "reactor_value_to_string",
        || failed(&Error::Api("panic during string conversion".into())),
        || {
            let Some(environment) = lookup(env) else {
                return failed(&Error::ReleasedEnvironment);
            };
            let result = resolve_value(value).and_then(|v| environment.value_to_string(&v));
            match result {
                Ok(string) => StringResult {
                    string: ByteBuffer::from_vec(string),
                    error: ByteBuffer::EMPTY,
                },
                Err(err) => failed(&err),
            }
        },
    )
}

/// Release `value`. The handle is invalid afterwards.
#[unsafe(no_mangle)]
pub extern "C" fn reactor_value_release(env: EnvHandle, value: ValueHandle) -> Status {
    guarded(
        "reactor_value_release",
        || Status::Panic,
        || {
            let Some(environment) = lookup(env) else {
                return Status::InvalidEnvironment;
            };
            resolve_value(value)
                .and_then(|v| environment.release_value(v))
                .into()
        },
    )
}

/// Free a buffer returned by this library. Freeing an empty buffer is a
/// no-op.
///
/// # Safety
///
/// `buffer` must come from this library and must not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn reactor_buffer_free(buffer: ByteBuffer) {
    guarded(
        "reactor_buffer_free",
        || (),
        || {
            // SAFETY: forwarded caller contract.
            drop(unsafe { buffer.into_vec() });
        },
    )
}
