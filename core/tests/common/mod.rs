//! Shared helpers for reactor-core integration tests.

#![allow(dead_code)]

use reactor_core::{Environment, Error, ScriptError};

/// Bring up the engine (once per test binary) and test logging.
pub fn setup() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
    reactor_core::init_once();
}

pub fn new_env() -> Environment {
    setup();
    Environment::new().expect("environment should be created")
}

/// Evaluate `code` and return the string form of its result, releasing the value.
pub fn eval_string(env: &Environment, code: &str) -> String {
    let value = env.eval(code, "t.js").expect("eval should succeed");
    let text = env.value_to_string_lossy(&value).expect("stringify should succeed");
    env.release_value(value).expect("release should succeed");
    text
}

/// Evaluate `code`, expecting a script error.
pub fn eval_error(env: &Environment, code: &str) -> ScriptError {
    match env.eval(code, "t.js") {
        Err(Error::Script(err)) => err,
        Err(other) => panic!("expected a script error, got {other:?}"),
        Ok(value) => {
            let text = env.value_to_string_lossy(&value).unwrap_or_default();
            panic!("expected a script error, got value {text:?}")
        }
    }
}
