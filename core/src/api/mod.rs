//! Public API for embedding the script engine.
//!
//! The lifecycle is explicit:
//!
//! 1. [`init`] once per process.
//! 2. [`Environment::new`] for each isolated engine instance.
//! 3. [`Environment::eval`] to run source, producing a [`ValueHandle`] or a
//!    [`ScriptError`](crate::diagnostics::ScriptError) report.
//! 4. [`Environment::value_to_string`] to marshal a value out as bytes.
//! 5. [`Environment::release_value`], then [`Environment::release`].
//!
//! # Example
//!
//! ```no_run
//! use reactor_core::api::{Environment, Error};
//!
//! reactor_core::init_once();
//! let env = Environment::new().unwrap();
//!
//! let value = env.eval("[1, 2, 3].map(n => n * 2)", "double.js").unwrap();
//! assert_eq!(env.value_to_string_lossy(&value).unwrap(), "2,4,6");
//! env.release_value(value).unwrap();
//!
//! match env.eval("throw new Error('boom')", "t.js") {
//!     Err(Error::Script(err)) => assert!(err.report.starts_with("Uncaught exception: Error: boom")),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

pub mod bootstrap;
pub mod environment;
pub mod error;
pub mod options;
pub mod value;

pub use bootstrap::{Version, init, init_once, init_with, is_initialized, version};
pub use environment::{EnvId, Environment};
pub use error::{Error, Result};
pub use options::{EnvironmentOptions, HeapLimits, InitOptions};
pub use value::ValueHandle;
