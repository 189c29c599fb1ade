//! Embedded script engine core.
//!
//! Owns the lifecycle and concurrency rules around engine instances,
//! execution contexts and value handles, and converts engine state
//! (values, thrown exceptions, source locations) into plain data. See
//! [`api`] for the entry points.

pub mod api;
pub mod diagnostics;
pub mod handles;

mod engine;
mod marshal;

pub use api::{
    EnvId, Environment, EnvironmentOptions, Error, HeapLimits, InitOptions, ValueHandle, Version,
    init, init_once, init_with, is_initialized, version,
};
pub use diagnostics::{Phase, ScriptError, SourceLocation, format_report};
