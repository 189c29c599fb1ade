//! Reactor - server-side rendering on an embedded script engine
//!
//! # Overview
//!
//! Reactor hosts isolated script environments and uses them to render UI
//! components from a server script. The layers are:
//!
//! - [`Environment`]: one engine instance with one global context. Code is
//!   evaluated with [`Environment::eval`]; results stay in the engine and
//!   are referred to by move-only [`ValueHandle`]s.
//! - [`Worker`]: an environment with a server script loaded, answering
//!   [`Request`]s through the script's global `render` function.
//! - [`Pool`]: hands out workers on the current script version.
//!
//! # Quick Start
//!
//! ```no_run
//! use reactor::{Environment, Pool, Request};
//!
//! reactor::init().unwrap();
//!
//! let env = Environment::new().unwrap();
//! let value = env.eval("[1, 2, 3].map(x => x * 2)", "quick.js").unwrap();
//! assert_eq!(env.value_to_string_lossy(&value).unwrap(), "2,4,6");
//! env.release_value(value).unwrap();
//!
//! let pool = Pool::new(r#"
//!     function render(req) {
//!         const { name } = JSON.parse(req);
//!         return JSON.stringify({ html: "<b>" + name + "</b>" });
//!     }
//! "#).unwrap();
//! let response = pool
//!     .render(&Request { name: "Widget".into(), ..Default::default() })
//!     .unwrap();
//! assert_eq!(response.html, "<b>Widget</b>");
//! ```
//!
//! # Errors
//!
//! Script faults come back as [`ScriptError`], whose `Display` is the
//! plain-text report. [`render_error_to`] draws the same data with source
//! snippets for terminals.

pub mod error;
pub use error::{Error, Result};

// Error rendering utilities
pub mod error_renderer;
pub use error_renderer::{CharSet, RenderConfig, render_error, render_error_to};

pub mod pool;
pub mod worker;
pub use pool::Pool;
pub use worker::{Request, Response, Worker, checksum};

// Re-export public API from reactor_core
pub use reactor_core::api::{
    EnvId, Environment, EnvironmentOptions, HeapLimits, InitOptions, ValueHandle, Version, init,
    init_once, init_with, is_initialized, version,
};
pub use reactor_core::diagnostics::{Phase, ScriptError, SourceLocation, format_report};

/// The engine-level error, as returned by [`Environment`] methods.
pub use reactor_core::Error as CoreError;
