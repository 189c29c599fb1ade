//! Exception reports.
//!
//! Every fault raised inside the engine (a compile error, a thrown value, a
//! failing string coercion) is captured at the call site and turned into a
//! [`ScriptError`]. The human-readable `report` built by [`format_report`]
//! is the only error payload that crosses the C boundary, so its layout is
//! fixed:
//!
//! ```text
//! Uncaught exception: <exception>
//! at <resource>:<line>:<start column>
//!   <source line>
//!   <start column spaces><carets up to end column>
//! Stack trace: <trace>
//! ```
//!
//! The location block is present only when the engine knows the resource
//! name, and the stack trace line only when the engine captured one.

use core::fmt;

use crate::marshal;

/// Where in the evaluation a fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The source was rejected before anything ran.
    Compile,
    /// The script threw, or the engine aborted it, while running.
    Run,
    /// Converting a result value to a string threw.
    Coercion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Compile => write!(f, "compile"),
            Phase::Run => write!(f, "run"),
            Phase::Coercion => write!(f, "coercion"),
        }
    }
}

/// Source position of a fault, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The filename the script was compiled with.
    pub resource: String,
    /// 1-based line number.
    pub line: usize,
    /// 0-based column where the offending range starts.
    pub start_column: usize,
    /// 0-based column one past the end of the offending range.
    pub end_column: usize,
    /// The full text of the offending line.
    pub source_line: String,
}

/// A fault raised by the engine, captured and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub phase: Phase,
    /// The engine's string form of the thrown value.
    pub exception: String,
    pub location: Option<SourceLocation>,
    pub stack: Option<String>,
    /// Output of [`format_report`] for the fields above.
    pub report: String,
}

impl ScriptError {
    pub fn new(
        phase: Phase,
        exception: String,
        location: Option<SourceLocation>,
        stack: Option<String>,
    ) -> Self {
        let report = format_report(&exception, location.as_ref(), stack.as_deref());
        Self {
            phase,
            exception,
            location,
            stack,
            report,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.report)
    }
}

impl std::error::Error for ScriptError {}

/// Build the report string for a captured exception.
pub fn format_report(
    exception: &str,
    location: Option<&SourceLocation>,
    stack: Option<&str>,
) -> String {
    let mut out = String::from("Uncaught exception: ");
    out.push_str(exception);

    if let Some(loc) = location {
        out.push_str(&format!(
            "\nat {}:{}:{}\n  {}\n  ",
            loc.resource, loc.line, loc.start_column, loc.source_line
        ));
        out.extend(core::iter::repeat_n(' ', loc.start_column));
        let width = loc.end_column.saturating_sub(loc.start_column);
        out.extend(core::iter::repeat_n('^', width));
    }

    if let Some(stack) = stack {
        out.push_str("\nStack trace: ");
        out.push_str(stack);
    }

    out
}

/// Drain the exception held by `try_catch` into a [`ScriptError`].
///
/// The thrown value, message and stack trace are captured before anything
/// is stringified, because stringifying can itself run script code.
pub(crate) fn capture(try_catch: &mut v8::TryCatch<v8::HandleScope>, phase: Phase) -> ScriptError {
    let exception = try_catch.exception();
    let message = try_catch.message();
    let stack = try_catch.stack_trace();

    let exception = match exception {
        Some(value) => marshal::display(try_catch, value),
        // The engine aborted without a thrown value (e.g. termination).
        None => String::from("execution terminated"),
    };

    let location = message.and_then(|message| {
        let resource = message.get_script_resource_name(try_catch)?;
        if resource.is_undefined() {
            return None;
        }
        let resource = marshal::display(try_catch, resource);
        let line = message.get_line_number(try_catch).unwrap_or(0);
        let source_line = message
            .get_source_line(try_catch)
            .map(|line| line.to_rust_string_lossy(try_catch))
            .unwrap_or_default();
        Some(SourceLocation {
            resource,
            line,
            start_column: message.get_start_column(),
            end_column: message.get_end_column(),
            source_line,
        })
    });

    // Thrown non-Error values have no `.stack`; fall back to the frames the
    // engine recorded for the message, present when the environment was
    // created with a stack trace limit.
    let stack = stack
        .filter(|stack| !stack.is_undefined() && !stack.is_null())
        .map(|stack| marshal::display(try_catch, stack))
        .filter(|stack| !stack.is_empty())
        .or_else(|| {
            let frames = recorded_frames(try_catch, message?)?;
            Some(format!("{exception}\n{frames}"))
        });

    let error = ScriptError::new(phase, exception, location, stack);
    tracing::trace!(%phase, exception = %error.exception, "captured script exception");
    error
}

/// Format the stack the engine captured alongside `message`, one
/// `    at ...` line per frame.
fn recorded_frames(scope: &mut v8::HandleScope, message: v8::Local<v8::Message>) -> Option<String> {
    let trace = message.get_stack_trace(scope)?;
    let mut lines = Vec::new();
    for index in 0..trace.get_frame_count() {
        let Some(frame) = trace.get_frame(scope, index) else {
            continue;
        };
        let script = frame
            .get_script_name(scope)
            .map(|name| name.to_rust_string_lossy(scope))
            .unwrap_or_default();
        let position = format!("{}:{}:{}", script, frame.get_line_number(), frame.get_column());
        let function = frame
            .get_function_name(scope)
            .map(|name| name.to_rust_string_lossy(scope))
            .unwrap_or_default();
        if function.is_empty() {
            lines.push(format!("    at {position}"));
        } else {
            lines.push(format!("    at {function} ({position})"));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
