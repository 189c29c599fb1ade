//! Terminal rendering of script errors using ariadne
//!
//! The plain report carried by [`ScriptError`] is what crosses the C
//! boundary; this module is for Rust hosts that want a richer view of the
//! same data on a terminal.

use std::io::Write;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::{Phase, ScriptError};

/// Character set for rendering error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// Use Unicode characters for rich visual output.
    #[default]
    Unicode,
    /// Use ASCII-only characters for compatibility.
    Ascii,
}

/// Configuration for error rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    pub charset: CharSet,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: true,
            charset: CharSet::Unicode,
        }
    }
}

/// Render `error` to stderr with the default configuration.
pub fn render_error(error: &ScriptError) {
    render_error_to(error, &mut std::io::stderr(), &RenderConfig::default()).ok();
}

/// Render `error` to `writer`.
///
/// Errors with a source location get a snippet of the offending line with
/// the engine's column range underlined; the engine's line number is kept.
/// Errors without one render as a single header line.
///
/// # Example
/// ```no_run
/// use reactor::{CoreError, Environment, RenderConfig, render_error_to};
///
/// reactor::init_once();
/// let env = Environment::new().unwrap();
/// if let Err(CoreError::Script(err)) = env.eval("null.x", "app.js") {
///     let mut buf = Vec::new();
///     let config = RenderConfig { color: false, ..Default::default() };
///     render_error_to(&err, &mut buf, &config).ok();
///     println!("{}", String::from_utf8_lossy(&buf));
/// }
/// ```
pub fn render_error_to(
    error: &ScriptError,
    writer: &mut dyn Write,
    config: &RenderConfig,
) -> std::io::Result<()> {
    let Some(location) = &error.location else {
        return writeln!(writer, "{}: {}", heading(error.phase), error.exception);
    };

    let ariadne_charset = match config.charset {
        CharSet::Unicode => ariadne::CharSet::Unicode,
        CharSet::Ascii => ariadne::CharSet::Ascii,
    };
    let ariadne_config = ariadne::Config::default()
        .with_color(config.color)
        .with_char_set(ariadne_charset);

    let name = location.resource.as_str();
    let span = clamp_span(
        location.start_column,
        location.end_column,
        location.source_line.chars().count(),
    );
    let label = match error.phase {
        Phase::Compile => "rejected here",
        Phase::Run => "thrown here",
        Phase::Coercion => "coerced here",
    };

    let mut report = Report::build(ReportKind::Error, (name, span.clone()))
        .with_message(&error.exception)
        .with_config(ariadne_config)
        .with_label(
            Label::new((name, span))
                .with_message(label)
                .with_color(Color::Red),
        );
    if let Some(stack) = &error.stack {
        report = report.with_note(stack);
    }

    let source = Source::from(location.source_line.as_str())
        .with_display_line_offset(location.line.saturating_sub(1));
    report.finish().write((name, source), &mut *writer)
}

fn heading(phase: Phase) -> &'static str {
    match phase {
        Phase::Compile => "Compile error",
        Phase::Run => "Uncaught exception",
        Phase::Coercion => "String conversion failed",
    }
}

/// Keep the span inside the line and at least one character wide.
fn clamp_span(start: usize, end: usize, len: usize) -> std::ops::Range<usize> {
    let start = start.min(len);
    let end = end.clamp(start, len);
    if end > start { start..end } else { start..start + 1 }
}
