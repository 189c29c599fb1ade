//! Conversions between engine strings and host byte buffers.
//!
//! Text crosses in both directions as explicit-length bytes. Nothing here
//! relies on a terminating zero byte, and embedded zeros survive the trip.

use crate::diagnostics::{self, Phase, ScriptError};

/// Create an engine string from raw UTF-8 bytes.
///
/// Invalid sequences are replaced by the engine rather than rejected. Only
/// inputs beyond the engine's maximum string length fail.
pub(crate) fn new_string<'s>(
    scope: &mut v8::HandleScope<'s, ()>,
    bytes: &[u8],
) -> Option<v8::Local<'s, v8::String>> {
    v8::String::new_from_utf8(scope, bytes, v8::NewStringType::Normal)
}

/// Copy an engine string into an owned buffer.
pub(crate) fn to_bytes(scope: &mut v8::HandleScope, string: v8::Local<v8::String>) -> Vec<u8> {
    string.to_rust_string_lossy(scope).into_bytes()
}

/// Coerce `value` to its string form, reporting a throwing coercion
/// (a custom `toString`, a symbol) as a [`ScriptError`].
pub(crate) fn stringify(
    scope: &mut v8::HandleScope,
    value: v8::Local<v8::Value>,
) -> Result<Vec<u8>, ScriptError> {
    let try_catch = &mut v8::TryCatch::new(scope);
    match value.to_string(try_catch) {
        Some(string) => Ok(to_bytes(try_catch, string)),
        None => Err(diagnostics::capture(try_catch, Phase::Coercion)),
    }
}

/// Best-effort string form used inside diagnostics. A coercion that throws
/// here yields an empty string; the original fault is what gets reported.
pub(crate) fn display(scope: &mut v8::HandleScope, value: v8::Local<v8::Value>) -> String {
    let try_catch = &mut v8::TryCatch::new(scope);
    value
        .to_string(try_catch)
        .map(|string| string.to_rust_string_lossy(try_catch))
        .unwrap_or_default()
}
