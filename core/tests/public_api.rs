//! Integration tests for the public API.
//!
//! These run real source through the embedded engine end to end.

mod common;

use common::{eval_error, eval_string, new_env};
use indoc::indoc;
use pretty_assertions::assert_eq;
use reactor_core::{Environment, EnvironmentOptions, Error, HeapLimits, Phase, ValueHandle};
use serde_json::json;

#[test]
fn test_create_and_release_environment() {
    let env = new_env();
    assert!(!env.is_released());
    env.release().expect("release should succeed");
    assert!(env.is_released());
}

#[test]
fn test_release_twice_is_noop() {
    let env = new_env();
    env.release().unwrap();
    env.release().unwrap();
}

#[test]
fn test_eval_arithmetic() {
    let env = new_env();
    let value = env.eval("1+1", "t.js").expect("eval should succeed");
    assert_eq!(env.value_to_string(&value).unwrap(), b"2".to_vec());
    env.release_value(value).unwrap();
    env.release().unwrap();
}

#[test]
fn test_eval_script_with_function() {
    let env = new_env();
    let code = indoc! {"
        function double(n) {
            return n * 2;
        }

        double(2);
    "};
    assert_eq!(eval_string(&env, code), "4");
}

#[test]
fn test_state_persists_between_evals() {
    let env = new_env();
    env.eval_release("var x = 5;", "a.js").unwrap();
    assert_eq!(eval_string(&env, "x * 2"), "10");
}

#[test]
fn test_embedded_zero_byte_survives() {
    let env = new_env();
    let value = env.eval("'a\\u0000b'", "t.js").unwrap();
    let bytes = env.value_to_string(&value).unwrap();
    assert_eq!(bytes, vec![b'a', 0, b'b']);
    env.release_value(value).unwrap();
}

#[test]
fn test_code_with_literal_zero_byte() {
    let env = new_env();
    let value = env.eval(b"'x\0y'.length", "t.js").unwrap();
    assert_eq!(env.value_to_string(&value).unwrap(), b"3".to_vec());
    env.release_value(value).unwrap();
}

#[test]
fn test_invalid_utf8_source_is_replaced() {
    let env = new_env();
    let value = env.eval([b'\'', 0xff, b'\''], "t.js").unwrap();
    assert_eq!(env.value_to_string_lossy(&value).unwrap(), "\u{FFFD}");
    env.release_value(value).unwrap();
}

#[test]
fn test_thrown_error_report() {
    let env = new_env();
    let err = eval_error(&env, "throw new Error('boom')");
    assert_eq!(err.phase, Phase::Run);
    assert_eq!(err.exception, "Error: boom");
    assert!(
        err.report.starts_with("Uncaught exception: Error: boom"),
        "unexpected report: {}",
        err.report
    );
    assert!(err.report.contains("Stack trace: Error: boom"), "{}", err.report);
}

#[test]
fn test_thrown_primitive_has_no_stack() {
    let env = new_env();
    let err = eval_error(&env, "throw 'plain'");
    assert_eq!(err.exception, "plain");
    assert_eq!(err.stack, None);
    assert!(!err.report.contains("Stack trace:"));
}

#[test]
fn test_reference_error() {
    let env = new_env();
    let err = eval_error(&env, "double(2);");
    assert!(
        err.report.contains("ReferenceError: double is not defined"),
        "incomplete error: {}",
        err.report
    );
}

#[test]
fn test_syntax_error_is_compile_phase() {
    let env = new_env();
    let err = eval_error(&env, "syntax (((");
    assert_eq!(err.phase, Phase::Compile);
    assert!(err.report.starts_with("Uncaught exception: SyntaxError"), "{}", err.report);
}

#[test]
fn test_syntax_error_has_no_side_effects() {
    let env = new_env();
    let err = eval_error(&env, "globalThis.touched = true; syntax (((");
    assert_eq!(err.phase, Phase::Compile);
    assert_eq!(eval_string(&env, "typeof touched"), "undefined");
}

#[test]
fn test_partial_effects_are_kept() {
    let env = new_env();
    eval_error(&env, "globalThis.touched = true; throw new Error('late')");
    assert_eq!(eval_string(&env, "touched"), "true");
}

#[test]
fn test_location_block_matches_columns() {
    let env = new_env();
    let code = indoc! {"
        var ok = 1;
        ok + notDefined;
    "};
    let err = eval_error(&env, code);
    let loc = err.location.clone().expect("runtime error should carry a location");
    assert_eq!(loc.resource, "t.js");
    assert_eq!(loc.line, 2);
    assert_eq!(loc.source_line, "ok + notDefined;");

    let lines: Vec<&str> = err.report.lines().collect();
    let at = format!("at t.js:{}:{}", loc.line, loc.start_column);
    let idx = lines
        .iter()
        .position(|line| *line == at)
        .unwrap_or_else(|| panic!("missing {at:?} in {}", err.report));
    assert_eq!(lines[idx + 1], format!("  {}", loc.source_line));
    let carets = lines[idx + 2];
    assert_eq!(
        carets.chars().filter(|c| *c == '^').count(),
        loc.end_column - loc.start_column
    );
    assert_eq!(carets.find('^'), Some(2 + loc.start_column));
}

#[test]
fn test_throwing_coercion_is_reported() {
    let env = new_env();
    let value = env
        .eval("({ toString() { throw new Error('nope') } })", "t.js")
        .unwrap();
    match env.value_to_string(&value) {
        Err(Error::Script(err)) => {
            assert_eq!(err.phase, Phase::Coercion);
            assert!(err.report.contains("Error: nope"), "{}", err.report);
        }
        other => panic!("expected coercion error, got {other:?}"),
    }
    env.release_value(value).unwrap();
}

#[test]
fn test_symbol_coercion_is_reported() {
    let env = new_env();
    let value = env.eval("Symbol('s')", "t.js").unwrap();
    let err = env.value_to_string(&value).unwrap_err();
    assert!(err.as_script().is_some_and(|e| e.exception.starts_with("TypeError")));
    env.release_value(value).unwrap();
}

#[test]
fn test_custom_to_string_runs() {
    let env = new_env();
    assert_eq!(eval_string(&env, "({ toString() { return 'custom' } })"), "custom");
}

#[test]
fn test_call_encodes_arguments() {
    let env = new_env();
    env.eval_release(
        "function greet(who, n) { return who.name + ':' + n.length }",
        "lib.js",
    )
    .unwrap();
    let value = env
        .call("greet", &[json!({ "name": "ada" }), json!([1, 2, 3])])
        .unwrap();
    assert_eq!(env.value_to_string_lossy(&value).unwrap(), "ada:3");
    env.release_value(value).unwrap();
}

#[test]
fn test_call_missing_function() {
    let env = new_env();
    let err = env.call("nowhere", &[]).unwrap_err();
    assert!(err.to_string().contains("ReferenceError: nowhere is not defined"));
}

#[test]
fn test_live_values_tracks_releases() {
    let env = new_env();
    let a = env.eval("1", "t.js").unwrap();
    let b = env.eval("2", "t.js").unwrap();
    assert_eq!(env.live_values().unwrap(), 2);
    env.release_value(a).unwrap();
    assert_eq!(env.live_values().unwrap(), 1);
    env.release_value(b).unwrap();
    assert_eq!(env.live_values().unwrap(), 0);
}

#[test]
fn test_failed_eval_produces_no_value() {
    let env = new_env();
    let _ = env.eval("throw 1", "t.js");
    assert_eq!(env.live_values().unwrap(), 0);
}

#[test]
fn test_double_value_release_is_detected() {
    let env = new_env();
    let value = env.eval("5 + 5;", "t.js").unwrap();
    let copy = ValueHandle::from_parts(value.owner(), value.key());
    env.release_value(value).unwrap();
    assert!(matches!(env.release_value(copy), Err(Error::StaleValue)));
}

#[test]
fn test_value_from_other_environment_is_rejected() {
    let a = new_env();
    let b = new_env();
    let value = a.eval("'mine'", "t.js").unwrap();
    match b.value_to_string(&value) {
        Err(Error::ForeignValue { owner, used }) => {
            assert_eq!(owner, a.id());
            assert_eq!(used, b.id());
        }
        other => panic!("expected foreign value error, got {other:?}"),
    }
    a.release_value(value).unwrap();
}

#[test]
fn test_value_after_environment_release() {
    let env = new_env();
    let value = env.eval("5 + 5;", "t.js").unwrap();
    assert_eq!(env.value_to_string(&value).unwrap(), b"10".to_vec());
    env.release().unwrap();
    assert!(matches!(env.value_to_string(&value), Err(Error::ReleasedEnvironment)));
    assert!(matches!(env.release_value(value), Err(Error::ReleasedEnvironment)));
    assert!(matches!(env.eval("1", "t.js"), Err(Error::ReleasedEnvironment)));
}

#[test]
fn test_environments_are_isolated() {
    let a = new_env();
    let b = new_env();
    a.eval_release("var shared = 'a';", "a.js").unwrap();
    assert_eq!(eval_string(&b, "typeof shared"), "undefined");
    assert_eq!(eval_string(&a, "shared"), "a");
}

#[test]
fn test_environment_with_options() {
    common::setup();
    let env = Environment::with_options(EnvironmentOptions {
        heap_limits: Some(HeapLimits {
            initial_bytes: 0,
            max_bytes: 64 << 20,
        }),
        stack_trace_limit: Some(10),
        thread_stack_size: Some(8 << 20),
    })
    .unwrap();
    assert_eq!(eval_string(&env, "[1,2,3].join('-')"), "1-2-3");
}

#[test]
fn test_stack_trace_limit_records_frames_for_thrown_primitives() {
    common::setup();
    let env = Environment::with_options(EnvironmentOptions {
        stack_trace_limit: Some(10),
        ..Default::default()
    })
    .unwrap();
    let code = indoc! {"
        function fail() {
            throw 'plain';
        }
        fail();
    "};
    let err = eval_error(&env, code);
    let stack = err.stack.as_deref().expect("stack should be recorded");
    assert!(stack.starts_with("plain\n"), "{stack}");
    assert!(stack.contains("at fail (t.js:2:"), "{stack}");
    assert!(err.report.contains("\nStack trace: plain"), "{}", err.report);
}

#[test]
fn test_invalid_options_rejected() {
    common::setup();
    let err = Environment::with_options(EnvironmentOptions {
        heap_limits: Some(HeapLimits {
            initial_bytes: 2,
            max_bytes: 1,
        }),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, Error::Api(_)));
}

#[test]
fn test_drop_releases_outstanding_values() {
    let env = new_env();
    let _leaked = env.eval("({})", "t.js").unwrap();
    drop(env);
}
