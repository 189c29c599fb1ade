//! Render pool and worker behavior against real server scripts.

use std::sync::Arc;
use std::thread;

use indoc::indoc;
use pretty_assertions::assert_eq;
use reactor::{Error, Pool, Request, Worker, checksum};

const ECHO: &str = indoc! {r#"
    function render(payload) {
        const req = JSON.parse(payload);
        if (req.name === "Broken") {
            return JSON.stringify({ error: "cannot render " + req.name });
        }
        const serial = req.props && req.props.serial;
        return JSON.stringify({ html: "<" + req.name + ">" + serial + "</" + req.name + ">" });
    }
"#};

fn setup() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
    reactor::init_once();
}

fn widget(serial: &str) -> Request {
    Request {
        name: "Widget".into(),
        props: serde_json::json!({ "serial": serial }),
    }
}

fn constant(html: &str) -> String {
    format!(r#"function render() {{ return '{{"html": "{html}"}}'; }}"#)
}

#[test]
fn test_worker_empty_code() {
    setup();
    let worker = Worker::new("").unwrap();
    assert_eq!(worker.version(), checksum(""));
    assert!(!worker.is_closed());
    worker.close();
}

#[test]
fn test_worker_invalid_code() {
    setup();
    let err = Worker::new("throw 'hi';").unwrap_err();
    assert!(err.to_string().contains("Uncaught exception: hi"), "{err}");
    assert!(err.as_script().is_some());
}

#[test]
fn test_worker_renders_request() {
    setup();
    let worker = Worker::new(ECHO).unwrap();
    let response = worker.render(&widget("7")).unwrap();
    assert_eq!(response.html, "<Widget>7</Widget>");
    assert_eq!(response.error, "");
    worker.close();
}

#[test]
fn test_script_reported_error_is_a_response() {
    setup();
    let worker = Worker::new(ECHO).unwrap();
    let response = worker
        .render(&Request {
            name: "Broken".into(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(response.html, "");
    assert_eq!(response.error, "cannot render Broken");
}

#[test]
fn test_non_json_response_is_decode_error() {
    setup();
    let worker = Worker::new("function render() { return 'not json'; }").unwrap();
    let err = worker.render(&Request::default()).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
}

#[test]
fn test_worker_render_closed() {
    setup();
    let worker = Worker::new("").unwrap();
    worker.close();
    worker.close();
    assert!(worker.is_closed());
    let err = worker.render(&Request::default()).unwrap_err();
    assert!(matches!(err, Error::Closed));
    assert!(err.to_string().contains("closed"));
}

#[test]
fn test_worker_close_during_renders() {
    setup();
    let worker = Arc::new(Worker::new(&constant("<div>OK</div>")).unwrap());
    let closer = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.close())
    };
    for _ in 0..100 {
        match worker.render(&Request::default()) {
            Ok(response) => assert!(response.html.contains("OK")),
            Err(err) => assert!(err.to_string().contains("worker closed"), "{err}"),
        }
    }
    closer.join().unwrap();
    assert!(worker.is_closed());
}

#[test]
fn test_pool_render_empty_code() {
    setup();
    let pool = Pool::new("").unwrap();
    let err = pool.render(&Request::default()).unwrap_err();
    assert!(
        err.to_string().contains("ReferenceError: render is not defined"),
        "{err}"
    );
}

#[test]
fn test_pool_rejects_invalid_code() {
    setup();
    let err = Pool::new("throw 'hi';").unwrap_err();
    assert!(err.to_string().contains("Uncaught exception: hi"), "{err}");
}

#[test]
fn test_pool_reuses_workers() {
    setup();
    let pool = Pool::new(ECHO).unwrap();
    for i in 0..5 {
        let response = pool.render(&widget(&i.to_string())).unwrap();
        assert_eq!(response.html, format!("<Widget>{i}</Widget>"));
    }
    assert_eq!(pool.idle(), 1);
}

#[test]
fn test_pool_update_code() {
    setup();
    let pool = Pool::new(&constant("<div>1</div>")).unwrap();
    for _ in 0..5 {
        assert!(pool.render(&Request::default()).unwrap().html.contains('1'));
    }

    pool.update_code(&constant("<div>2</div>")).unwrap();
    for _ in 0..5 {
        assert!(pool.render(&Request::default()).unwrap().html.contains('2'));
    }
}

#[test]
fn test_pool_keeps_code_when_update_fails() {
    setup();
    let pool = Pool::new(&constant("<div>1</div>")).unwrap();
    assert!(pool.update_code("throw 'hi';").is_err());
    assert!(pool.render(&Request::default()).unwrap().html.contains('1'));
}

#[test]
fn test_pool_discards_stale_checkouts() {
    setup();
    let pool = Pool::new(&constant("<div>1</div>")).unwrap();
    let old = pool.get().unwrap();
    pool.update_code(&constant("<div>2</div>")).unwrap();

    // Finishes on the old code, then is discarded on the next checkout.
    assert!(old.render(&Request::default()).unwrap().html.contains('1'));
    pool.put(old);
    assert_eq!(pool.idle(), 2);

    let current = checksum(&constant("<div>2</div>"));
    let first = pool.get().unwrap();
    let second = pool.get().unwrap();
    assert_eq!(first.version(), current);
    assert_eq!(second.version(), current);
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_failed_render_closes_worker() {
    setup();
    let pool = Pool::new("function render() { throw new Error('nope'); }").unwrap();
    let err = pool.render(&Request::default()).unwrap_err();
    assert!(err.to_string().contains("Error: nope"), "{err}");
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_pool_grows_under_concurrency() {
    setup();
    let pool = Arc::new(Pool::new(ECHO).unwrap());
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for j in 0..5 {
                    let serial = format!("{i}-{j}");
                    let response = pool.render(&widget(&serial)).unwrap();
                    assert_eq!(response.html, format!("<Widget>{serial}</Widget>"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(pool.idle() >= 1);
}
