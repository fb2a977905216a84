//! Bounded connection retries.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use wallcap_core::connection::{connect_with_retry, RetryPolicy};
use wallcap_core::error::CaptureError;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 10,
        retry_interval: Duration::from_millis(1),
        attempt_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn ten_failures_exhaust_ten_attempts() {
    let calls = AtomicU32::new(0);
    let result = connect_with_retry(&policy(), "ws://127.0.0.1:9", |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>("connection refused") }
    })
    .await;

    match result {
        Err(CaptureError::Connection {
            endpoint,
            attempts,
            last_error,
        }) => {
            assert_eq!(endpoint, "ws://127.0.0.1:9");
            assert_eq!(attempts, 10);
            assert_eq!(last_error, "connection refused");
        }
        other => panic!("expected connection error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn success_on_the_last_attempt_is_usable() {
    let result = connect_with_retry(&policy(), "ws://127.0.0.1:9", |attempt| async move {
        if attempt < 9 {
            Err("connection refused")
        } else {
            Ok(format!("connection #{}", attempt + 1))
        }
    })
    .await;
    assert_eq!(result.unwrap(), "connection #10");
}

#[tokio::test]
async fn unreachable_endpoint_gives_up_in_bounded_time() {
    let policy = RetryPolicy {
        max_attempts: 3,
        retry_interval: Duration::from_millis(20),
        attempt_timeout: Duration::from_secs(2),
    };
    let started = std::time::Instant::now();
    let result = connect_with_retry(&policy, "ws://127.0.0.1:1", |_| async {
        wallcap_core::cdp::WsTransport::connect("ws://127.0.0.1:1").await
    })
    .await;
    assert!(matches!(result, Err(CaptureError::Connection { attempts: 3, .. })));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn silent_endpoint_is_abandoned_per_attempt() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and hold them open without ever answering.
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let endpoint = format!("ws://{addr}/devtools/browser/silent");
    let policy = RetryPolicy {
        max_attempts: 2,
        retry_interval: Duration::from_millis(10),
        attempt_timeout: Duration::from_millis(200),
    };
    let started = std::time::Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        connect_with_retry(&policy, &endpoint, |_| {
            wallcap_core::cdp::WsTransport::connect(&endpoint)
        }),
    )
    .await
    .expect("retry loop must finish on its own");

    match result {
        Err(CaptureError::Connection { attempts, last_error, .. }) => {
            assert_eq!(attempts, 2);
            assert!(last_error.contains("timed out"), "{last_error}");
        }
        other => panic!("expected connection error, got {:?}", other.map(|_| ())),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    server.abort();
}
