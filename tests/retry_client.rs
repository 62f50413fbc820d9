mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tokio::{io::AsyncReadExt, net::TcpListener};
use reelshelf::retry::{RetryPolicy, RetryingClient, UpstreamError};
use wreq::Method;

use common::{fast_retry, serve};

/// Upstream that answers `failure` for the first `failures` hits, then 200.
async fn flaky(failure: StatusCode, failures: usize) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/",
            get(move |State(hits): State<Arc<AtomicUsize>>| async move {
                if hits.fetch_add(1, Ordering::SeqCst) < failures {
                    (failure, "down")
                } else {
                    (StatusCode::OK, "up")
                }
            }),
        )
        .with_state(hits.clone());
    let addr = serve(router).await;
    (format!("http://{addr}/"), hits)
}

fn client(policy: RetryPolicy) -> RetryingClient {
    RetryingClient::new(wreq::Client::new(), policy)
}

#[tokio::test]
async fn recovers_after_transient_statuses() {
    let (url, hits) = flaky(StatusCode::BAD_GATEWAY, 2).await;

    let resp = client(fast_retry()).send(Method::GET, &url, None).await.unwrap();

    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.body, b"up");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let (url, hits) = flaky(StatusCode::GATEWAY_TIMEOUT, usize::MAX).await;

    let err = client(fast_retry()).send(Method::GET, &url, None).await.unwrap_err();

    match err {
        UpstreamError::Unavailable { attempts, detail } => {
            assert_eq!(attempts, 3);
            assert_eq!(detail, "HTTP 504");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unlisted_statuses_pass_straight_through() {
    let (url, hits) = flaky(StatusCode::NOT_FOUND, usize::MAX).await;

    let resp = client(fast_retry()).send(Method::GET, &url, None).await.unwrap();

    assert_eq!(resp.status.as_u16(), 404);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_retries_means_a_single_attempt() {
    let (url, hits) = flaky(StatusCode::INTERNAL_SERVER_ERROR, usize::MAX).await;
    let policy = RetryPolicy { max_retries: 0, ..fast_retry() };

    let err = client(policy).send(Method::GET, &url, None).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Unavailable { attempts: 1, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connection_failures_are_retried() {
    // Grab a free port, then close it so connections are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(fast_retry()).send(Method::GET, &format!("http://{addr}/"), None).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Unavailable { attempts: 3, .. }), "{err}");
}

#[tokio::test]
async fn slow_attempts_time_out_and_retry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                "ok"
            }),
        )
        .with_state(hits.clone());
    let addr = serve(router).await;
    let policy = RetryPolicy { attempt_timeout: Duration::from_millis(200), ..fast_retry() };

    let resp = client(policy).send(Method::GET, &format!("http://{addr}/"), None).await.unwrap();

    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dropped_connections_are_retried() {
    // Accepts, reads the request, then hangs up without answering.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let accepted = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            drop(stream);
        }
    });

    let err = client(fast_retry()).send(Method::GET, &format!("http://{addr}/"), None).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Unavailable { attempts: 3, .. }), "{err}");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
