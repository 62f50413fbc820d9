mod common;

use axum::http::{Method, StatusCode};
use futures::future::join_all;
use reelshelf::{db::connect_and_migrate, tally::RequestTally};
use sea_orm::ConnectOptions;

use common::{TestApp, test_db};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_not_lost() {
    // A file database so several pooled connections write at once.
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("tally.db").display());
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(8).sqlx_logging(false);
    let tally = RequestTally::new(connect_and_migrate(opts).await.unwrap());

    let tasks = (0..50).map(|_| {
        let tally = tally.clone();
        tokio::spawn(async move { tally.increment().await })
    });
    for joined in join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    assert_eq!(tally.read().await.unwrap(), 50);
}

#[tokio::test]
async fn reset_returns_to_zero() {
    let tally = RequestTally::new(test_db().await);
    for _ in 0..3 {
        tally.increment().await.unwrap();
    }

    tally.reset().await.unwrap();
    assert_eq!(tally.read().await.unwrap(), 0);

    tally.increment().await.unwrap();
    assert_eq!(tally.read().await.unwrap(), 1);
}

#[tokio::test]
async fn every_request_is_counted_including_the_read() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    app.get("/collection/", &token).await;
    app.call(Method::GET, "/collection/", None, None).await;

    // register, two listings, then this read.
    let (status, body) = app.get("/request-count/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests"], 4);
}

#[tokio::test]
async fn reset_endpoint_clears_the_tally() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let (status, body) = app.call(Method::POST, "/request-count/reset/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Request count reset successfully");

    let (_, body) = app.get("/request-count/", &token).await;
    assert_eq!(body["requests"], 1);
}
