mod support;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use ingest::{AttemptError, HttpUpstream, Ingestor, PageFetcher, PageToken, Upstream};
use search_core::Message;
use support::{feed, quick_policy};
use tokio::net::TcpListener;

async fn messages(
    State(data): State<Arc<Vec<Message>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let skip: usize = params.get("skip").and_then(|s| s.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("limit").and_then(|s| s.parse().ok()).unwrap_or(100);
    let start = skip.min(data.len());
    let end = (start + limit).min(data.len());
    Json(serde_json::json!({ "total": data.len(), "items": &data[start..end] })).into_response()
}

async fn moved(RawQuery(query): RawQuery) -> Redirect {
    Redirect::temporary(&format!("/messages/?{}", query.unwrap_or_default()))
}

async fn spawn_feed() -> SocketAddr {
    let app = Router::new()
        .route("/messages/", get(messages))
        .route("/moved", get(moved))
        .route(
            "/throttled",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "2")], "slow down") }),
        )
        .route(
            "/throttled-date",
            get(|| async {
                (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")], "later")
            }),
        )
        .route("/broken", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "no such feed") }))
        .route("/garbage", get(|| async { "definitely not json" }))
        .with_state(Arc::new(feed()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn upstream(addr: SocketAddr, path: &str, limit: usize) -> HttpUpstream {
    HttpUpstream::new(&format!("http://{addr}{path}"), limit, Duration::from_secs(5), "test-agent").unwrap()
}

#[tokio::test]
async fn loads_all_pages_through_a_redirect() {
    let addr = spawn_feed().await;
    let fetcher = PageFetcher::new(Arc::new(upstream(addr, "/moved", 2)), quick_policy(3));
    let messages = Ingestor::new(fetcher, Duration::ZERO).load_all().await.unwrap();
    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5"]);
    assert_eq!(messages[1].author, "flight");
}

#[tokio::test]
async fn classifies_failure_statuses() {
    let addr = spawn_feed().await;

    let throttled = upstream(addr, "/throttled", 2).get_page(PageToken::first()).await.unwrap_err();
    assert!(matches!(throttled, AttemptError::Throttled { retry_after: Some(d) } if d == Duration::from_secs(2)));

    let dated = upstream(addr, "/throttled-date", 2).get_page(PageToken::first()).await.unwrap_err();
    assert!(matches!(dated, AttemptError::Throttled { retry_after: None }));

    let broken = upstream(addr, "/broken", 2).get_page(PageToken::first()).await.unwrap_err();
    assert!(matches!(broken, AttemptError::Transient(_)));

    let missing = upstream(addr, "/missing", 2).get_page(PageToken::first()).await.unwrap_err();
    match missing {
        AttemptError::Rejected { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such feed");
        }
        other => panic!("unexpected {other:?}"),
    }

    let garbage = upstream(addr, "/garbage", 2).get_page(PageToken::first()).await.unwrap_err();
    assert!(matches!(garbage, AttemptError::Transient(m) if m.starts_with("malformed page")));
}

#[tokio::test]
async fn connection_refused_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = upstream(addr, "/messages/", 2).get_page(PageToken::first()).await.unwrap_err();
    assert!(matches!(err, AttemptError::Transient(_)));
}
