use std::{
    collections::{HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use pressroom::{
    AppState, IdGenerator, RetryPolicy, ShortId, Store,
    db::{MemoryStore, SqliteStore},
    router,
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

/// Replays a fixed list of ids, then counts upwards. Records every draw.
#[derive(Default)]
struct Scripted {
    queue: Mutex<VecDeque<String>>,
    drawn: AtomicUsize,
}

impl Scripted {
    fn new(ids: &[&str]) -> Self {
        Self {
            queue: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            drawn: AtomicUsize::new(0),
        }
    }

    fn drawn(&self) -> usize {
        self.drawn.load(Ordering::SeqCst)
    }
}

impl IdGenerator for Scripted {
    fn generate(&self) -> String {
        let n = self.drawn.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("gen{n}"))
    }
}

fn no_backoff() -> RetryPolicy {
    RetryPolicy {
        backoff_base: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

async fn sqlite_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteStore::new(pool);
    store.sync_schema().await.unwrap();
    store
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = call(app, Method::GET, uri, None).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = call(app, Method::POST, uri, Some(body)).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn article_round_trip(store: Arc<dyn Store>) {
    let app = router(AppState::new(store).with_retry(no_backoff()));

    let (status, created) = post(
        &app,
        "/api/v1/articles/create",
        json!({ "userId": "u1", "title": "T", "description": "D", "fileURL": "http://x", "content": "body" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let article_id = created["articleId"].as_str().unwrap().to_owned();

    let (status, articles) = get(&app, &format!("/api/v1/articles/{article_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let articles = articles.as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["articleId"], article_id.as_str());
    assert_eq!(articles[0]["userId"], "u1");
    assert_eq!(articles[0]["title"], "T");
    assert_eq!(articles[0]["description"], "D");
    assert_eq!(articles[0]["fileURL"], "http://x");

    let (status, contents) = get(&app, &format!("/api/v1/articles/content/{article_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contents, json!([{ "articleId": article_id, "content": "body" }]));

    let (status, by_user) = get(&app, "/api/v1/users/articles/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_user.as_array().unwrap().len(), 1);

    // reads are stable
    let (_, again) = get(&app, &format!("/api/v1/articles/{article_id}")).await;
    assert_eq!(again.as_array().unwrap(), articles);
}

#[tokio::test]
async fn article_round_trip_in_memory() {
    article_round_trip(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn article_round_trip_in_sqlite() {
    article_round_trip(Arc::new(sqlite_store().await)).await;
}

async fn comment_round_trip(store: Arc<dyn Store>) {
    let app = router(AppState::new(store).with_retry(no_backoff()));

    let (status, created) = post(
        &app,
        "/api/v1/comments/addComment",
        json!({ "articleId": "a1", "userId": "u1", "content": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = created["commentId"].as_str().unwrap().to_owned();
    assert!(!comment_id.is_empty());

    let (status, comments) = get(&app, "/api/v1/comments/a1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments[0]["commentId"], comment_id.as_str());
    assert_eq!(comments[0]["content"], "hi");
    assert!(comments[0]["time"].is_string());

    let (status, mine) = get(&app, "/api/v1/users/comments/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine, comments);
}

#[tokio::test]
async fn comment_round_trip_in_memory() {
    comment_round_trip(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn comment_round_trip_in_sqlite() {
    comment_round_trip(Arc::new(sqlite_store().await)).await;
}

#[tokio::test]
async fn user_gets_an_id_and_a_username() {
    let app = router(AppState::new(Arc::new(sqlite_store().await)).with_retry(no_backoff()));

    let (status, created) = post(
        &app,
        "/api/v1/users/create",
        json!({ "firstName": "Ada", "lastName": "L", "email": "ada@example.com", "username": "ada" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = created["userId"].as_str().unwrap();

    let (status, name) = get(&app, &format!("/api/v1/users/username/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(name, json!({ "username": "ada" }));
}

#[tokio::test]
async fn missing_field_is_rejected_before_any_id_is_drawn() {
    let cases: [(&str, Value); 3] = [
        ("/api/v1/comments/addComment", json!({ "articleId": "a1", "userId": "u1", "content": "hi" })),
        (
            "/api/v1/articles/create",
            json!({ "userId": "u1", "title": "T", "description": "D", "fileURL": "http://x" }),
        ),
        (
            "/api/v1/users/create",
            json!({ "firstName": "A", "lastName": "B", "email": "e", "username": "ab" }),
        ),
    ];

    for (uri, full) in cases {
        for field in full.as_object().unwrap().keys() {
            let ids = Arc::new(Scripted::default());
            let store = Arc::new(MemoryStore::new());
            let app = router(AppState::new(store.clone()).with_ids(ids.clone()));

            let mut body = full.clone();
            body.as_object_mut().unwrap().remove(field);

            let (status, error) = post(&app, uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} without {field}");
            assert!(error["error"].as_str().unwrap().contains(field.as_str()), "{error}");
            assert_eq!(ids.drawn(), 0, "{uri} without {field} drew an id");
        }
    }
}

#[tokio::test]
async fn bodiless_create_is_400_with_a_message() {
    for uri in ["/api/v1/comments/addComment", "/api/v1/articles/create", "/api/v1/users/create"] {
        let ids = Arc::new(Scripted::default());
        let app = router(AppState::new(Arc::new(MemoryStore::new())).with_ids(ids.clone()));

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(error["error"].as_str().unwrap().starts_with("You must include in body"), "{error}");
        assert_eq!(ids.drawn(), 0, "{uri}");
    }
}

#[tokio::test]
async fn malformed_json_is_400_with_a_message() {
    let app = router(AppState::new(Arc::new(MemoryStore::new())));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/comments/addComment")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"articleId\":"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn non_string_fields_are_stored_as_text() {
    let app = router(AppState::new(Arc::new(sqlite_store().await)).with_retry(no_backoff()));

    let (status, created) = post(
        &app,
        "/api/v1/comments/addComment",
        json!({ "articleId": "a1", "userId": 42, "content": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = created["commentId"].as_str().unwrap();

    let (status, mine) = get(&app, "/api/v1/users/comments/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["commentId"], comment_id);
    assert_eq!(mine[0]["userId"], "42");
    assert_eq!(mine[0]["content"], "true");
}

#[tokio::test]
async fn unknown_keys_are_404_with_empty_body() {
    let app = router(AppState::new(Arc::new(sqlite_store().await)));

    for uri in [
        "/api/v1/articles/nope",
        "/api/v1/articles/content/nope",
        "/api/v1/comments/nope",
        "/api/v1/users/articles/nope",
        "/api/v1/users/comments/nope",
        "/api/v1/users/username/nope",
        "/api/v1/nowhere",
    ] {
        let (status, body) = call(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn colliding_candidates_are_skipped() {
    let ids = Arc::new(Scripted::new(&["dup", "dup", "dup", "fresh"]));
    let app = router(
        AppState::new(Arc::new(MemoryStore::new()))
            .with_ids(ids.clone())
            .with_retry(no_backoff()),
    );
    let body = json!({ "articleId": "a1", "userId": "u1", "content": "hi" });

    let (_, first) = post(&app, "/api/v1/comments/addComment", body.clone()).await;
    let (_, second) = post(&app, "/api/v1/comments/addComment", body).await;

    assert_eq!(first["commentId"], "dup");
    assert_eq!(second["commentId"], "fresh");
    assert_eq!(ids.drawn(), 4);

    let (_, comments) = get(&app, "/api/v1/comments/a1").await;
    assert_eq!(comments.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_creations_never_share_an_id() {
    let app = router(
        AppState::new(Arc::new(sqlite_store().await))
            .with_ids(Arc::new(ShortId::new(7)))
            .with_retry(no_backoff()),
    );

    let tasks: Vec<_> = (0..100)
        .map(|n| {
            let app = app.clone();
            tokio::spawn(async move {
                let (status, created) = post(
                    &app,
                    "/api/v1/comments/addComment",
                    json!({ "articleId": "a1", "userId": "u1", "content": n.to_string() }),
                )
                .await;
                assert_eq!(status, StatusCode::OK);
                created["commentId"].as_str().unwrap().to_owned()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for task in tasks {
        assert!(seen.insert(task.await.unwrap()));
    }
    assert_eq!(seen.len(), 100);
}

#[tokio::test]
async fn exhausted_id_space_is_503() {
    let ids = Arc::new(Scripted::new(&["only"; 8]));
    let app = router(
        AppState::new(Arc::new(MemoryStore::new()))
            .with_ids(ids.clone())
            .with_retry(RetryPolicy {
                max_attempts: 5,
                ..no_backoff()
            }),
    );
    let body = json!({ "articleId": "a1", "userId": "u1", "content": "hi" });

    let (status, _) = post(&app, "/api/v1/comments/addComment", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = post(&app, "/api/v1/comments/addComment", body).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(error["error"].as_str().unwrap().contains("5 attempts"));
    assert_eq!(ids.drawn(), 6);
}

#[tokio::test]
async fn store_fault_is_500_not_a_hang() {
    let store = Arc::new(MemoryStore::new());
    let app = router(AppState::new(store.clone()));
    store.set_unavailable(true);

    let (status, error) = post(
        &app,
        "/api/v1/comments/addComment",
        json!({ "articleId": "a1", "userId": "u1", "content": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error, json!({ "error": "Internal Server Error" }));

    let (status, _) = call(&app, Method::GET, "/api/v1/comments/a1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = call(&app, Method::GET, "/sqlTest", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn sql_test_reports_a_live_connection() {
    let app = router(AppState::new(Arc::new(sqlite_store().await)));
    let (status, body) = call(&app, Method::GET, "/sqlTest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Connection has been established successfully");
}
