//! Exercises the HTTP adapter against an in-process fake ChoreBoard backend.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Router,
};
use bridge_lib::adapters::{ChoreBoardHttpAdapter, TokenSigner};
use choreboard_core::domain::{ChoreAction, ChoreStatus, User};
use choreboard_core::ports::{ChoreBoardService, PortError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeBackend {
    /// How many upcoming requests get a 401 before the backend accepts again.
    reject_next: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, Value)>>,
}

async fn handle(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    backend.tokens.lock().unwrap().push(token);
    if let Some(query) = uri.query() {
        backend.queries.lock().unwrap().push(query.to_string());
    }

    let rejecting = backend
        .reject_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if rejecting {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match (method.as_str(), uri.path()) {
        ("GET", "/api/outstanding/") => Json(json!([
            {
                "id": 1,
                "status": "ASSIGNED",
                "due_at": "2024-03-10T18:00:00Z",
                "points_value": "15.00",
                "assigned_to": { "id": 2, "username": "sam", "display_name": "Sam" },
                "chore": { "name": "Dishes", "is_pool": false }
            },
            { "status": "POOL" },
            "garbage"
        ]))
        .into_response(),
        ("GET", "/api/late-chores/") => Json(json!({ "detail": "not a list" })).into_response(),
        ("GET", "/api/users/") => Json(json!([
            { "id": 2, "username": "sam", "weekly_points": "12.50", "all_time_points": 90 }
        ]))
        .into_response(),
        ("GET", "/api/completions/recent/") => Json(json!([
            { "id": 5, "chore": { "name": "Vacuum" }, "completed_by": "sam", "was_late": true }
        ]))
        .into_response(),
        ("GET", "/api/settings/") => Json(json!({ "points_label": "stars" })).into_response(),
        ("GET", "/api/chore-leaderboards/") => StatusCode::BAD_GATEWAY.into_response(),
        ("GET", "/api/arcade/status/") => Json(json!({
            "has_active_session": true,
            "session_id": 77,
            "instance_id": 1,
            "chore_name": "Dishes",
            "elapsed_seconds": 65
        }))
        .into_response(),
        ("POST", path) if path == "/api/complete/" => {
            (StatusCode::BAD_REQUEST, "Chore already completed").into_response()
        }
        ("POST", path) => {
            let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            backend.posted.lock().unwrap().push((path.to_string(), body));
            Json(json!({ "message": "ok" })).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_backend() -> (Arc<FakeBackend>, ChoreBoardHttpAdapter) {
    let backend = Arc::new(FakeBackend::default());
    let app = Router::new().fallback(handle).with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let adapter = ChoreBoardHttpAdapter::new(
        reqwest::Client::new(),
        &format!("http://{}/", addr),
        TokenSigner::new("bridge", "s3cret"),
        chrono_tz::UTC,
    );
    (backend, adapter)
}

fn sam() -> User {
    User {
        id: 2,
        username: "sam".to_string(),
        display_name: "Sam".to_string(),
        first_name: String::new(),
        can_be_assigned: true,
        eligible_for_points: true,
        weekly_points: 0.0,
        all_time_points: 0.0,
        claims_today: None,
    }
}

#[tokio::test]
async fn decodes_lists_and_skips_malformed_elements() {
    let (backend, adapter) = spawn_backend().await;

    let chores = adapter.outstanding_chores().await.unwrap();
    assert_eq!(chores.len(), 1);
    assert_eq!(chores[0].name, "Dishes");
    assert_eq!(chores[0].points, 15.0);
    assert_eq!(chores[0].status, Some(ChoreStatus::Assigned));
    assert_eq!(chores[0].assignee.as_ref().unwrap().display(), "Sam");

    assert!(adapter.late_chores().await.unwrap().is_empty());

    let users = adapter.users().await.unwrap();
    assert_eq!(users[0].weekly_points, 12.5);
    assert_eq!(users[0].display_name, "sam");

    let completions = adapter.recent_completions(7).await.unwrap();
    assert_eq!(completions[0].chore_name, "Vacuum");
    assert!(backend.queries.lock().unwrap().contains(&"limit=7".to_string()));

    assert_eq!(adapter.points_label().await.unwrap(), "stars");
}

#[tokio::test]
async fn every_request_carries_a_signed_token() {
    let (backend, adapter) = spawn_backend().await;
    adapter.users().await.unwrap();

    let tokens = backend.tokens.lock().unwrap();
    let token = tokens[0].strip_prefix("Bearer ").unwrap();
    let parts: Vec<&str> = token.split(':').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "bridge");
    assert!(parts[1].parse::<i64>().is_ok());
    assert_eq!(parts[2].len(), 64);
}

#[tokio::test]
async fn a_single_401_is_retried_with_a_fresh_token() {
    let (backend, adapter) = spawn_backend().await;
    backend.reject_next.store(1, Ordering::SeqCst);

    let users = adapter.users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(backend.tokens.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn a_second_401_is_unauthorized() {
    let (backend, adapter) = spawn_backend().await;
    backend.reject_next.store(5, Ordering::SeqCst);

    let err = adapter.users().await.unwrap_err();
    assert_eq!(err, PortError::Unauthorized);
    assert_eq!(backend.tokens.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn status_codes_map_to_port_errors() {
    let (_backend, adapter) = spawn_backend().await;

    assert!(matches!(
        adapter.chore_leaderboards().await,
        Err(PortError::Unavailable(_))
    ));

    let err = adapter
        .perform(&ChoreAction::Complete {
            instance_id: 1,
            helper_ids: Vec::new(),
            completed_by_user_id: None,
        })
        .await
        .unwrap_err();
    match err {
        PortError::Rejected(message) => assert!(message.contains("Chore already completed")),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter = ChoreBoardHttpAdapter::new(
        reqwest::Client::new(),
        &format!("http://{}", addr),
        TokenSigner::new("bridge", "s3cret"),
        chrono_tz::UTC,
    );
    assert!(matches!(adapter.users().await, Err(PortError::Unavailable(_))));
}

#[tokio::test]
async fn actions_post_their_bodies() {
    let (backend, adapter) = spawn_backend().await;

    adapter
        .perform(&ChoreAction::Claim {
            instance_id: 1,
            assign_to_user_id: Some(2),
        })
        .await
        .unwrap();
    adapter
        .perform(&ChoreAction::ApproveArcade {
            session_id: 77,
            judge_id: None,
            notes: Some("Clean".to_string()),
        })
        .await
        .unwrap();

    let posted = backend.posted.lock().unwrap();
    assert_eq!(
        posted[0],
        (
            "/api/claim/".to_string(),
            json!({ "instance_id": 1, "assign_to_user_id": 2 })
        )
    );
    assert_eq!(
        posted[1],
        (
            "/api/arcade/approve/".to_string(),
            json!({ "session_id": 77, "notes": "Clean" })
        )
    );
}

#[tokio::test]
async fn arcade_status_becomes_a_session() {
    let (backend, adapter) = spawn_backend().await;

    let session = adapter.arcade_session(&sam()).await.unwrap().unwrap();
    assert_eq!(session.session_id, Some(77));
    assert_eq!(session.elapsed_seconds, 65);
    assert_eq!(session.username, "sam");
    assert!(backend.queries.lock().unwrap().contains(&"user_id=2".to_string()));
}
