//! HTTP surface tests: the router served on a local port, backed by a fake port.

use async_trait::async_trait;
use bridge_lib::config::Config;
use bridge_lib::coordinator::{Coordinator, CoordinatorSettings};
use bridge_lib::web::{self, state::AppState};
use choreboard_core::domain::{
    ArcadeSession, Chore, ChoreAction, ChoreLeaderboard, ChoreStatus, Completion, User,
};
use choreboard_core::ports::{ChoreBoardService, PortError, PortResult};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeApi {
    performed: Mutex<Vec<ChoreAction>>,
}

#[async_trait]
impl ChoreBoardService for FakeApi {
    async fn outstanding_chores(&self) -> PortResult<Vec<Chore>> {
        Ok(vec![Chore {
            id: 3,
            name: "Water plants".to_string(),
            description: String::new(),
            assignee: None,
            due_at: None,
            points: 2.0,
            status: Some(ChoreStatus::Pool),
            is_pool: true,
            complete_later: false,
            last_completion: None,
        }])
    }

    async fn late_chores(&self) -> PortResult<Vec<Chore>> {
        Ok(Vec::new())
    }

    async fn users(&self) -> PortResult<Vec<User>> {
        Ok(Vec::new())
    }

    async fn recent_completions(&self, _limit: usize) -> PortResult<Vec<Completion>> {
        Ok(Vec::new())
    }

    async fn points_label(&self) -> PortResult<String> {
        Ok("points".to_string())
    }

    async fn chore_leaderboards(&self) -> PortResult<Vec<ChoreLeaderboard>> {
        Ok(Vec::new())
    }

    async fn arcade_session(&self, _user: &User) -> PortResult<Option<ArcadeSession>> {
        Ok(None)
    }

    async fn perform(&self, action: &ChoreAction) -> PortResult<()> {
        if action.target_id() == 404 {
            return Err(PortError::Rejected("400 Bad Request: no such chore".to_string()));
        }
        self.performed.lock().unwrap().push(action.clone());
        Ok(())
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    api: Arc<FakeApi>,
    coordinator: Arc<Coordinator>,
}

async fn serve(api_key: Option<&str>) -> TestServer {
    let mut vars = vec![
        ("CHOREBOARD_URL", "http://choreboard.invalid"),
        ("CHOREBOARD_USERNAME", "bridge"),
        ("CHOREBOARD_SECRET_KEY", "s3cret"),
        ("MONITORED_USERS", "sam"),
    ];
    if let Some(key) = api_key {
        vars.push(("BRIDGE_API_KEY", key));
    }
    let config = Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap();

    let api = Arc::new(FakeApi::default());
    let coordinator = Coordinator::new(
        api.clone(),
        CoordinatorSettings {
            monitored_users: config.monitored_users.clone(),
            time_zone: config.time_zone,
            completions_limit: config.completions_limit,
            scan_interval: config.scan_interval,
        },
    );
    let app = web::router(Arc::new(AppState {
        coordinator: coordinator.clone(),
        config: Arc::new(config),
    }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        api,
        coordinator,
    }
}

#[tokio::test]
async fn sensors_are_unavailable_until_the_first_refresh() {
    let server = serve(None).await;

    let response = server
        .client
        .get(format!("{}/sensors", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    server.coordinator.refresh().await.unwrap();

    let sensors: Vec<Value> = server
        .client
        .get(format!("{}/sensors", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = sensors.iter().filter_map(|s| s["id"].as_str()).collect();
    assert!(ids.contains(&"pool_chores"));
    assert!(ids.contains(&"sam_my_immediate_chores"));

    let pool: Value = server
        .client
        .get(format!("{}/sensors/pool_chores", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pool["state"], json!(1));
    assert_eq!(pool["attributes"]["chores"][0]["name"], json!("Water plants"));

    let missing = server
        .client
        .get(format!("{}/sensors/nope", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_reports_the_last_success() {
    let server = serve(None).await;
    server.coordinator.refresh().await.unwrap();

    let status: Value = server
        .client
        .get(format!("{}/status", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["available"], json!(true));
    assert_eq!(status["needs_reconfiguration"], json!(false));
    assert!(status["last_success"].is_string());
    assert!(status["last_error"].is_null());
}

#[tokio::test]
async fn service_calls_require_the_api_key_when_configured() {
    let server = serve(Some("letmein")).await;
    let url = format!("{}/services/claim_chore", server.base);

    let anonymous = server
        .client
        .post(&url)
        .json(&json!({ "chore_id": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let authorized = server
        .client
        .post(&url)
        .bearer_auth("letmein")
        .json(&json!({ "chore_id": 3, "assign_to_user_id": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);
    assert_eq!(
        *server.api.performed.lock().unwrap(),
        vec![ChoreAction::Claim {
            instance_id: 3,
            assign_to_user_id: Some(2),
        }]
    );
    // The write was followed by a refresh.
    assert!(server.coordinator.current().await.is_some());

    let lowercase = server
        .client
        .post(format!("{}/refresh", server.base))
        .header("Authorization", "bearer letmein")
        .send()
        .await
        .unwrap();
    assert_eq!(lowercase.status(), StatusCode::ACCEPTED);

    let wrong = server
        .client
        .post(format!("{}/refresh", server.base))
        .bearer_auth("letmeout")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_and_rejected_calls_map_to_client_and_gateway_errors() {
    let server = serve(None).await;

    let missing = server
        .client
        .post(format!("{}/services/stop_arcade", server.base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = server
        .client
        .post(format!("{}/services/water_plants", server.base))
        .json(&json!({ "chore_id": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let rejected = server
        .client
        .post(format!("{}/services/mark_complete", server.base))
        .json(&json!({ "chore_id": 404 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_GATEWAY);
    assert!(rejected.text().await.unwrap().contains("no such chore"));
    assert!(server.api.performed.lock().unwrap().is_empty());
}
