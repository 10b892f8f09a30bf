//! HTTP control surface

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use light_timers::create_router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Room;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn create_list_and_delete() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    let app = create_router(client.state.clone());

    let (status, created) = call(&app, "POST", "/timers", Some(json!({ "name": "Torch", "durationMs": 61000 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "ok");
    let id = created["timers"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(created["timers"][0]["remaining"], "1:01");
    assert_eq!(created["timers"][0]["running"], true);

    let (status, listed) = call(&app, "GET", "/timers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["owners"][0]["name"], "Aria");
    assert_eq!(listed["owners"][0]["timers"][0]["id"], id.as_str());
    assert_eq!(listed["lastAction"], "create");

    let (status, _) = call(&app, "DELETE", &format!("/timers/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, missing) = call(&app, "DELETE", &format!("/timers/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["status"], "error");
}

#[tokio::test]
async fn short_duration_is_a_bad_request() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    let app = create_router(client.state.clone());

    let (status, body) = call(&app, "POST", "/timers", Some(json!({ "durationMs": 10 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = call(&app, "POST", "/timers", Some(json!({ "durationMs": i64::MAX }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pause_and_start_by_owner() {
    let room = Room::new();
    let aria = room.join("p1", "Aria");
    let bram = room.join("p2", "Bram");
    aria.state.create_timer(None, 60_000).await.unwrap();
    bram.state.create_timer(None, 60_000).await.unwrap();
    let app = create_router(aria.state.clone());

    let (status, paused) = call(&app, "POST", "/timers/pause?owner=p2", None).await;
    assert_eq!(status, StatusCode::OK);
    let running: Vec<bool> = paused["timers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["running"].as_bool().unwrap())
        .collect();
    assert_eq!(running, vec![true, false]);

    room.clock.advance(5_000);
    let (_, started) = call(&app, "POST", "/timers/start", None).await;
    assert_eq!(started["timers"][1]["running"], true);
    assert_eq!(started["timers"][1]["remainingMs"], 60_000);
}

#[tokio::test]
async fn panel_toggle_and_health() {
    let room = Room::new();
    let client = room.join("p1", "Aria");
    let app = create_router(client.state.clone());

    let (status, _) = call(&app, "POST", "/panel/open", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(client.state.is_panel_open());

    call(&app, "POST", "/panel/close", None).await;
    assert!(!client.state.is_panel_open());

    let (status, health) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}
