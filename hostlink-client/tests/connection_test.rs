//! ConnectionManager integration tests
//!
//! Request/response exchanges against a scripted host, including every way
//! a response can fail to arrive.

mod common;

use common::{error, split_bytes, success, MockHost, Reply};
use hostlink_client::{ClientBuilder, ConnectionManager, ConnectionState};
use hostlink_core::{Error, Params};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_success_returns_result() {
    let mut host = MockHost::answering(json!({"objects": 3})).await;
    let mut conn = ConnectionManager::new(host.config());

    let result = conn.send_command("get_scene_info", Params::new()).await.unwrap();
    assert_eq!(result, json!({"objects": 3}));
    assert_eq!(conn.state(), ConnectionState::Connected);

    let request = host.next_request().await.unwrap();
    assert_eq!(request, json!({"type": "get_scene_info", "params": {}}));
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let host = MockHost::answering(json!(null)).await;
    let mut conn = ConnectionManager::new(host.config());

    assert!(conn.connect().await);
    assert!(conn.connect().await);
    assert!(conn.is_connected());

    conn.send_command("ping", Params::new()).await.unwrap();
    assert_eq!(host.connections(), 1);
}

#[tokio::test]
async fn test_closed_before_data() {
    let host = MockHost::start(|_, _| Reply::Close).await;
    let mut conn = ConnectionManager::new(host.config());

    match conn.send_command("get_scene_info", Params::new()).await {
        Err(Error::ClosedBeforeData) => {}
        other => panic!("Expected ClosedBeforeData, got {:?}", other),
    }
    assert!(!conn.is_connected());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_partial_data_then_close_is_incomplete() {
    let host = MockHost::start(|_, _| Reply::Partial(br#"{"status": "succ"#.to_vec())).await;
    let mut conn = ConnectionManager::new(host.config());

    match conn.send_command("get_scene_info", Params::new()).await {
        Err(Error::IncompleteResponse) => {}
        other => panic!("Expected IncompleteResponse, got {:?}", other),
    }
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_silent_host_times_out() {
    let host = MockHost::start(|_, _| Reply::Silent).await;
    let mut conn = ConnectionManager::new(host.config().with_response_timeout(Duration::from_millis(200)));

    match conn.send_command("get_scene_info", Params::new()).await {
        Err(Error::Timeout) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_partial_data_then_timeout_is_incomplete() {
    let host = MockHost::start(|_, _| Reply::Stall(br#"{"status": "success", "resu"#.to_vec())).await;
    let mut conn = ConnectionManager::new(host.config().with_response_timeout(Duration::from_millis(200)));

    match conn.send_command("get_scene_info", Params::new()).await {
        Err(Error::IncompleteResponse) => {}
        other => panic!("Expected IncompleteResponse, got {:?}", other),
    }
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_remote_error_keeps_connection() {
    let host = MockHost::start(|_, request| {
        if request["type"] == "boom" {
            error("boom")
        } else {
            success(json!("ok"))
        }
    })
    .await;
    let mut conn = ConnectionManager::new(host.config());

    match conn.send_command("boom", Params::new()).await {
        Err(Error::Remote(message)) => assert_eq!(message, "boom"),
        other => panic!("Expected Remote error, got {:?}", other),
    }
    assert!(conn.is_connected());

    assert_eq!(conn.send_command("ping", Params::new()).await.unwrap(), json!("ok"));
    assert_eq!(host.connections(), 1);
}

#[tokio::test]
async fn test_reconnects_after_transport_error() {
    let host = MockHost::start(|connection, _| {
        if connection == 0 {
            Reply::Close
        } else {
            success(json!({"connection": connection}))
        }
    })
    .await;
    let mut conn = ConnectionManager::new(host.config());

    assert!(matches!(
        conn.send_command("get_scene_info", Params::new()).await,
        Err(Error::ClosedBeforeData)
    ));

    let result = conn.send_command("get_scene_info", Params::new()).await.unwrap();
    assert_eq!(result, json!({"connection": 1}));
    assert_eq!(host.connections(), 2);
    assert!(conn.is_connected());
}

#[tokio::test]
async fn test_response_split_across_writes() {
    let result = json!({
        "objects": (0..200).map(|i| json!({"name": format!("Object.{:03}", i), "location": [i, 0, 1]})).collect::<Vec<_>>()
    });
    let body = serde_json::to_vec(&json!({"status": "success", "result": result.clone()})).unwrap();
    let pieces = split_bytes(&body, 5);

    let host = MockHost::start(move |_, _| Reply::Chunks(pieces.clone())).await;
    let mut conn = ConnectionManager::new(host.config());

    assert_eq!(conn.send_command("get_scene_info", Params::new()).await.unwrap(), result);
}

#[tokio::test]
async fn test_nested_json_round_trip() {
    let host = MockHost::start(|_, request| success(request["params"].clone())).await;
    let mut conn = ConnectionManager::new(host.config());

    let nested = json!({
        "name": "Cube",
        "transform": {"location": [1.5, -2.0, 0.0], "rotation": [0, 0, 90], "scale": [1, 1, 1]},
        "modifiers": [{"type": "BEVEL", "width": 0.02}, {"type": "SUBSURF", "levels": 2}],
        "material": null,
        "visible": true,
        "label": "Ünïcødé 材料"
    });
    let result = conn.send_command("modify_object", params(nested.clone())).await.unwrap();
    assert_eq!(result, nested);
}

#[derive(Debug, Serialize)]
struct MoveParams {
    name: String,
    location: [f64; 3],
}

#[derive(Debug, Deserialize, PartialEq)]
struct Moved {
    name: String,
    location: [f64; 3],
}

#[tokio::test]
async fn test_send_typed() {
    let host = MockHost::start(|_, request| success(request["params"].clone())).await;
    let mut conn = ClientBuilder::from_config(host.config()).build().unwrap();

    let moved: Moved = conn
        .send_typed(
            "modify_object",
            &MoveParams {
                name: "Cube".to_string(),
                location: [1.0, 2.0, 3.0],
            },
        )
        .await
        .unwrap();

    assert_eq!(
        moved,
        Moved {
            name: "Cube".to_string(),
            location: [1.0, 2.0, 3.0],
        }
    );
}

#[tokio::test]
async fn test_send_typed_rejects_non_object_params() {
    let host = MockHost::answering(json!(null)).await;
    let mut conn = ConnectionManager::new(host.config());

    let result: hostlink_core::Result<Value> = conn.send_typed("ping", &[1, 2, 3]).await;
    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[tokio::test]
async fn test_malformed_response_is_protocol_error() {
    let host = MockHost::start(|_, _| Reply::Json(json!({"result": 1}))).await;
    let mut conn = ConnectionManager::new(host.config());

    match conn.send_command("ping", Params::new()).await {
        Err(Error::Protocol(_)) => {}
        other => panic!("Expected Protocol error, got {:?}", other),
    }
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_requests_are_sent_one_at_a_time() {
    let answered = std::sync::Arc::new(AtomicUsize::new(0));
    let counter = std::sync::Arc::clone(&answered);
    let mut host = MockHost::start(move |_, _| success(json!(counter.fetch_add(1, Ordering::SeqCst))))
        .await;
    let mut conn = ConnectionManager::new(host.config());

    for expected in 0..5 {
        let result = conn.send_command("next", Params::new()).await.unwrap();
        assert_eq!(result, json!(expected));
    }

    assert_eq!(answered.load(Ordering::SeqCst), 5);
    assert_eq!(host.drain_requests().len(), 5);
}
