mod common;

use common::*;
use mcp_tinybird::core::models::OutboundMessage;
use mcp_tinybird::core::session::SessionState;
use serde_json::{json, Value};
use std::sync::Arc;

async fn call(
    session: &mut mcp_tinybird::core::session::Session,
    rx: &mut tokio::sync::mpsc::Receiver<OutboundMessage>,
    msg: Value,
) -> Value {
    session.handle_message(msg).await.unwrap();
    frame_json(&rx.recv().await.unwrap())
}

#[tokio::test]
async fn test_handshake_moves_through_states() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = session(ctx);
    assert_eq!(session.state(), SessionState::Uninitialized);

    let resp = call(&mut session, &mut rx, initialize_request(1)).await;
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "mcp-tinybird");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
    assert_eq!(session.state(), SessionState::Negotiated);

    session
        .handle_message(initialized_notification())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert!(rx.try_recv().is_err(), "notifications get no reply");
}

#[tokio::test]
async fn test_requests_before_initialized_are_rejected() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = session(ctx);

    let resp = call(&mut session, &mut rx, request(1, "tools/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32600);

    let resp = call(&mut session, &mut rx, request(2, "ping", json!({}))).await;
    assert_eq!(resp["result"], json!({}));
}

#[tokio::test]
async fn test_second_initialize_is_invalid() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = active_session(ctx).await;
    let resp = call(&mut session, &mut rx, initialize_request(9)).await;
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn test_unknown_version_negotiates_latest() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = session(ctx);
    let mut init = initialize_request(1);
    init["params"]["protocolVersion"] = json!("1999-01-01");
    let resp = call(&mut session, &mut rx, init).await;
    assert_eq!(resp["result"]["protocolVersion"], "2025-06-18");
}

#[tokio::test]
async fn test_list_tools_matches_catalog() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = active_session(ctx).await;
    let resp = call(&mut session, &mut rx, request(1, "tools/list", json!({}))).await;
    let tools = resp["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 11);
    assert!(tools.iter().any(|t| t["name"] == "append-insight"));
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
}

#[tokio::test]
async fn test_unknown_tool_never_reaches_backend() {
    let backend = Arc::new(MockBackend::new());
    let ctx = context(Arc::clone(&backend));
    let (mut session, mut rx) = active_session(ctx).await;

    let resp = call(
        &mut session,
        &mut rx,
        request(1, "tools/call", json!({"name": "drop-everything", "arguments": {}})),
    )
    .await;

    assert_eq!(resp["error"]["code"], -32602);
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Unknown tool"));
    assert_eq!(backend.call_count(), 0);
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn test_list_pipes_returns_only_endpoints() {
    let backend = Arc::new(MockBackend::with_pipes(vec![
        pipe("top_products", "endpoint"),
        pipe("raw_copy", "copy"),
        pipe("mv_daily", "materialized"),
    ]));
    let ctx = context(Arc::clone(&backend));
    let (mut session, mut rx) = active_session(ctx).await;

    let resp = call(
        &mut session,
        &mut rx,
        request(1, "tools/call", json!({"name": "list-pipes"})),
    )
    .await;

    let content = &resp["result"]["content"];
    assert_eq!(content.as_array().unwrap().len(), 1);
    assert_eq!(content[0]["type"], "text");
    let pipes: Vec<Value> = serde_json::from_str(content[0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(pipes.len(), 1);
    assert_eq!(pipes[0]["name"], "top_products");
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_append_insight_notifies_before_response() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = active_session(Arc::clone(&ctx)).await;

    for (i, insight) in ["A", "B"].iter().enumerate() {
        session
            .handle_message(request(
                10 + i as u64,
                "tools/call",
                json!({"name": "append-insight", "arguments": {"insight": insight}}),
            ))
            .await
            .unwrap();

        let first = frame_json(&rx.recv().await.unwrap());
        assert_eq!(first["method"], "notifications/resources/updated");
        assert_eq!(first["params"]["uri"], "tinybird://insights");

        let second = frame_json(&rx.recv().await.unwrap());
        assert_eq!(second["id"], 10 + i as u64);
        assert_eq!(second["result"]["content"][0]["text"], "Insight added to memo");
    }

    let resp = call(
        &mut session,
        &mut rx,
        request(20, "resources/read", json!({"uri": "tinybird://insights"})),
    )
    .await;
    let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
    assert!(text.contains("- A\n- B"));
    assert!(text.ends_with("Analysis has revealed 2 key insights."));
    assert_eq!(ctx.memo.entries(), vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn test_append_insight_without_argument_is_bad_request() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = active_session(Arc::clone(&ctx)).await;

    let resp = call(
        &mut session,
        &mut rx,
        request(1, "tools/call", json!({"name": "append-insight", "arguments": {}})),
    )
    .await;

    assert_eq!(resp["error"]["code"], -32602);
    assert!(ctx.memo.is_empty());
    assert!(rx.try_recv().is_err(), "no notification on failure");
}

#[tokio::test]
async fn test_backend_failure_is_per_request() {
    let backend = Arc::new(MockBackend::failing(403));
    let ctx = context(backend);
    let (mut session, mut rx) = active_session(ctx).await;

    let resp = call(
        &mut session,
        &mut rx,
        request(1, "tools/call", json!({"name": "get-pipe", "arguments": {"pipe_id": "p"}})),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32000);
    assert!(resp["error"]["message"].as_str().unwrap().contains("403"));

    let resp = call(&mut session, &mut rx, request(2, "resources/list", json!({}))).await;
    assert_eq!(resp["result"]["resources"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_save_event_forwards_raw_payload() {
    let backend = Arc::new(MockBackend::new());
    let ctx = context(Arc::clone(&backend));
    let (mut session, mut rx) = active_session(ctx).await;

    let resp = call(
        &mut session,
        &mut rx,
        request(
            1,
            "tools/call",
            json!({"name": "save-event", "arguments": {"datasource_name": "prompts", "data": "{\"name\":\"x\"}"}}),
        ),
    )
    .await;
    assert!(resp["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("successful_rows"));
    let events = backend.events.lock().unwrap();
    assert_eq!(events[0], ("prompts".to_string(), "{\"name\":\"x\"}".to_string()));
}

#[tokio::test]
async fn test_read_resource_not_found() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = active_session(ctx).await;

    for uri in ["file:///etc/passwd", "tinybird://secrets"] {
        let resp = call(
            &mut session,
            &mut rx,
            request(1, "resources/read", json!({ "uri": uri })),
        )
        .await;
        assert_eq!(resp["error"]["code"], -32002, "{}", uri);
    }

    let resp = call(
        &mut session,
        &mut rx,
        request(2, "resources/read", json!({"uri": "tinybird://datasource-definition-context"})),
    )
    .await;
    assert!(resp["result"]["contents"][0]["text"]
        .as_str()
        .unwrap()
        .contains("ENGINE"));
}

#[tokio::test]
async fn test_prompt_fetch_failure_leaves_default_only() {
    let backend = Arc::new(MockBackend::new());
    let ctx = context(Arc::clone(&backend));
    ctx.registry.prompts().refresh(backend.as_ref()).await;

    let (mut session, mut rx) = active_session(ctx).await;
    let resp = call(&mut session, &mut rx, request(1, "prompts/list", json!({}))).await;
    let prompts = resp["result"]["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["name"], "tinybird-default");
    assert_eq!(prompts[0]["arguments"].as_array().unwrap().len(), 1);
    assert_eq!(prompts[0]["arguments"][0]["name"], "topic");
    assert_eq!(
        prompts[0]["arguments"][0]["description"],
        "The topic of the data you want to explore"
    );
    assert_eq!(prompts[0]["arguments"][0]["required"], true);
}

#[tokio::test]
async fn test_remote_prompts_are_merged() {
    let backend = Arc::new(MockBackend {
        prompt_rows: Some(json!({
            "data": [
                {"name": "churn", "description": "Churn analysis", "prompt": "Study churn in {region}", "arguments": ["region"], "timestamp": "2024-12-01 00:00:00"}
            ]
        })),
        ..MockBackend::default()
    });
    let ctx = context(Arc::clone(&backend));
    ctx.registry.prompts().refresh(backend.as_ref()).await;

    let (mut session, mut rx) = active_session(ctx).await;
    let resp = call(&mut session, &mut rx, request(1, "prompts/list", json!({}))).await;
    let names: Vec<_> = resp["result"]["prompts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["churn", "tinybird-default"]);

    let resp = call(
        &mut session,
        &mut rx,
        request(2, "prompts/get", json!({"name": "churn", "arguments": {"region": "EMEA"}})),
    )
    .await;
    assert_eq!(
        resp["result"]["messages"][0]["content"]["text"],
        "Study churn in EMEA"
    );
    assert_eq!(resp["result"]["messages"][0]["role"], "user");
}

#[tokio::test]
async fn test_null_prompt_columns_keep_other_prompts() {
    let backend = Arc::new(MockBackend {
        prompt_rows: Some(json!({
            "data": [
                {"name": "sales", "description": "Sales review", "prompt": "Sales in {region}", "arguments": ["region"]},
                {"name": "churn", "description": null, "prompt": "Study churn", "arguments": null},
                {"description": "row without a name", "prompt": "x"}
            ]
        })),
        ..MockBackend::default()
    });
    let ctx = context(Arc::clone(&backend));
    ctx.registry.prompts().refresh(backend.as_ref()).await;

    let (mut session, mut rx) = active_session(ctx).await;
    let resp = call(&mut session, &mut rx, request(1, "prompts/list", json!({}))).await;
    let prompts = resp["result"]["prompts"].as_array().unwrap();
    let names: Vec<_> = prompts
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["sales", "churn", "tinybird-default"]);
    assert_eq!(prompts[1]["description"], "");
    assert!(prompts[1]["arguments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_prompt_errors() {
    let backend = Arc::new(MockBackend {
        prompt_rows: Some(json!({
            "data": [{"name": "broken", "description": "", "prompt": "Needs {other}", "arguments": []}]
        })),
        ..MockBackend::default()
    });
    let ctx = context(Arc::clone(&backend));
    ctx.registry.prompts().refresh(backend.as_ref()).await;
    let (mut session, mut rx) = active_session(ctx).await;

    let resp = call(
        &mut session,
        &mut rx,
        request(1, "prompts/get", json!({"name": "missing"})),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32002);

    let resp = call(
        &mut session,
        &mut rx,
        request(2, "prompts/get", json!({"name": "broken"})),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32603);
}

#[tokio::test]
async fn test_protocol_errors() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, mut rx) = active_session(ctx).await;

    let resp = call(&mut session, &mut rx, request(1, "sampling/createMessage", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);

    session.handle_bytes(b"{not json").await.unwrap();
    let resp = frame_json(&rx.recv().await.unwrap());
    assert_eq!(resp["error"]["code"], -32700);
    assert_eq!(resp["id"], Value::Null);

    // Client responses and unknown notifications are ignored.
    session
        .handle_message(json!({"jsonrpc": "2.0", "id": 5, "result": {}}))
        .await
        .unwrap();
    session
        .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/progress"}))
        .await
        .unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_closed_session_rejects_frames() {
    let ctx = context(Arc::new(MockBackend::new()));
    let (mut session, rx) = active_session(ctx).await;
    drop(rx);

    let err = session
        .handle_message(request(1, "tools/list", json!({})))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(session.state(), SessionState::Closed);

    assert!(session
        .handle_message(request(2, "ping", json!({})))
        .await
        .is_err());
}
