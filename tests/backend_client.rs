use mcp_tinybird::backend::TinybirdClient;
use mcp_tinybird::core::errors::BackendError;
use mcp_tinybird::core::traits::AnalyticsBackend;
use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Write;

fn client_for(server: &Server) -> TinybirdClient {
    TinybirdClient::new(
        &server.url(),
        Some("p.test-token".to_string()),
        &format!("{}/docs/llms.txt", server.url()),
        5,
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_pipes_passes_token_and_attrs() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v0/pipes")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "p.test-token".into()),
            Matcher::UrlEncoded("attrs".into(), "id,name,description,type,endpoint".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "pipes": [
                    {"type": "endpoint", "id": "t_1", "name": "top_products", "description": null, "endpoint": "t_e1"},
                    {"type": "copy", "id": "t_2", "name": "snapshot", "description": null, "endpoint": null},
                    {"type": "endpoint", "id": "t_3", "name": "sales_by_day", "description": "daily", "endpoint": "t_e3"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let pipes = client_for(&server).list_pipes().await.unwrap();
    mock.assert_async().await;

    assert_eq!(pipes.len(), 3);
    assert_eq!(pipes.iter().filter(|p| p.is_endpoint()).count(), 2);
}

#[tokio::test]
async fn test_non_success_status_carries_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v0/datasources/events")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("{\"error\": \"invalid token\"}")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_data_source("events")
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("invalid token"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_select_query_appends_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v0/sql")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "SELECT count() FROM events FORMAT JSON".into(),
        ))
        .with_status(200)
        .with_body(json!({"data": [{"count()": 42}], "rows": 1}).to_string())
        .create_async()
        .await;

    let result = client_for(&server)
        .run_select_query("SELECT count() FROM events")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(result["data"][0]["count()"], 42);
}

#[tokio::test]
async fn test_pipe_data_keeps_meta_and_data() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v0/pipes/top_products.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "5".into()),
            Matcher::UrlEncoded("token".into(), "p.test-token".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({"meta": [{"name": "sku", "type": "String"}], "data": [{"sku": "a"}], "statistics": {}})
                .to_string(),
        )
        .create_async()
        .await;

    let data = client_for(&server)
        .get_pipe_data("top_products", &[("limit".to_string(), "5".to_string())])
        .await
        .unwrap();
    assert_eq!(data.meta.len(), 1);
    assert_eq!(data.data[0]["sku"], "a");
}

#[tokio::test]
async fn test_save_event_posts_ndjson() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v0/events")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "prompts".into()),
            Matcher::UrlEncoded("token".into(), "p.test-token".into()),
        ]))
        .match_body("{\"name\":\"churn\"}")
        .with_status(202)
        .with_body("{\"successful_rows\":1,\"quarantined_rows\":0}")
        .create_async()
        .await;

    let text = client_for(&server)
        .save_event("prompts", "{\"name\":\"churn\"}")
        .await
        .unwrap();
    mock.assert_async().await;
    assert!(text.contains("successful_rows"));
}

#[tokio::test]
async fn test_push_datafile_by_extension() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v0/datasources")
        .match_query(Matcher::UrlEncoded("name".into(), "events".into()))
        .with_status(200)
        .with_body("{\"datasource\": {\"name\": \"events\"}}")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.datasource");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "SCHEMA >\n    `ts` DateTime `json:$.ts`").unwrap();

    let client = client_for(&server);
    let text = client.push_datafile(&path).await.unwrap();
    mock.assert_async().await;
    assert!(text.contains("events"));

    let bad = dir.path().join("events.csv");
    std::fs::write(&bad, "a,b").unwrap();
    assert!(matches!(
        client.push_datafile(&bad).await,
        Err(BackendError::Input(_))
    ));
}

#[tokio::test]
async fn test_docs_fetch_is_unauthenticated() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/docs/llms.txt")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_body("# Tinybird")
        .create_async()
        .await;

    let text = client_for(&server).fetch_docs().await.unwrap();
    mock.assert_async().await;
    assert_eq!(text, "# Tinybird");
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let client = TinybirdClient::new("http://127.0.0.1:1", None, "http://127.0.0.1:1", 2).unwrap();
    let err = client.list_data_sources().await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::Transport(_) | BackendError::Timeout(_)
    ));
}

#[tokio::test]
async fn test_ids_stay_inside_one_path_segment() {
    let mut server = Server::new_async().await;
    let listing = server
        .mock("GET", "/v0/pipes")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let pipe = server
        .mock("GET", "/v0/pipes/top%2F..%2Fsecret%3Fx%23y")
        .match_query(Matcher::UrlEncoded("token".into(), "p.test-token".into()))
        .with_status(200)
        .with_body(json!({"id": "t_1"}).to_string())
        .create_async()
        .await;
    let explain = server
        .mock("GET", "/v0/pipes/a%2Fb/explain")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = client_for(&server);
    let body = client.get_pipe("top/../secret?x#y").await.unwrap();
    assert_eq!(body["id"], "t_1");
    client.explain_pipe("a/b").await.unwrap();

    for id in ["..", ".", ""] {
        let err = client.get_pipe(id).await.unwrap_err();
        assert!(matches!(err, BackendError::Input(_)), "{:?}", id);
    }

    pipe.assert_async().await;
    explain.assert_async().await;
    listing.assert_async().await;
}
