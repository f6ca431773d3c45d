//! End-to-end tests of the HTTP surface.

use reqwest::StatusCode;
use serde_json::Value;

use service_scaffold::health::status::{ACCEPTING_REQUESTS, STARTING};
use service_scaffold::DrainOutcome;

mod common;

#[tokio::test]
async fn concurrent_hello_requests() {
    let (server, _) = common::start_server(common::test_config()).await;
    let client = common::client();
    let url = common::url(server.local_addr(), "/api/v1/");

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move {
                let res = client.get(url).send().await.unwrap();
                let status = res.status();
                let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
                let body: Value = res.json().await.unwrap();
                (status, content_type, body)
            })
        })
        .collect();

    for task in tasks {
        let (status, content_type, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/json");
        assert_eq!(body, Value::String("Hello World!".into()));
    }

    server.shutdown_handle().trigger();
    assert_eq!(server.run_until_shutdown().await.unwrap(), DrainOutcome::Graceful);
}

#[tokio::test]
async fn fault_endpoint_is_isolated() {
    let (server, _) = common::start_server(common::test_config()).await;
    let client = common::client();
    let addr = server.local_addr();

    for _ in 0..3 {
        let res = client.get(common::url(addr, "/api/v2/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = client.post(common::url(addr, "/api/v2/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = client.get(common::url(addr, "/api/v1/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    server.shutdown_handle().trigger();
    server.run_until_shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_paths_return_empty_404() {
    let (server, _) = common::start_server(common::test_config()).await;
    let client = common::client();

    for path in ["/", "/api/", "/api/v1/unknown", "/api/v9/", "/static/app.js"] {
        let res = client
            .get(common::url(server.local_addr(), path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
        assert!(res.bytes().await.unwrap().is_empty(), "{path}");
    }

    server.shutdown_handle().trigger();
    server.run_until_shutdown().await.unwrap();
}

#[tokio::test]
async fn wrong_method_on_known_path_returns_empty_404() {
    let (server, _) = common::start_server(common::test_config()).await;
    let client = common::client();
    let addr = server.local_addr();

    let post = client.post(common::url(addr, "/api/v1/")).send().await.unwrap();
    assert_eq!(post.status(), StatusCode::NOT_FOUND);
    assert!(post.bytes().await.unwrap().is_empty());

    let delete = client
        .delete(common::url(addr, "/api/v1/health/full"))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
    assert!(delete.bytes().await.unwrap().is_empty());

    server.shutdown_handle().trigger();
    server.run_until_shutdown().await.unwrap();
}

#[tokio::test]
async fn health_reports_accepting_requests_while_serving() {
    let (server, _) = common::start_server(common::test_config()).await;

    let res = common::client()
        .get(common::url(server.local_addr(), "/api/v1/health/full"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let entries: Vec<Value> = res.json().await.unwrap();
    let messages: Vec<_> = entries
        .iter()
        .map(|e| e["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, vec![STARTING, ACCEPTING_REQUESTS]);
    assert!(entries.iter().all(|e| e["timestamp"].is_string()));

    server.shutdown_handle().trigger();
    server.run_until_shutdown().await.unwrap();
}

#[tokio::test]
async fn responses_carry_request_id() {
    let (server, _) = common::start_server(common::test_config()).await;

    let res = common::client()
        .get(common::url(server.local_addr(), "/api/v1/"))
        .send()
        .await
        .unwrap();
    let id = res.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);

    server.shutdown_handle().trigger();
    server.run_until_shutdown().await.unwrap();
}
