//! Integration tests for the task REST API.
//! Spins up the real router on a random port with a tempdir database and
//! drives the HTTP surface with reqwest.

use serde_json::{json, Value};
use std::sync::Arc;
use taskd::{config::ServiceConfig, rest, storage::Storage, tasks::TaskStorage, AppContext};
use tempfile::TempDir;

/// Build the full AppContext over a fresh tempdir database and serve it on an
/// ephemeral port. Returns the base URL.
async fn start_test_server(dir: &TempDir) -> String {
    let data_dir = dir.path().to_path_buf();
    let config = Arc::new(ServiceConfig::new(
        None,
        Some(data_dir.clone()),
        Some("error".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(&data_dir).await.unwrap());
    let tasks = Arc::new(TaskStorage::new(storage.pool()));
    let ctx = Arc::new(AppContext {
        config,
        storage,
        tasks,
        started_at: std::time::Instant::now(),
    });

    let router = rest::build_router(ctx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn create_task(client: &reqwest::Client, base: &str, body: Value) -> Value {
    let res = client
        .post(format!("{base}/task/"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201, "create should return 201");
    res.json().await.unwrap()
}

#[tokio::test]
async fn create_fetch_delete_roundtrip() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({"title": "Test"})).await;
    assert_eq!(created["title"], "Test");
    assert_eq!(created["description"], Value::Null);
    assert_eq!(created["completed"], false);
    assert!(created["id"].is_i64());
    assert!(!created["created_at"].as_str().unwrap().is_empty());

    let id = created["id"].as_i64().unwrap();

    // Fetch returns the identical representation.
    let res = client.get(format!("{base}/task/{id}")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, created);

    // Delete acknowledges with 204 and no body.
    let res = client
        .delete(format!("{base}/task/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 204);
    assert!(res.text().await.unwrap().is_empty());

    // The task is gone.
    let res = client.get(format!("{base}/task/{id}")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Task not found");

    // Deleting again reports the same absence.
    let res = client
        .delete(format!("{base}/task/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn collection_answers_with_and_without_trailing_slash() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    // Canonical trailing-slash form.
    create_task(&client, &base, json!({"title": "With slash"})).await;

    // Bare alias.
    let res = client
        .post(format!("{base}/task"))
        .json(&json!({"title": "Without slash"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);

    for path in ["/task/", "/task"] {
        let res = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 200, "GET {path} should list tasks");
        let listed: Value = res.json().await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn create_without_title_is_rejected() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/task/"))
        .json(&json!({"description": "no title"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 422);
}

#[tokio::test]
async fn title_length_boundary() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/task/"))
        .json(&json!({"title": "a".repeat(120)}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);

    let res = client
        .post(format!("{base}/task/"))
        .json(&json!({"title": "a".repeat(121)}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 422);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn empty_list_returns_404() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base}/task/")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "The tasks list is empty.");
}

#[tokio::test]
async fn list_filters_by_title_case_insensitive() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    create_task(&client, &base, json!({"title": "Buy milk"})).await;
    create_task(&client, &base, json!({"title": "Walk dog"})).await;

    let res = client
        .get(format!("{base}/task/"))
        .query(&[("title", "MILK")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let list: Vec<Value> = res.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Buy milk");

    // A filter matching nothing behaves like an empty list.
    let res = client
        .get(format!("{base}/task/"))
        .query(&[("title", "zzz")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "The tasks list is empty.");
}

#[tokio::test]
async fn list_paginates_with_offset_and_limit() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    for i in 1..=3 {
        create_task(&client, &base, json!({"title": format!("task {i}")})).await;
    }

    let res = client
        .get(format!("{base}/task/"))
        .query(&[("limit", "2")])
        .send()
        .await
        .unwrap();
    let page: Vec<Value> = res.json().await.unwrap();
    assert_eq!(page.len(), 2);

    let res = client
        .get(format!("{base}/task/"))
        .query(&[("offset", "2")])
        .send()
        .await
        .unwrap();
    let rest_page: Vec<Value> = res.json().await.unwrap();
    assert_eq!(rest_page.len(), 1);
    assert_eq!(rest_page[0]["title"], "task 3");

    // Paging past the end exposes the empty-list contract.
    let res = client
        .get(format!("{base}/task/"))
        .query(&[("offset", "10")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn put_keeps_fields_absent_from_payload() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let created = create_task(
        &client,
        &base,
        json!({"title": "original", "description": "keep me", "completed": true}),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .put(format!("{base}/task/{id}"))
        .json(&json!({"title": "renamed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["title"], "renamed");
    assert_eq!(updated["description"], "keep me");
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["created_at"], created["created_at"]);
}

#[tokio::test]
async fn put_clears_description_on_explicit_null() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let created = create_task(
        &client,
        &base,
        json!({"title": "t", "description": "old"}),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .put(format!("{base}/task/{id}"))
        .json(&json!({"title": "t", "description": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["description"], Value::Null);
}

#[tokio::test]
async fn put_missing_task_returns_404() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{base}/task/999"))
        .json(&json!({"title": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn patch_touches_only_provided_fields() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let created = create_task(
        &client,
        &base,
        json!({"title": "t", "description": "d"}),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .patch(format!("{base}/task/{id}"))
        .json(&json!({"completed": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["title"], created["title"]);
    assert_eq!(updated["description"], created["description"]);
    assert_eq!(updated["created_at"], created["created_at"]);
}

#[tokio::test]
async fn patch_normalizes_created_at_override_to_utc() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({"title": "t"})).await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .patch(format!("{base}/task/{id}"))
        .json(&json!({"created_at": "2024-05-01T10:00:00+02:00"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["created_at"], "2024-05-01T08:00:00+00:00");
}

#[tokio::test]
async fn patch_rejects_malformed_created_at() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let created = create_task(&client, &base, json!({"title": "t"})).await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .patch(format!("{base}/task/{id}"))
        .json(&json!({"created_at": "yesterday"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 422);
}

#[tokio::test]
async fn patch_missing_task_returns_404() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client
        .patch(format!("{base}/task/999"))
        .json(&json!({"completed": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = TempDir::new().unwrap();
    let base = start_test_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
