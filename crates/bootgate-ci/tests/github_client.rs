//! GitHubClient against a local stand-in for the REST API.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bootgate_ci::{CiError, GitHubApi, GitHubClient, GitHubConfig, PullRequestRef, Snippet};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
struct ApiCall {
    method: &'static str,
    path: String,
    body: Option<Value>,
    authorization: Option<String>,
}

#[derive(Clone, Default)]
struct Api {
    calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl Api {
    fn record(&self, method: &'static str, path: String, body: Option<Value>, headers: &HeaderMap) {
        self.calls.lock().unwrap().push(ApiCall {
            method,
            path,
            body,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
    }
}

async fn list_labels(
    State(api): State<Api>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let page = query.get("page").cloned().unwrap_or_default();
    api.record(
        "GET",
        format!("/repos/{owner}/{repo}/issues/{number}/labels?page={page}"),
        None,
        &headers,
    );

    // First page is full, second page carries the label we look for.
    let labels: Vec<Value> = match page.as_str() {
        "1" => (0..100).map(|i| json!({ "name": format!("label-{i}") })).collect(),
        _ => vec![json!({ "name": "needs-boot-test" })],
    };
    Json(Value::Array(labels))
}

async fn add_labels(
    State(api): State<Api>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.record(
        "POST",
        format!("/repos/{owner}/{repo}/issues/{number}/labels"),
        Some(body),
        &headers,
    );
    Json(json!([]))
}

async fn remove_label(
    State(api): State<Api>,
    Path((owner, repo, number, name)): Path<(String, String, u64, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    api.record(
        "DELETE",
        format!("/repos/{owner}/{repo}/issues/{number}/labels/{name}"),
        None,
        &headers,
    );
    if name == "needs boot/test" {
        (StatusCode::OK, Json(json!([])))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Label does not exist" })),
        )
    }
}

async fn create_comment(
    State(api): State<Api>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    api.record(
        "POST",
        format!("/repos/{owner}/{repo}/issues/{number}/comments"),
        Some(body),
        &headers,
    );
    (StatusCode::CREATED, Json(json!({ "id": 1 })))
}

async fn create_gist(
    State(api): State<Api>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    api.record("POST", "/gists".to_string(), Some(body), &headers);
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "abc",
            "html_url": "https://gist.github.com/bakery-bot/abc",
        })),
    )
}

async fn spawn_api() -> (GitHubClient, Api) {
    let api = Api::default();
    let app = Router::new()
        .route("/repos/{owner}/{repo}/issues/{number}/labels", get(list_labels).post(add_labels))
        .route("/repos/{owner}/{repo}/issues/{number}/labels/{name}", delete(remove_label))
        .route("/repos/{owner}/{repo}/issues/{number}/comments", post(create_comment))
        .route("/gists", post(create_gist))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GitHubClient::new(
        GitHubConfig::new("bakery-bot", "s3cret").with_api_url(&format!("http://{}", addr)),
    )
    .unwrap();
    (client, api)
}

fn pr() -> PullRequestRef {
    PullRequestRef::parse("acme/widget", "42").unwrap()
}

const AUTH: &str = "Basic YmFrZXJ5LWJvdDpzM2NyZXQ=";

#[tokio::test]
async fn test_list_labels_follows_pages() {
    let (client, api) = spawn_api().await;

    let labels = client.list_labels(&pr()).await.unwrap();
    assert_eq!(labels.names().len(), 101);
    assert!(labels.contains("needs-boot-test"));

    let calls = api.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].path, "/repos/acme/widget/issues/42/labels?page=1");
    assert_eq!(calls[1].path, "/repos/acme/widget/issues/42/labels?page=2");
    assert!(calls.iter().all(|c| c.authorization.as_deref() == Some(AUTH)));
}

#[tokio::test]
async fn test_add_label_and_comment_payloads() {
    let (client, api) = spawn_api().await;

    client.add_label(&pr(), "success").await.unwrap();
    client.comment(&pr(), "Boot test successful").await.unwrap();

    let calls = api.calls.lock().unwrap().clone();
    assert_eq!(calls[0].body, Some(json!({ "labels": ["success"] })));
    assert_eq!(calls[1].path, "/repos/acme/widget/issues/42/comments");
    assert_eq!(calls[1].body, Some(json!({ "body": "Boot test successful" })));
}

#[tokio::test]
async fn test_remove_label_encodes_name() {
    let (client, api) = spawn_api().await;

    client.remove_label(&pr(), "needs boot/test").await.unwrap();

    let calls = api.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "DELETE");
    assert_eq!(
        calls[0].path,
        "/repos/acme/widget/issues/42/labels/needs boot/test"
    );
}

#[tokio::test]
async fn test_remove_missing_label_is_remote_api_error() {
    let (client, _api) = spawn_api().await;

    let err = client.remove_label(&pr(), "nope").await.unwrap_err();
    match err {
        CiError::RemoteApi(msg) => {
            assert!(msg.contains("404"), "{msg}");
            assert!(msg.contains("Label does not exist"), "{msg}");
        }
        other => panic!("expected RemoteApi, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_snippet_posts_private_gist() {
    let (client, api) = spawn_api().await;

    let url = client
        .create_snippet(&Snippet {
            description: "gokrazy boot log".to_string(),
            filename: "boot-log-2026-10-19T08:30:00Z".to_string(),
            content: "booted".to_string(),
            public: false,
        })
        .await
        .unwrap();
    assert_eq!(url, "https://gist.github.com/bakery-bot/abc");

    let calls = api.calls.lock().unwrap().clone();
    assert_eq!(
        calls[0].body,
        Some(json!({
            "description": "gokrazy boot log",
            "public": false,
            "files": {
                "boot-log-2026-10-19T08:30:00Z": { "content": "booted" }
            }
        }))
    );
}

#[tokio::test]
async fn test_unreachable_api_is_remote_api_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GitHubClient::new(
        GitHubConfig::new("u", "t").with_api_url(&format!("http://{}", addr)),
    )
    .unwrap();
    let err = client.list_labels(&pr()).await.unwrap_err();
    assert!(matches!(err, CiError::RemoteApi(_)));
}
