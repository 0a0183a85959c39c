//! End-to-end tests driving the HTTP router in-process.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tasklit::config::ApiConfig;
use tasklit::db::Database;
use tasklit::server::{AppState, build_router};
use tasklit::service::TaskService;
use tower::ServiceExt;

fn create_test_app() -> Router {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    build_router(AppState::new(TaskService::new(db, ApiConfig::default())))
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    json: Value,
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        json,
    }
}

async fn create_task(app: &Router, body: Value) -> Value {
    let response = send(app, "POST", "/task/create", Some(body)).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.json);
    response.json["data"].clone()
}

mod envelope_tests {
    use super::*;

    #[tokio::test]
    async fn success_envelope_shape() {
        let app = create_test_app();
        let response = send(&app, "GET", "/tasks", None).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["ok"], true);
        assert!(response.json["message"].is_string());
        assert!(response.json["requestId"].is_string());
        assert!(response.json["ts"].as_str().unwrap().ends_with('Z'));
        assert_eq!(response.json["data"]["tasks"], json!([]));
        assert_eq!(response.json["data"]["total"], 0);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/tags")
                    .header("x-request-id", "trace-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "trace-42");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["requestId"], "trace-42");
    }

    #[tokio::test]
    async fn generated_request_id_matches_header() {
        let app = create_test_app();
        let response = send(&app, "GET", "/tags", None).await;

        let header = response.headers["x-request-id"].to_str().unwrap();
        assert_eq!(response.json["requestId"], header);
    }

    #[tokio::test]
    async fn unknown_route_is_enveloped_not_found() {
        let app = create_test_app();
        let response = send(&app, "GET", "/nope/", None).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json["ok"], false);
        assert_eq!(response.json["type"], "not_found");
        assert_eq!(response.json["status"], 404);
        assert_eq!(response.json["details"]["method"], "GET");
        assert_eq!(response.json["details"]["path"], "/nope/");
        assert!(response.json["details"]["hint"].is_string());
    }

    #[tokio::test]
    async fn wrong_method_on_known_path_is_not_found() {
        let app = create_test_app();
        let response = send(&app, "POST", "/tags", None).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json["details"]["method"], "POST");
    }

    #[tokio::test]
    async fn ping_and_health() {
        let app = create_test_app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"pong");

        let response = send(&app, "GET", "/health", None).await;
        assert_eq!(response.json["data"]["status"], "ok");
        assert!(response.json["data"]["version"].is_string());
    }
}

mod task_routes {
    use super::*;

    #[tokio::test]
    async fn create_get_delete_get() {
        let app = create_test_app();
        let task = create_task(&app, json!({"title": "Buy milk"})).await;

        assert_eq!(task["title"], "Buy milk");
        assert_eq!(task["description"], "");
        assert_eq!(task["completed"], false);
        assert_eq!(task["tags"], json!([]));
        let id = task["id"].as_str().unwrap().to_string();

        let response = send(&app, "GET", &format!("/task?id={}", id), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"], task);

        let response = send(&app, "DELETE", &format!("/task?id={}", id), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["id"], id.as_str());

        let response = send(&app, "GET", &format!("/task?id={}", id), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json["type"], "not_found");
    }

    #[tokio::test]
    async fn create_validation_failures() {
        let app = create_test_app();

        let response = send(&app, "POST", "/task/create", Some(json!({}))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "bad_request");
        assert_eq!(response.json["details"]["field"], "title");

        let response = send(&app, "POST", "/task/create", Some(json!({"title": "  "}))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "validation_error");

        let response = send(
            &app,
            "POST",
            "/task/create",
            Some(json!({"title": "a", "tags": [42]})),
        )
        .await;
        assert_eq!(response.json["type"], "validation_error");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/task/create")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"title\":"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "bad_request");
    }

    #[tokio::test]
    async fn oversized_body_is_enveloped_bad_request() {
        let app = create_test_app();
        let title = "x".repeat(3 * 1024 * 1024);
        let response = send(&app, "POST", "/task/create", Some(json!({"title": title}))).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["ok"], false);
        assert_eq!(response.json["type"], "bad_request");
        assert!(response.json["requestId"].is_string());
        assert_eq!(response.json["details"]["status"], 413);

        let tasks = send(&app, "GET", "/tasks", None).await;
        assert_eq!(tasks.json["data"]["total"], 0);
    }

    #[tokio::test]
    async fn nil_uuid_tag_is_rejected() {
        let app = create_test_app();
        let response = send(
            &app,
            "POST",
            "/task/create",
            Some(json!({"title": "a", "tags": ["00000000-0000-0000-0000-000000000000"]})),
        )
        .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "validation_error");
        assert_eq!(response.json["details"]["field"], "tags[0]");

        let tags = send(&app, "GET", "/tags", None).await;
        assert_eq!(tags.json["data"], json!([]));
    }

    #[tokio::test]
    async fn query_id_must_be_present_and_valid() {
        let app = create_test_app();

        let response = send(&app, "GET", "/task", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["details"]["field"], "id");

        let response = send(&app, "GET", "/task?id=42", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "bad_request");
    }

    #[tokio::test]
    async fn patch_semantics_over_http() {
        let app = create_test_app();
        let task = create_task(
            &app,
            json!({"title": "Report", "description": "q3", "tags": ["work", "urgent"]}),
        )
        .await;
        let uri = format!("/task?id={}", task["id"].as_str().unwrap());

        let response = send(&app, "PATCH", &uri, Some(json!({"completed": true}))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["completed"], true);
        assert_eq!(response.json["data"]["tags"], task["tags"]);

        // Malformed tags field is ignored
        let response = send(&app, "PATCH", &uri, Some(json!({"tags": "oops"}))).await;
        assert_eq!(response.json["data"]["tags"], task["tags"]);

        let response = send(&app, "PATCH", &uri, Some(json!({"tags": null, "description": null}))).await;
        assert_eq!(response.json["data"]["tags"], json!([]));
        assert_eq!(response.json["data"]["description"], "");

        let response = send(&app, "PATCH", &uri, Some(json!({"title": null}))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "validation_error");
    }

    #[tokio::test]
    async fn put_replaces_whole_task() {
        let app = create_test_app();
        let task = create_task(
            &app,
            json!({"title": "Old", "description": "d", "completed": true, "tags": ["a"]}),
        )
        .await;
        let uri = format!("/task?id={}", task["id"].as_str().unwrap());

        let response = send(&app, "PUT", &uri, Some(json!({"title": "New"}))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["title"], "New");
        assert_eq!(response.json["data"]["description"], "");
        assert_eq!(response.json["data"]["completed"], false);
        assert_eq!(response.json["data"]["tags"], json!([]));
    }

    #[tokio::test]
    async fn unknown_tag_id_rejects_write() {
        let app = create_test_app();
        let response = send(
            &app,
            "POST",
            "/task/create",
            Some(json!({"title": "a", "tags": [uuid::Uuid::new_v4().to_string()]})),
        )
        .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let response = send(&app, "GET", "/tasks", None).await;
        assert_eq!(response.json["data"]["total"], 0);
    }

    #[tokio::test]
    async fn expand_returns_tag_records() {
        let app = create_test_app();
        let task = create_task(&app, json!({"title": "a", "tags": ["home"]})).await;
        assert!(task.get("tagsExpanded").is_none());

        let uri = format!("/task?id={}&expand=true", task["id"].as_str().unwrap());
        let response = send(&app, "GET", &uri, None).await;
        assert_eq!(response.json["data"]["tagsExpanded"][0]["name"], "home");
    }

    #[tokio::test]
    async fn pagination_over_http() {
        let app = create_test_app();
        for i in 0..3 {
            create_task(&app, json!({"title": format!("t{}", i)})).await;
        }

        let response = send(&app, "GET", "/tasks?page=2&per_page=2", None).await;
        let data = &response.json["data"];
        assert_eq!(data["page"], 2);
        assert_eq!(data["per_page"], 2);
        assert_eq!(data["total"], 3);
        assert_eq!(data["total_pages"], 2);
        assert_eq!(data["tasks"].as_array().unwrap().len(), 1);
        assert_eq!(data["tasks"][0]["title"], "t2");

        let response = send(&app, "GET", "/tasks?page=x", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_all_wipes_tasks_and_tags() {
        let app = create_test_app();
        create_task(&app, json!({"title": "a", "tags": ["x"]})).await;

        let response = send(&app, "DELETE", "/tasks", None).await;
        assert_eq!(response.status, StatusCode::OK);

        let response = send(&app, "GET", "/tags", None).await;
        assert_eq!(response.json["data"], json!([]));
        let response = send(&app, "GET", "/tasks", None).await;
        assert_eq!(response.json["data"]["total"], 0);
    }
}

mod tag_routes {
    use super::*;

    #[tokio::test]
    async fn create_twice_returns_same_id() {
        let app = create_test_app();

        let first = send(&app, "POST", "/tag/create", Some(json!({"name": "urgent"}))).await;
        assert_eq!(first.status, StatusCode::CREATED);
        assert_eq!(first.json["data"]["created"], true);

        let second = send(&app, "POST", "/tag/create", Some(json!({"name": "urgent"}))).await;
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(second.json["data"]["created"], false);
        assert_eq!(first.json["data"]["id"], second.json["data"]["id"]);

        let tags = send(&app, "GET", "/tags", None).await;
        assert_eq!(tags.json["data"].as_array().unwrap().len(), 1);
        assert_eq!(tags.json["data"][0]["name"], "urgent");
    }

    #[tokio::test]
    async fn tag_by_id_links_existing_tag() {
        let app = create_test_app();
        let tag = send(&app, "POST", "/tag/create", Some(json!({"name": "home"}))).await;
        let tag_id = tag.json["data"]["id"].clone();

        let task = create_task(&app, json!({"title": "a", "tags": [{"id": tag_id.clone()}]})).await;
        assert_eq!(task["tags"], json!([tag_id]));
    }

    #[tokio::test]
    async fn tag_name_must_not_look_like_a_uuid() {
        let app = create_test_app();
        let response = send(
            &app,
            "POST",
            "/tag/create",
            Some(json!({"name": "6f1c2a3e-0000-4000-8000-000000000001"})),
        )
        .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "validation_error");
        assert_eq!(response.json["details"]["field"], "name");

        let tags = send(&app, "GET", "/tags", None).await;
        assert_eq!(tags.json["data"], json!([]));
    }

    #[tokio::test]
    async fn tag_create_requires_name() {
        let app = create_test_app();
        let response = send(&app, "POST", "/tag/create", Some(json!({"name": 3}))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["type"], "validation_error");
    }
}
