//! Router tests: requests through the assembled app (routes, rejections, CORS, locking).

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use library_api::config::Config;
use library_api::interface::http;
use library_api::interface::shared_library;

// =============================================================================
// Helpers
// =============================================================================

fn app() -> Router {
    http::app(shared_library(), &Config::default())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        headers,
        body,
    }
}

fn book(title: &str, author: &str, year: i32) -> Option<Value> {
    Some(json!({"title": title, "author": author, "year": year}))
}

// =============================================================================
// Routes
// =============================================================================

#[tokio::test]
async fn dune_scenario_through_router() {
    let app = app();

    let r = send(&app, Method::POST, "/books", book("Dune", "Herbert", 1965)).await;
    assert_eq!(r.status, StatusCode::CREATED);
    assert_eq!(r.headers[header::LOCATION], "/books/1");
    assert_eq!(r.body["id"], 1);

    let r = send(&app, Method::POST, "/books", book("dune ", " HERBERT", 1965)).await;
    assert_eq!(r.status, StatusCode::CONFLICT);
    assert_eq!(r.body["status"], 409);

    let r = send(
        &app,
        Method::POST,
        "/books",
        book("Dune Messiah", "Herbert", 1969),
    )
    .await;
    assert_eq!(r.status, StatusCode::CREATED);
    assert_eq!(r.headers[header::LOCATION], "/books/2");

    let r = send(
        &app,
        Method::GET,
        "/books?sort=year&order=desc&limit=1",
        None,
    )
    .await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.headers["x-total-count"], "2");
    assert_eq!(r.body.as_array().unwrap().len(), 1);
    assert_eq!(r.body[0]["id"], 2);

    let r = send(&app, Method::PUT, "/books/2", Some(json!({"read": true}))).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["read"], true);
    assert_eq!(r.body["title"], "Dune Messiah");

    let r = send(&app, Method::DELETE, "/books/1", None).await;
    assert_eq!(r.status, StatusCode::NO_CONTENT);

    let r = send(&app, Method::GET, "/books/1", None).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);

    let r = send(&app, Method::GET, "/books", None).await;
    assert_eq!(r.headers["x-total-count"], "1");
}

#[tokio::test]
async fn health_route() {
    let r = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["status"], "ok");
}

// =============================================================================
// Path ids and rejections
// =============================================================================

#[tokio::test]
async fn non_integer_id_is_422() {
    let app = app();
    for (method, body) in [
        (Method::GET, None),
        (Method::PUT, Some(json!({"read": true}))),
        (Method::DELETE, None),
    ] {
        let r = send(&app, method.clone(), "/books/abc", body).await;
        assert_eq!(r.status, StatusCode::UNPROCESSABLE_ENTITY, "{method}");
        assert_eq!(r.body["status"], 422);
    }
}

#[tokio::test]
async fn negative_id_is_404() {
    let app = app();
    send(&app, Method::POST, "/books", book("Dune", "Herbert", 1965)).await;

    for (method, body) in [
        (Method::GET, None),
        (Method::PUT, Some(json!({"read": true}))),
        (Method::DELETE, None),
    ] {
        let r = send(&app, method.clone(), "/books/-1", body).await;
        assert_eq!(r.status, StatusCode::NOT_FOUND, "{method}");
        assert_eq!(r.body["detail"], "book not found: -1");
    }
}

#[tokio::test]
async fn invalid_update_on_missing_id_is_422() {
    let r = send(
        &app(),
        Method::PUT,
        "/books/999",
        Some(json!({"year": 3000})),
    )
    .await;
    assert_eq!(r.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn body_and_query_rejections_are_422() {
    let app = app();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/books")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/books")
        .body(Body::from(r#"{"title": "Dune", "author": "Herbert", "year": 1965}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let r = send(&app, Method::GET, "/books?limit=abc", None).await;
    assert_eq!(r.status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn cors_exposes_total_count_and_location() {
    let req = Request::builder()
        .method(Method::GET)
        .uri("/books")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    let exposed = headers[header::ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-total-count"), "{exposed}");
    assert!(exposed.contains("location"), "{exposed}");
}

#[tokio::test]
async fn cors_ignores_unknown_origin() {
    let req = Request::builder()
        .method(Method::GET)
        .uri("/books")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert!(resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_creates_admit_exactly_one() {
    let app = app();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            let title = format!(
                "{}{}",
                " ".repeat(i % 3),
                if i % 2 == 0 { "Dune" } else { "DUNE" }
            );
            let author = if i % 4 < 2 { "Herbert " } else { "herbert" };
            tokio::spawn(async move {
                send(&app, Method::POST, "/books", book(&title, author, 1965))
                    .await
                    .status
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        let status = task.await.unwrap();
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::CONFLICT);
        }
    }
    assert_eq!(created, 1);

    let r = send(&app, Method::GET, "/books", None).await;
    assert_eq!(r.headers["x-total-count"], "1");
}
