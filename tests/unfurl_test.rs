//! Bookmark unfurl integration tests against a mock HTTP server

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::TestApp;
use xfboard::backend::unfurl::{UnfurlError, Unfurler};

const PAGE: &str = r#"<html><head>
<title>Fallback title</title>
<meta property="og:title" content="Board &amp; Friends">
<meta name="description" content="Shared whiteboards">
<meta property="og:image" content="/cover.png">
<link rel="shortcut icon" href="/static/icon.png">
</head><body></body></html>"#;

async fn mock_page(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unfurl_fetches_and_resolves_links() {
    let server = MockServer::start().await;
    mock_page(&server, "/article", 200, PAGE).await;

    let preview = Unfurler::new()
        .unfurl(&format!("{}/article", server.uri()))
        .await
        .unwrap();

    assert_eq!(preview.title, "Board & Friends");
    assert_eq!(preview.description, "Shared whiteboards");
    assert_eq!(preview.image, format!("{}/cover.png", server.uri()));
    assert_eq!(preview.favicon, format!("{}/static/icon.png", server.uri()));
}

#[tokio::test]
async fn test_unfurl_reads_only_the_head_of_large_pages() {
    let server = MockServer::start().await;
    let page = format!("{}{}", PAGE, " ".repeat(4 * 1024 * 1024));
    mock_page(&server, "/huge", 200, &page).await;

    let preview = Unfurler::new()
        .unfurl(&format!("{}/huge", server.uri()))
        .await
        .unwrap();

    assert_eq!(preview.title, "Board & Friends");
}

#[tokio::test]
async fn test_unfurl_error_status_is_reported() {
    let server = MockServer::start().await;
    mock_page(&server, "/gone", 404, "not here").await;

    let result = Unfurler::new().unfurl(&format!("{}/gone", server.uri())).await;

    assert!(matches!(result, Err(UnfurlError::Status(404))));
}

#[tokio::test]
async fn test_unfurl_route_returns_preview_json() {
    let server = MockServer::start().await;
    mock_page(&server, "/article", 200, PAGE).await;
    let app = TestApp::new();

    let target = urlencoding::encode(&format!("{}/article", server.uri())).into_owned();
    let response = app
        .router()
        .oneshot(
            Request::get(format!("/unfurl?url={}", target))
                .header(header::AUTHORIZATION, "Bearer t1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["title"], "Board & Friends");
}

#[tokio::test]
async fn test_unfurl_route_maps_upstream_failure_to_bad_gateway() {
    let server = MockServer::start().await;
    mock_page(&server, "/broken", 500, "oops").await;
    let app = TestApp::new();

    let target = urlencoding::encode(&format!("{}/broken", server.uri())).into_owned();
    let response = app
        .router()
        .oneshot(
            Request::get(format!("/unfurl?url={}", target))
                .header(header::AUTHORIZATION, "Bearer t1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
