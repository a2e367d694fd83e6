use axum::body::Body;
use axum::http::{Request, StatusCode};

use test_utils::{memory_app, send};

#[tokio::test]
async fn unknown_route_is_404_with_code() {
    let (app, _, _) = memory_app();
    let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let (status, headers, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers.get("X-Error-Code").unwrap(), "route_not_found");
    assert!(body.contains("route_not_found"));
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _, _) = memory_app();
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn error_responses_are_counted_in_metrics() {
    let (app, _, _) = memory_app();
    let req = Request::builder().uri("/check-stock").method("POST").body(Body::empty()).unwrap();
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, _, text) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        text.contains(r#"http_errors_total{code="missing_product_id",service="inventory-service",status="400"} 1"#),
        "metrics were: {text}"
    );
}
