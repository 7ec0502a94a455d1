use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use linkqr::config::MetricsFormat;
use linkqr::render::PNG_SIGNATURE;
use linkqr::server::{AppState, router};
use linkqr::{QrDecoder, QrEncoder};

const BODY_LIMIT: usize = 64 * 1024;

fn app() -> axum::Router {
    let state = AppState::new(QrEncoder::new(), MetricsFormat::Json).expect("state");
    router(state, BODY_LIMIT)
}

fn form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn index_serves_empty_form() {
    let response = app()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("QR Code Generator"));
    assert!(html.contains("name=\"url\""));
    assert!(html.contains("name=\"label\""));
    assert!(!html.contains("<img"));
}

#[tokio::test]
async fn submit_renders_image_and_download_link() {
    let response = app()
        .oneshot(form("url=https%3A%2F%2Fexample.com&label=Acme"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("QR Code for Acme"));
    assert!(html.contains("download=\"Acme_qrcode.png\""));
    assert!(html.contains("data:image/png;base64,"));
}

#[tokio::test]
async fn submit_with_empty_url_warns() {
    let response = app().oneshot(form("url=&label=Acme")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Please enter both URL and Business Name."));
    assert!(!html.contains("<img"));
    assert!(!html.contains("Download QR Code"));
}

#[tokio::test]
async fn submit_with_missing_label_field_warns() {
    let response = app()
        .oneshot(form("url=https%3A%2F%2Fexample.com"))
        .await
        .unwrap();

    let html = body_text(response).await;
    assert!(html.contains("Please enter both URL and Business Name."));
    assert!(!html.contains("<img"));
}

#[tokio::test]
async fn submit_with_oversized_url_shows_error() {
    let body = format!("url={}&label=Big", "a".repeat(3000));
    let response = app().oneshot(form(&body)).await.unwrap();

    let html = body_text(response).await;
    assert!(html.contains("notice error"));
    assert!(html.contains("An error occurred: Failed to encode QR code"));
    assert!(!html.contains("<img"));
    assert!(!html.contains("Download QR Code"));
}

#[tokio::test]
async fn download_returns_png_attachment() {
    let response = app()
        .oneshot(
            Request::get("/qr.png?url=https%3A%2F%2Fexample.com&label=Acme")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename=\"Acme_qrcode.png\""));

    let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(png.starts_with(&PNG_SIGNATURE));

    let img = image::load_from_memory(&png).unwrap();
    let decoded = QrDecoder::new().decode_gray(img.to_luma8()).unwrap();
    assert_eq!(decoded, "https://example.com");
}

#[tokio::test]
async fn download_without_label_is_bad_request() {
    let response = app()
        .oneshot(
            Request::get("/qr.png?url=https%3A%2F%2Fexample.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "Please enter both URL and Business Name."
    );
}

#[tokio::test]
async fn download_of_oversized_url_is_unprocessable() {
    let uri = format!("/qr.png?url={}&label=Big", "a".repeat(3000));
    let response = app()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.starts_with("An error occurred:"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let body = format!("url={}&label=Big", "a".repeat(BODY_LIMIT + 1));
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn healthz_is_ok() {
    let response = app()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn serve_refuses_body_limit_below_minimum() {
    let mut config = linkqr::LinkqrConfig::default();
    config.server.port = 0;
    config.server.max_body_bytes = 0;

    let err = linkqr::server::serve(&config).await.unwrap_err();
    assert!(matches!(err, linkqr::Error::Config(_)));
}

#[tokio::test]
async fn state_refuses_oversized_quiet_zone() {
    let mut config = linkqr::LinkqrConfig::default();
    config.qr.border = u32::MAX / 4;

    let err = AppState::from_config(&config).err().expect("config error");
    assert!(matches!(err, linkqr::Error::Config(_)));
}
