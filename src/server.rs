//! HTTP surface: the generator page, PNG download, health and metrics

use crate::config::{LinkqrConfig, MetricsFormat};
use crate::error::{Error, Result};
use crate::metrics::{Metrics, RenderOutcome};
use crate::output::{Notice, PageRenderer, content_disposition};
use crate::qr::QrEncoder;
use crate::render::{PNG_CONTENT_TYPE, RenderedOutput, Submission, handle_request};
use axum::extract::{Form, Query, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Immutable per-process state shared by handlers.
#[derive(Clone)]
pub struct AppState {
    encoder: Arc<QrEncoder>,
    pages: Arc<PageRenderer>,
    metrics: Arc<Metrics>,
    metrics_format: MetricsFormat,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(encoder: QrEncoder, metrics_format: MetricsFormat) -> Result<Self> {
        Ok(Self {
            encoder: Arc::new(encoder),
            pages: Arc::new(PageRenderer::new()?),
            metrics: Arc::new(Metrics::new()),
            metrics_format,
        })
    }

    /// Build state from loaded configuration.
    pub fn from_config(config: &LinkqrConfig) -> Result<Self> {
        let encoder = QrEncoder::with_settings(config.qr_settings()?);
        Self::new(encoder, config.logging.metrics_format)
    }

    /// Metrics shared by all handlers.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Handler error mapped onto an HTTP status and a plain-text message.
#[derive(Debug)]
pub struct ServerError(Error);

impl From<Error> for ServerError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::MissingInput => StatusCode::BAD_REQUEST,
            Error::QrEncode(_)
            | Error::QrDecode(_)
            | Error::NoQrCodeFound
            | Error::VerificationMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Notice::from_error(&self.0).message).into_response()
    }
}

/// Build the router with tracing and a request body limit.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/qr.png", get(download))
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(serve_metrics))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &LinkqrConfig) -> Result<()> {
    config.server.validate()?;
    let state = AppState::from_config(config)?;
    if config.logging.metrics {
        state
            .metrics
            .spawn_reporter(config.logging.metrics_interval_secs);
    }

    let listener = TcpListener::bind(config.server.socket_address()).await?;
    let addr = listener.local_addr()?;
    info!(%addr, settings = ?state.encoder.settings(), "linkqr listening");

    axum::serve(listener, router(state, config.server.max_body_bytes))
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    info!("linkqr stopped");
    Ok(())
}

/// Resolves when `signal` fires. A signal that fails to install never resolves.
async fn shutdown_on(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        error!(error = %e, "Failed to listen for Ctrl-C, graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
}

async fn index(State(state): State<AppState>) -> std::result::Result<Html<String>, ServerError> {
    Ok(Html(state.pages.empty()?))
}

async fn submit(
    State(state): State<AppState>,
    Form(submission): Form<Submission>,
) -> std::result::Result<Html<String>, ServerError> {
    let outcome = generate(&state, &submission).await;
    Ok(Html(state.pages.render(&submission, Some(&outcome))?))
}

async fn download(
    State(state): State<AppState>,
    Query(submission): Query<Submission>,
) -> std::result::Result<Response, ServerError> {
    let output = generate(&state, &submission).await?;
    let disposition = HeaderValue::from_str(&content_disposition(&output.file_name))
        .map_err(|e| Error::Other(format!("Invalid download header: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PNG_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.png,
    )
        .into_response())
}

async fn serve_metrics(State(state): State<AppState>) -> Response {
    let (content_type, body) = state.metrics.render(state.metrics_format);
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        body,
    )
        .into_response()
}

/// Run one submission off the async runtime and record how it went.
async fn generate(state: &AppState, submission: &Submission) -> Result<RenderedOutput> {
    let started = Instant::now();
    let encoder = Arc::clone(&state.encoder);
    let request = submission.clone();

    let outcome = tokio::task::spawn_blocking(move || handle_request(&encoder, &request))
        .await
        .map_err(|e| Error::Other(format!("Render task failed: {e}")))
        .and_then(|result| result);

    let elapsed = started.elapsed();
    match &outcome {
        Ok(output) => {
            state.metrics.record(
                RenderOutcome::Rendered {
                    version: output.symbol.version,
                    bytes: output.png.len(),
                },
                elapsed,
            );
            info!(
                label = %submission.label,
                version = output.symbol.version,
                bytes = output.png.len(),
                elapsed_ms = elapsed.as_secs_f64() * 1_000.0,
                "Rendered QR code"
            );
        }
        Err(err) if err.is_warning() => {
            state.metrics.record(RenderOutcome::Warned, elapsed);
            info!("Submission missing URL or label");
        }
        Err(err) => {
            state.metrics.record(RenderOutcome::Failed, elapsed);
            warn!(error = %err, target_len = submission.url.len(), "QR generation failed");
        }
    }

    outcome
}
