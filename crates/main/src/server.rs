//! HTTP front end: `POST /submit` turns a JSON service record into a PDF.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use medreport::config::ServerConfig;
use medreport::{Config, RenderOptions, ReportError, ReportRenderer, ValidationError, PDF_MIME_TYPE};

#[derive(Clone)]
struct AppState {
    renderer: Arc<ReportRenderer>,
}

/// Body of every non-PDF answer from `/submit`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    ok: bool,
    message: &'static str,
}

/// Outcome of one render, reduced to what crosses the blocking pool boundary.
enum Outcome {
    Pdf { bytes: Vec<u8>, filename: &'static str },
    Invalid(ValidationError),
    Failed(String),
}

/// Builds the application router with its own renderer.
pub fn router(config: &Config) -> Router {
    let renderer = ReportRenderer::new(RenderOptions::from(&config.report));
    app(Arc::new(renderer), &config.server)
}

fn app(renderer: Arc<ReportRenderer>, config: &ServerConfig) -> Router {
    let state = AppState { renderer };

    Router::new()
        .route("/submit", post(submit))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Loads the report fonts, binds `server.addr` and serves until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let renderer = Arc::new(ReportRenderer::new(RenderOptions::from(&config.report)));
    renderer.preload().context("failed to load report fonts")?;

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app(renderer, &config.server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        ok: true,
        message: "medreport is alive",
    })
}

async fn submit(State(state): State<AppState>, body: Bytes) -> Response {
    let renderer = Arc::clone(&state.renderer);
    let joined = tokio::task::spawn_blocking(move || match renderer.render_payload(&body) {
        Ok(report) => Outcome::Pdf {
            bytes: report.bytes,
            filename: report.filename,
        },
        Err(ReportError::Validation(err)) => Outcome::Invalid(err),
        Err(err) => Outcome::Failed(err.to_string()),
    })
    .await;

    let outcome = joined.unwrap_or_else(|err| Outcome::Failed(format!("render task failed: {err}")));

    match outcome {
        Outcome::Pdf { bytes, filename } => {
            info!("rendered {filename} ({} bytes)", bytes.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, PDF_MIME_TYPE.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename={filename}"),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Outcome::Invalid(err) => {
            warn!("rejected submission: {err}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: err.to_string(),
                    field: Some(err.field().to_string()),
                }),
            )
                .into_response()
        }
        Outcome::Failed(message) => {
            error!("{message}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "failed to render report".to_string(),
                    field: None,
                }),
            )
                .into_response()
        }
    }
}
