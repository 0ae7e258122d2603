use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ScanError;
use crate::orchestrator::Orchestrator;
use crate::resolver::AddressResolver;
use crate::scanner::ScanEngine;
use crate::transcode::transcode;

pub struct AppState<R, F> {
    orchestrator: Arc<Orchestrator<R, F>>,
}

impl<R, F> Clone for AppState<R, F> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
        }
    }
}

/// Orchestration failures surface as a bare 500.
pub struct AppError(ScanError);

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Scan failed.");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

/// Routes: `GET /` and `GET /scan/{domain}`, open CORS, request tracing.
pub fn router<R, F, E>(orchestrator: Orchestrator<R, F>) -> Router
where
    R: AddressResolver + 'static,
    F: Fn() -> E + Send + Sync + 'static,
    E: ScanEngine,
{
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/scan/{domain}", get(scan_domain::<R, F, E>))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Serving API on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn root() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "message": "Hello World" })))
}

async fn scan_domain<R, F, E>(
    State(app): State<AppState<R, F>>,
    Path(domain): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: AddressResolver + 'static,
    F: Fn() -> E + Send + Sync + 'static,
    E: ScanEngine,
{
    let results = app.orchestrator.scan(&domain).await?;
    let body = json!({ "results": transcode(&results, None) });
    Ok((StatusCode::OK, Json(body)))
}
