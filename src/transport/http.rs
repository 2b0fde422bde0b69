//! HTTP binding: `POST /{prefix}/{entity}/{operation}` with the JSON envelope
//! as the request body.

use super::{Operation, Registry, RouteError};
use crate::api::{ErrorKind, ErrorRecord};
use crate::config::GatewayConfig;
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub fn router(registry: Arc<Registry>) -> Router {
    let prefix = registry.prefix().trim_matches('/').to_string();

    let routes = Router::new()
        .route("/:entity/:operation", post(handle))
        .with_state(registry);

    let app = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&format!("/{prefix}"), routes)
    };

    app.fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
}

async fn handle(
    State(registry): State<Arc<Registry>>,
    Path((entity, operation)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let Some(module) = registry.module(&entity) else {
        return not_found(RouteError::UnknownEntity(entity));
    };
    let operation = match operation.parse::<Operation>() {
        Ok(operation) => operation,
        Err(err) => return not_found(err),
    };

    match module.dispatch(operation, &body).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn unknown_route(uri: Uri) -> Response {
    not_found(RouteError::BadSubject(uri.path().to_string()))
}

fn not_found(err: RouteError) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorRecord::from(err))).into_response()
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Decode => StatusCode::BAD_REQUEST,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Generic => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ErrorRecord {
    fn into_response(self) -> Response {
        (status_for(self.kind()), Json(self)).into_response()
    }
}

/// Migrates every registered entity, then serves until Ctrl-C or SIGTERM.
pub async fn serve(config: &GatewayConfig, registry: Registry) -> Result<()> {
    registry
        .migrate_all()
        .await
        .context("failed to migrate registered entities")?;

    let registry = Arc::new(registry);
    let app = router(Arc::clone(&registry));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        bind_addr = %config.bind_addr,
        prefix = registry.prefix(),
        entities = ?registry.entity_names(),
        "gateway started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
