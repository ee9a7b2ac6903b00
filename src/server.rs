//! HTTP surface for the query service: `POST /api/chat` and `GET /healthz`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::RagError;
use crate::query::QueryService;

/// Chat request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Student question.
    pub message: String,
}

/// Chat response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model answer, verbatim.
    pub reply: String,
}

/// Error body returned for any failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub error: String,
}

/// Builds the router around a shared query service.
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/chat", post(chat_handler))
        .with_state(service)
}

/// Serves the router on an already-bound listener until the server stops.
pub async fn serve(listener: TcpListener, service: Arc<QueryService>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "wikiqa chat API listening");
    }
    axum::serve(listener, router(service)).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn chat_handler(
    State(service): State<Arc<QueryService>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: rejection.body_text(),
    })?;
    let reply = service.answer(&request.message).await?;
    Ok(Json(ChatResponse { reply }))
}

/// Status code and message rendered as an [`ErrorBody`].
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(error = %err, "chat request failed");
        } else {
            warn!(error = %err, "chat request rejected");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn status_for(err: &RagError) -> StatusCode {
    match err {
        RagError::Validation(_) => StatusCode::BAD_REQUEST,
        RagError::NotFound(_) => StatusCode::NOT_FOUND,
        RagError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        RagError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        RagError::Service { .. } | RagError::Io(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_taxonomy_to_statuses() {
        assert_eq!(
            status_for(&RagError::Validation("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RagError::RateLimited("slow".into())),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&RagError::transient("503")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&RagError::Config("no index".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
