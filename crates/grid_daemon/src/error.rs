//! HTTP translation of pipeline failures.
//!
//! Every failure becomes `{ "error": <message>, "kind": <FailureKind> }`
//! with a status chosen from the failure kind.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use grid_control::{FailureKind, PipelineError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Body(_) => FailureKind::ConfigurationError,
            Self::Pipeline(err) => err.kind(),
            Self::Join(_) => FailureKind::WorkflowFailure,
        }
    }
}

fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::ConfigurationError => StatusCode::BAD_REQUEST,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::StoreIoFailure
        | FailureKind::SimulationFailure
        | FailureKind::WorkflowFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self, ?kind, "request failed");
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": kind,
        });
        (status, axum::Json(body)).into_response()
    }
}
