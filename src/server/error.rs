//! Error types for the server

use crate::error::ChurnError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Churn(#[from] ChurnError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Churn(ChurnError::RetrainInProgress) => StatusCode::CONFLICT,
            ServerError::Churn(ChurnError::ModelNotLoaded) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Churn(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            // The retrain body carries only hyperparameters, so a label column
            // missing from the configured training data is a server-side fault
            ServerError::Churn(ChurnError::MissingLabelColumn(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Churn(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
            ServerError::Churn(ChurnError::Io(e)) => {
                tracing::error!(detail = %e, "IO error");
                "A file system error occurred".to_string()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(detail = %other, "Request failed");
                }
                other.to_string()
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
