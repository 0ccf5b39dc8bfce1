use std::io::Error as IoError;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use datacat_service::JobError;
use datacat_service::config::ConfigError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures that end the process
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start the monitoring engine: {0:#}")]
    Startup(anyhow::Error),
}

/// Failures of a single request, rendered as `{success: false, message}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Job(JobError::Validation(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Job(JobError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Job(JobError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Job(JobError::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // Storage details stay in the log
            ApiError::Job(JobError::Persistence(e)) => {
                error!("request failed in the job store: {}", e);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "success": false, "message": message }))
    }
}
