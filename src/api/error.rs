use crate::services::answer::AnswerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Upstream(#[from] AnswerError),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Upstream(e) => {
                tracing::error!("AI request failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::BadRequest("No files uploaded".into()), StatusCode::BAD_REQUEST),
            (AppError::PayloadTooLarge("too big".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (AppError::Upstream(AnswerError::EmptyResponse), StatusCode::BAD_GATEWAY),
            (
                AppError::Anyhow(anyhow::anyhow!("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_upstream_keeps_error_text() {
        let err: AppError = AnswerError::MissingApiKey.into();
        assert_eq!(err.to_string(), AnswerError::MissingApiKey.to_string());
    }
}
