//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{DatasetError, PipelineError, VectorStoreError};

/// Error rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Dataset(DatasetError::InvalidName(_))
            | PipelineError::NoContent
            | PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::Dataset(DatasetError::NotFound(_))
            | PipelineError::VectorStore(VectorStoreError::CollectionNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            PipelineError::Dataset(_)
            | PipelineError::Extract { .. }
            | PipelineError::Embedding(_)
            | PipelineError::VectorStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{} {}", self.status, self.detail);
        } else {
            tracing::debug!("{} {}", self.status, self.detail);
        }
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PipelineError::NoContent, StatusCode::BAD_REQUEST),
            (
                DatasetError::InvalidName("a/b".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                DatasetError::NotFound("x".to_string()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                VectorStoreError::SearchError("boom".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_detail_is_user_message() {
        let err = ApiError::from(PipelineError::NoContent);
        assert_eq!(err.detail, "No valid text found in dataset.");
    }
}
