use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Invalid airport code: {0:?}")]
    InvalidAirportCode(String),

    #[error("Could not retrieve temperature or precipitation data for {0}")]
    DataNotFound(String),

    #[error("GEFS plume source is unreachable")]
    SourceUnreachable,

    #[error("Error generating plot: {0}")]
    Render(#[from] RenderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlotError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAirportCode(_) => StatusCode::BAD_REQUEST,
            Self::DataNotFound(_) => StatusCode::NOT_FOUND,
            Self::SourceUnreachable => StatusCode::BAD_GATEWAY,
            Self::Render(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlotError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Plot request failed: {self}");
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.to_string()
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_failure_kind() {
        assert_eq!(
            PlotError::InvalidAirportCode("b!".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlotError::DataNotFound("KBOS".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(PlotError::SourceUnreachable.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            PlotError::from(RenderError::NoTimeAxis).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn response_carries_status_and_json_error() {
        let response = PlotError::DataNotFound("KBOS".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body["error"],
            "Could not retrieve temperature or precipitation data for KBOS"
        );
    }
}
