//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deck_engine::EngineError;
use deck_fleet::FleetError;
use deck_logs::LogError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A required query parameter is absent.
    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Host or container not found.
    #[error("{0}")]
    NotFound(String),

    /// The request deadline passed.
    #[error("{0}")]
    Timeout(String),

    /// An engine failed to answer.
    #[error("{0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::MissingParameter(_) | Self::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "engine_error"),
            Self::BindFailed(_, _) | Self::Config(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorResponse {
            error: error_type,
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => Self::NotFound(err.to_string()),
            EngineError::DeadlineExceeded => Self::Timeout(err.to_string()),
            EngineError::InvalidHostConfig { .. } | EngineError::UnsupportedHost { .. } => {
                Self::Config(err.to_string())
            }
            EngineError::ConnectionFailed(_)
            | EngineError::Cancelled
            | EngineError::Decode(_)
            | EngineError::Api(_) => Self::Upstream(err.to_string()),
        }
    }
}

impl From<FleetError> for ServerError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::UnknownHost { .. } => Self::NotFound(err.to_string()),
            FleetError::Engine(inner) => inner.into(),
            FleetError::DuplicateHost { .. } => Self::Config(err.to_string()),
            FleetError::TaskFailed(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<LogError> for ServerError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::InvalidOption { .. } => Self::InvalidRequest(err.to_string()),
            LogError::Source(_) => Self::Upstream(err.to_string()),
            LogError::StreamClosed => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use test_case::test_case;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_error_response() {
        let err = ServerError::from(FleetError::UnknownHost {
            name: "edge".to_string(),
        });
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["message"], "host edge not found");
    }

    #[tokio::test]
    async fn missing_parameter_response() {
        let response = ServerError::MissingParameter("host").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["message"], "host parameter is required");
    }

    #[test_case(EngineError::NotFound { id: "abc".into() }, StatusCode::NOT_FOUND ; "missing container")]
    #[test_case(EngineError::DeadlineExceeded, StatusCode::GATEWAY_TIMEOUT ; "deadline")]
    #[test_case(EngineError::Api("boom".into()), StatusCode::BAD_GATEWAY ; "engine failure")]
    #[test_case(EngineError::ConnectionFailed("refused".into()), StatusCode::BAD_GATEWAY ; "unreachable")]
    #[test_case(EngineError::Cancelled, StatusCode::BAD_GATEWAY ; "cancelled")]
    fn engine_errors_map_to_status(err: EngineError, status: StatusCode) {
        let response = ServerError::from(FleetError::Engine(err)).into_response();
        assert_eq!(response.status(), status);
    }

    #[test]
    fn log_errors_map() {
        let err = ServerError::from(LogError::invalid_option("tail", "expected a number"));
        assert!(matches!(err, ServerError::InvalidRequest(_)));

        let err = ServerError::from(LogError::StreamClosed);
        assert!(matches!(err, ServerError::Internal(_)));
    }

    #[test]
    fn error_display() {
        let err = ServerError::InvalidRequest("bad param".to_string());
        assert_eq!(err.to_string(), "invalid request: bad param");

        let err = ServerError::from(EngineError::NotFound {
            id: "abc".to_string(),
        });
        assert_eq!(err.to_string(), "container not found: abc");
    }
}
