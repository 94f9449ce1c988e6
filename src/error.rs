//! Uniform JSON error responses.
//!
//! Authentication rejections carry fixed messages; everything else collapses
//! into a 500 whose body exposes the fault chain outside production.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::config::Environment;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// Debug rendering of the fault chain; present only outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Error type returned at the HTTP boundary.
#[derive(Debug)]
pub enum ApiError {
    /// 401 with a fixed message; produced only by the auth middleware.
    Unauthorized { message: &'static str },
    /// Catch-all 500 for faults no step handled.
    Internal {
        source: anyhow::Error,
        environment: Environment,
    },
}

impl ApiError {
    /// The request carried no usable `Authorization` header.
    pub fn missing_credentials() -> Self {
        Self::Unauthorized {
            message: "Authentication invalid",
        }
    }

    /// Credentials were presented but could not be verified.
    pub fn not_authorized() -> Self {
        Self::Unauthorized {
            message: "There was a problem authorizing the request",
        }
    }

    /// Wrap an unhandled fault.
    pub fn internal(environment: Environment, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            source: source.into(),
            environment,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { message } => write!(f, "{}", message),
            Self::Internal { source, .. } => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized { message } => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    message: message.to_string(),
                    stack: None,
                }),
            )
                .into_response(),
            Self::Internal {
                source,
                environment,
            } => {
                error!("unhandled error: {:#}", source);

                let stack = if environment.is_production() {
                    None
                } else {
                    Some(format!("{:?}", source))
                };

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        message: source.to_string(),
                        stack,
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_bodies() {
        let response = ApiError::missing_credentials().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({ "message": "Authentication invalid" }));

        let response = ApiError::not_authorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({ "message": "There was a problem authorizing the request" })
        );
    }

    #[tokio::test]
    async fn test_internal_exposes_stack_in_development() {
        let err = ApiError::internal(
            Environment::Development,
            anyhow::anyhow!("boom").context("route handler failed"),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "route handler failed");
        let stack = body["stack"].as_str().unwrap();
        assert!(!stack.is_empty());
        assert!(stack.contains("boom"));
    }

    #[tokio::test]
    async fn test_internal_hides_stack_in_production() {
        let err = ApiError::internal(Environment::Production, anyhow::anyhow!("boom"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({ "message": "boom" }));
        assert!(body.get("stack").is_none());
    }
}
