use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Per-field validation detail, keyed by wire field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Every failure a handler can produce. Converted into the uniform error
/// envelope at the handler boundary; nothing propagates past it uncaught.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    pub fn validation_fields(fields: FieldErrors) -> Self {
        Self::Validation {
            message: "Validation failed".into(),
            fields,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationFailed",
            Self::Unauthenticated(_) => "Unauthenticated",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::Internal(_) => "Unhandled",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Constraint violations reported by Postgres are mapped back to the caller;
/// anything else stays internal. The handlers pre-check uniqueness and
/// references for friendlier messages, this covers the race.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::not_found("Resource not found");
        }
        let code = match &err {
            sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
            _ => None,
        };
        match code.as_deref() {
            Some("23505") => Self::conflict("A resource with these unique fields already exists"),
            Some("23503") => Self::conflict("Operation conflicts with a reference to another resource"),
            Some("23514") => Self::validation("A value is outside its allowed range"),
            _ => Self::Internal(err.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    fields: FieldErrors,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!(error = %err, "unhandled error");
        }
        let status = self.status();
        let kind = self.kind();
        let (message, fields) = match self {
            Self::Validation { message, fields } => (message, fields),
            // Internal detail never leaks; Display is the generic message.
            other => (other.to_string(), FieldErrors::new()),
        };
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                kind,
                message,
                fields,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("valid json")
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::unauthenticated("x").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn envelope_carries_kind_and_message() {
        let body = body_json(ApiError::not_found("Recipe not found")).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "NotFound");
        assert_eq!(body["error"]["message"], "Recipe not found");
        assert!(body["error"].get("fields").is_none());
    }

    #[tokio::test]
    async fn validation_envelope_carries_field_detail() {
        let mut fields = FieldErrors::new();
        fields.insert("title".into(), vec!["title is required".into()]);
        let body = body_json(ApiError::validation_fields(fields)).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "ValidationFailed");
        assert_eq!(body["error"]["fields"]["title"][0], "title is required");
    }

    #[tokio::test]
    async fn internal_errors_never_leak_detail() {
        let body = body_json(ApiError::Internal(anyhow::anyhow!(
            "connection refused to db at 10.0.0.3"
        )))
        .await;
        assert_eq!(body["error"]["kind"], "Unhandled");
        assert_eq!(body["error"]["message"], "Internal server error");
    }
}
