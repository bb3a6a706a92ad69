use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use validator::ValidationErrors;
use vidshare_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `vidshare_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request DTO validation failed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An uploaded file exceeded the configured size cap.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => "NOT_FOUND",
                CoreError::Validation(_) => "VALIDATION_ERROR",
                CoreError::Conflict(_) => "CONFLICT",
                CoreError::Unauthorized(_) => "UNAUTHORIZED",
                CoreError::Expired => "TOKEN_EXPIRED",
                CoreError::TokenReuseDetected { .. } => "TOKEN_REUSE_DETECTED",
                CoreError::Forbidden(_) => "FORBIDDEN",
                CoreError::MissingRequiredAsset(_) => "MISSING_REQUIRED_ASSET",
                CoreError::UploadFailed { .. } => "UPLOAD_FAILED",
                CoreError::AssetDeletionFailed(_) => "ASSET_DELETION_FAILED",
                CoreError::Gateway(_) => "GATEWAY_ERROR",
                CoreError::Signing(_) | CoreError::Internal(_) => "INTERNAL_ERROR",
            },
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::Validation(_) | CoreError::MissingRequiredAsset(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::Unauthorized(_)
                | CoreError::Expired
                | CoreError::TokenReuseDetected { .. } => StatusCode::UNAUTHORIZED,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::UploadFailed { .. }
                | CoreError::AssetDeletionFailed(_)
                | CoreError::Gateway(_) => StatusCode::BAD_GATEWAY,
                CoreError::Signing(_) | CoreError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
                CoreError::Validation(msg)
                | CoreError::Conflict(msg)
                | CoreError::Unauthorized(msg)
                | CoreError::Forbidden(msg) => msg.clone(),
                CoreError::Expired => "Token has expired".to_string(),
                CoreError::TokenReuseDetected { .. } => {
                    "Refresh token has already been used".to_string()
                }
                CoreError::MissingRequiredAsset(slot) => format!("{slot} file is required"),
                CoreError::UploadFailed { slot, .. } => format!("Failed to upload {slot}"),
                CoreError::AssetDeletionFailed(_) => {
                    "Failed to delete remote assets; the video was kept".to_string()
                }
                CoreError::Gateway(_) => "Media storage is unavailable".to_string(),
                CoreError::Signing(msg) | CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    "An internal error occurred".to_string()
                }
            },
            AppError::Validation(_) => "Request validation failed".to_string(),
            AppError::BadRequest(msg) | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Core(CoreError::UploadFailed { slot, reason }) => {
                tracing::warn!(%slot, %reason, "Upload failed");
            }
            AppError::Core(CoreError::AssetDeletionFailed(detail))
            | AppError::Core(CoreError::Gateway(detail)) => {
                tracing::warn!(%detail, "Gateway error");
            }
            _ => {}
        }

        let status = self.status();
        let mut body = json!({
            "error": self.message(),
            "code": self.code(),
        });

        if let AppError::Validation(errors) = &self {
            body["details"] = json!(field_details(errors));
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Flatten validator output into `{ field: [messages] }`.
fn field_details(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidshare_core::assets::AssetSlot;

    #[test]
    fn token_errors_are_distinct_401s() {
        let reuse = AppError::Core(CoreError::TokenReuseDetected { subject_id: 1 });
        let expired = AppError::Core(CoreError::Expired);
        assert_eq!(reuse.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(reuse.code(), "TOKEN_REUSE_DETECTED");
        assert_ne!(reuse.code(), expired.code());
    }

    #[test]
    fn asset_errors_map_to_gateway_statuses() {
        let missing = AppError::Core(CoreError::MissingRequiredAsset(AssetSlot::Video));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let upload = AppError::Core(CoreError::UploadFailed {
            slot: AssetSlot::Video,
            reason: "boom".into(),
        });
        assert_eq!(upload.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::Core(CoreError::AssetDeletionFailed("x".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = AppError::Core(CoreError::Internal("pool exhausted".into()));
        assert_eq!(err.message(), "An internal error occurred");
    }
}
