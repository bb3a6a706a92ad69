use crate::assets::AssetSlot;
use crate::types::DbId;

/// Domain error taxonomy.
///
/// Callers branch on the variant, never on the message text. The HTTP layer
/// maps each variant to a status code and a stable error code.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token expired")]
    Expired,

    /// A refresh token that was already superseded by rotation was presented.
    #[error("Refresh token reuse detected for subject {subject_id}")]
    TokenReuseDetected { subject_id: DbId },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Required asset '{0}' is missing")]
    MissingRequiredAsset(AssetSlot),

    #[error("Upload of '{slot}' failed: {reason}")]
    UploadFailed { slot: AssetSlot, reason: String },

    #[error("Failed to delete remote assets: {0}")]
    AssetDeletionFailed(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
