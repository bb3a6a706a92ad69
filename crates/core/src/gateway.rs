//! Contract for the remote media store that holds uploaded files.

use std::path::Path;

use async_trait::async_trait;

use crate::assets::{AssetKind, AssetRef};

/// Metadata returned by a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAsset {
    pub remote_id: String,
    pub url: String,
    pub secure_url: String,
    /// Reported media duration in seconds (video uploads only).
    pub duration_seconds: Option<f64>,
}

impl UploadedAsset {
    /// Reference persisted on records. Always uses the HTTPS delivery URL.
    pub fn to_ref(&self, kind: AssetKind) -> AssetRef {
        AssetRef {
            remote_id: self.remote_id.clone(),
            url: self.secure_url.clone(),
            kind,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to read local file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gateway request failed: {0}")]
    Transport(String),

    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// Remote object store for media files.
///
/// Implementations must treat deleting an already-absent object as success.
#[async_trait]
pub trait AssetGateway: Send + Sync {
    async fn upload(&self, path: &Path, kind: AssetKind) -> Result<UploadedAsset, GatewayError>;

    async fn delete(&self, remote_id: &str, kind: AssetKind) -> Result<(), GatewayError>;
}
