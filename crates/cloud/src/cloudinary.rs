//! Cloudinary-compatible [`AssetGateway`].
//!
//! Uploads stream the local file as multipart form data; every request is
//! signed with a SHA-256 digest of its sorted parameters followed by the API
//! secret.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use vidshare_core::assets::AssetKind;
use vidshare_core::gateway::{AssetGateway, GatewayError, UploadedAsset};

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// TCP connect timeout for gateway requests. The overall upload deadline is
/// enforced by the caller.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum CloudinaryConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),
}

/// Credentials and endpoint for the Cloudinary API.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API root, overridable for tests and compatible self-hosted stores.
    pub base_url: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudinaryConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Required | Default                            |
    /// |-------------------------|----------|------------------------------------|
    /// | `CLOUDINARY_CLOUD_NAME` | **yes**  | --                                 |
    /// | `CLOUDINARY_API_KEY`    | **yes**  | --                                 |
    /// | `CLOUDINARY_API_SECRET` | **yes**  | --                                 |
    /// | `CLOUDINARY_BASE_URL`   | no       | `https://api.cloudinary.com/v1_1`  |
    pub fn from_env() -> Result<Self, CloudinaryConfigError> {
        fn required(var: &'static str) -> Result<String, CloudinaryConfigError> {
            std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(CloudinaryConfigError::Missing(var))
        }

        Ok(Self {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            base_url: std::env::var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
        })
    }
}

/// Subset of the upload response we rely on.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    url: String,
    secure_url: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for a Cloudinary-compatible media store.
#[derive(Debug, Clone)]
pub struct CloudinaryGateway {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryGateway {
    pub fn new(config: CloudinaryConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, kind: AssetKind, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            kind.as_str(),
            action
        )
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp().to_string()
    }
}

#[async_trait]
impl AssetGateway for CloudinaryGateway {
    async fn upload(&self, path: &Path, kind: AssetKind) -> Result<UploadedAsset, GatewayError> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = Self::timestamp();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.config.api_secret);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", Part::stream_with_length(body, len).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let uploaded: UploadResponse = read_json(response).await?;
        tracing::debug!(
            remote_id = %uploaded.public_id,
            kind = %kind,
            bytes = len,
            "Asset uploaded to gateway"
        );

        Ok(UploadedAsset {
            remote_id: uploaded.public_id,
            url: uploaded.url,
            secure_url: uploaded.secure_url,
            duration_seconds: uploaded.duration,
        })
    }

    async fn delete(&self, remote_id: &str, kind: AssetKind) -> Result<(), GatewayError> {
        let timestamp = Self::timestamp();
        let signature = sign(
            &[("public_id", remote_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let params = [
            ("public_id", remote_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let destroyed: DestroyResponse = read_json(response).await?;
        match destroyed.result.as_str() {
            "ok" => Ok(()),
            // Already gone: a retried delete must converge.
            "not found" => {
                tracing::debug!(remote_id, kind = %kind, "Remote asset already absent");
                Ok(())
            }
            other => Err(GatewayError::InvalidResponse(format!(
                "destroy returned '{other}' for {remote_id}"
            ))),
        }
    }
}

/// Decode a JSON body, turning non-2xx responses into [`GatewayError::Rejected`].
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

/// Compute the request signature: parameters sorted by name, joined as
/// `k=v&k=v`, secret appended, SHA-256 hex digest.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
