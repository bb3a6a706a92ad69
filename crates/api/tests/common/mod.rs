#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use vidshare_api::auth::jwt::JwtConfig;
use vidshare_api::config::{ServerConfig, UploadConfig};
use vidshare_api::router::build_app_router;
use vidshare_api::state::{AppState, Backends};
use vidshare_core::assets::{AssetKind, AssetRef, LocalFile};
use vidshare_core::clock::ManualClock;
use vidshare_core::duration::MediaDuration;
use vidshare_core::gateway::{AssetGateway, GatewayError, UploadedAsset};
use vidshare_core::media::{MediaRecord, MediaStore, NewMediaRecord};
use vidshare_core::types::DbId;
use vidshare_db::memory::{MemoryCredentialStore, MemoryMediaStore, MemoryOrphanLog};

pub const START: i64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Stub gateway
// ---------------------------------------------------------------------------

/// In-process stand-in for the remote media store.
///
/// Counts calls, tracks which remote objects currently exist, and fails on
/// demand: uploads whose local file name contains a configured fragment, and
/// deletes of configured remote ids.
#[derive(Default)]
pub struct StubGateway {
    next_id: AtomicUsize,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    live: Mutex<HashSet<String>>,
    fail_upload_fragments: Mutex<Vec<String>>,
    fail_delete_ids: Mutex<HashSet<String>>,
    upload_delay: Mutex<Option<Duration>>,
    video_duration: Mutex<Option<f64>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.upload_calls() + self.delete_calls()
    }

    pub fn is_live(&self, remote_id: &str) -> bool {
        self.live.lock().unwrap().contains(remote_id)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// Fail every upload whose local file name contains `fragment`.
    pub fn fail_uploads_matching(&self, fragment: &str) {
        self.fail_upload_fragments
            .lock()
            .unwrap()
            .push(fragment.to_string());
    }

    pub fn fail_delete_of(&self, remote_id: &str) {
        self.fail_delete_ids
            .lock()
            .unwrap()
            .insert(remote_id.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_upload_fragments.lock().unwrap().clear();
        self.fail_delete_ids.lock().unwrap().clear();
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_video_duration(&self, seconds: f64) {
        *self.video_duration.lock().unwrap() = Some(seconds);
    }

    /// Register an object as existing remotely, as if uploaded earlier.
    pub fn seed(&self, remote_id: &str) {
        self.live.lock().unwrap().insert(remote_id.to_string());
    }
}

#[async_trait]
impl AssetGateway for StubGateway {
    async fn upload(&self, path: &Path, kind: AssetKind) -> Result<UploadedAsset, GatewayError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);

        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        // The local file must still exist while it is being uploaded.
        tokio::fs::metadata(path).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let fails = self
            .fail_upload_fragments
            .lock()
            .unwrap()
            .iter()
            .any(|f| file_name.contains(f.as_str()));
        if fails {
            return Err(GatewayError::Rejected {
                status: 500,
                message: "stub upload failure".into(),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let remote_id = format!("{kind}-{n}");
        self.live.lock().unwrap().insert(remote_id.clone());

        Ok(UploadedAsset {
            url: format!("http://cdn.test/{remote_id}"),
            secure_url: format!("https://cdn.test/{remote_id}"),
            duration_seconds: match kind {
                AssetKind::Video => *self.video_duration.lock().unwrap(),
                AssetKind::Image => None,
            },
            remote_id,
        })
    }

    async fn delete(&self, remote_id: &str, _kind: AssetKind) -> Result<(), GatewayError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_ids.lock().unwrap().contains(remote_id) {
            return Err(GatewayError::Transport("stub delete failure".into()));
        }
        self.live.lock().unwrap().remove(remote_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry_mins: 15,
        refresh_token_expiry_days: 10,
    }
}

/// Build a test `ServerConfig` with safe defaults and uploads staged under
/// `tmp_dir`.
pub fn test_config(tmp_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        cookie_secure: true,
        jwt: test_jwt_config(),
        upload: UploadConfig {
            tmp_dir: tmp_dir.to_path_buf(),
            timeout: Duration::from_secs(5),
            max_file_bytes: 1024 * 1024,
        },
    }
}

/// Application wired to in-memory stores, a stub gateway and a manual clock.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub gateway: Arc<StubGateway>,
    pub clock: Arc<ManualClock>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub media: Arc<MemoryMediaStore>,
    pub orphans: Arc<MemoryOrphanLog>,
    pub tmp: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(tmp.path());
        tweak(&mut config);

        let gateway = Arc::new(StubGateway::new());
        let clock = Arc::new(ManualClock::new(START));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let media = Arc::new(MemoryMediaStore::new());
        let orphans = Arc::new(MemoryOrphanLog::new());

        let state = AppState::new(
            config,
            Backends {
                credentials: credentials.clone(),
                media: media.clone(),
                orphans: orphans.clone(),
                gateway: gateway.clone(),
                clock: clock.clone(),
                pool: None,
            },
        );
        let app = build_app_router(state.clone()).expect("router");

        Self {
            app,
            state,
            gateway,
            clock,
            credentials,
            media,
            orphans,
            tmp,
        }
    }

    /// Number of files left in the upload temp directory.
    pub fn tmp_file_count(&self) -> usize {
        std::fs::read_dir(self.tmp.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Write a local file into the temp directory, as the multipart
    /// boundary would.
    pub fn local_file(&self, name: &str, contents: &[u8]) -> LocalFile {
        let path: PathBuf = self.tmp.path().join(name);
        std::fs::write(&path, contents).expect("write temp file");
        LocalFile {
            path,
            size: contents.len() as u64,
            file_name: Some(name.to_string()),
        }
    }

    /// Insert a video directly into the media store with live remote assets.
    pub async fn seed_video(&self, owner_id: DbId, with_thumbnail: bool) -> MediaRecord {
        let seq = self.media.len().await + 1;
        let video_id = format!("seed-video-{seq}");
        self.gateway.seed(&video_id);
        let thumbnail = with_thumbnail.then(|| {
            let id = format!("seed-thumb-{seq}");
            self.gateway.seed(&id);
            AssetRef {
                url: format!("https://cdn.test/{id}"),
                remote_id: id,
                kind: AssetKind::Image,
            }
        });

        self.media
            .create(&NewMediaRecord {
                owner_id,
                title: "Seeded".to_string(),
                description: "Seeded video".to_string(),
                video: AssetRef {
                    url: format!("https://cdn.test/{video_id}"),
                    remote_id: video_id,
                    kind: AssetKind::Video,
                },
                thumbnail,
                duration: MediaDuration::from_total_seconds(90),
            })
            .await
            .expect("seed video")
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Multipart request body builder.
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "vidshare-test-boundary".to_string(),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, contents: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(contents);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.content_type(), self.buf)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request")
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_with_cookie(app: &Router, uri: &str, cookie: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn send_multipart(
    app: &Router,
    method: Method,
    uri: &str,
    body: MultipartBody,
    token: Option<&str>,
) -> Response<Body> {
    let (content_type, bytes) = body.finish();
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, content_type);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(bytes)).unwrap()).await
}

pub async fn send_empty(app: &Router, method: Method, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

/// All `Set-Cookie` header values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

pub const PASSWORD: &str = "chai4code";

pub fn registration(username: &str) -> MultipartBody {
    MultipartBody::new()
        .text("fullName", "Test User")
        .text("email", &format!("{username}@example.com"))
        .text("username", username)
        .text("password", PASSWORD)
        .file("avatar", "avatar.png", b"png-bytes")
}

/// Register `username` and return the new user's id.
pub async fn register(t: &TestApp, username: &str) -> DbId {
    let response = send_multipart(
        &t.app,
        Method::POST,
        "/api/v1/users/register",
        registration(username),
        None,
    )
    .await;
    assert_eq!(response.status(), 201, "registration of {username} failed");
    body_json(response).await["data"]["id"]
        .as_i64()
        .expect("user id")
}

/// Log in and return `(access_token, refresh_token)`.
pub async fn login(t: &TestApp, username: &str) -> (String, String) {
    let response = post_json(
        &t.app,
        "/api/v1/users/login",
        serde_json::json!({ "username": username, "password": PASSWORD }),
        None,
    )
    .await;
    assert_eq!(response.status(), 200, "login of {username} failed");
    let json = body_json(response).await;
    (
        json["data"]["access_token"].as_str().unwrap().to_string(),
        json["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

/// Register and log in; returns `(user_id, access_token, refresh_token)`.
pub async fn signed_in(t: &TestApp, username: &str) -> (DbId, String, String) {
    let id = register(t, username).await;
    let (access, refresh) = login(t, username).await;
    (id, access, refresh)
}
