use std::sync::Arc;

use vidshare_core::accounts::CredentialStore;
use vidshare_core::clock::Clock;
use vidshare_core::gateway::AssetGateway;
use vidshare_core::media::MediaStore;
use vidshare_core::orphans::OrphanLog;

use crate::assets::AssetLifecycleManager;
use crate::auth::tokens::TokenService;
use crate::config::ServerConfig;

/// Storage and gateway implementations the server runs against.
///
/// Production wires the Postgres stores and the Cloudinary gateway; tests
/// wire in-memory stores and a stub gateway.
pub struct Backends {
    pub credentials: Arc<dyn CredentialStore>,
    pub media: Arc<dyn MediaStore>,
    pub orphans: Arc<dyn OrphanLog>,
    pub gateway: Arc<dyn AssetGateway>,
    pub clock: Arc<dyn Clock>,
    /// Database pool for health reporting, when running against Postgres.
    pub pool: Option<vidshare_db::DbPool>,
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub media: Arc<dyn MediaStore>,
    pub orphans: Arc<dyn OrphanLog>,
    pub tokens: Arc<TokenService>,
    pub assets: Arc<AssetLifecycleManager>,
    pub clock: Arc<dyn Clock>,
    pub pool: Option<vidshare_db::DbPool>,
}

impl AppState {
    pub fn new(config: ServerConfig, backends: Backends) -> Self {
        let tokens = TokenService::new(
            config.jwt.clone(),
            Arc::clone(&backends.credentials),
            Arc::clone(&backends.clock),
        );
        let assets = AssetLifecycleManager::new(
            backends.gateway,
            Arc::clone(&backends.media),
            Arc::clone(&backends.orphans),
            config.upload.timeout,
        );

        Self {
            config: Arc::new(config),
            credentials: backends.credentials,
            media: backends.media,
            orphans: backends.orphans,
            tokens: Arc::new(tokens),
            assets: Arc::new(assets),
            clock: backends.clock,
            pool: backends.pool,
        }
    }
}
