//! Session token lifecycle: issue, verify, rotate, revoke.
//!
//! Access tokens are stateless and verified by signature and expiry alone.
//! Refresh tokens are stateful: exactly one per subject is valid, tracked as a
//! digest on the credential record, and every successful [`TokenService::rotate`]
//! replaces it.
//!
//! Per-subject state machine:
//!
//! ```text
//! LoggedOut --issue_and_store--> LoggedIn(T1)
//! LoggedIn(T1) --rotate(T1)--> LoggedIn(T2)
//! LoggedIn(T2) --rotate(T1)--> TokenReuseDetected, still LoggedIn(T2)
//! LoggedIn(_) --revoke--> LoggedOut
//! ```

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use vidshare_core::accounts::CredentialStore;
use vidshare_core::clock::Clock;
use vidshare_core::error::CoreError;
use vidshare_core::types::DbId;

use crate::auth::jwt::{decode_token, encode_token, hash_refresh_token, Claims, JwtConfig, TokenType};

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (UTC Unix timestamp).
    pub access_expires_at: i64,
    /// Refresh token expiry (UTC Unix timestamp).
    pub refresh_expires_at: i64,
}

/// Issues and validates session tokens for one signing configuration.
pub struct TokenService {
    config: JwtConfig,
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        config: JwtConfig,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            credentials,
            clock,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Sign a new access/refresh pair for `subject_id`.
    ///
    /// Does not persist anything; see [`Self::issue_and_store`].
    pub fn issue(&self, subject_id: DbId) -> Result<TokenPair, CoreError> {
        if self.config.secret.is_empty() {
            return Err(CoreError::Signing("signing secret is not configured".into()));
        }

        let now = self.clock.now();
        let access_expires_at = now + self.config.access_ttl_secs();
        let refresh_expires_at = now + self.config.refresh_ttl_secs();

        let access_token = self.sign(subject_id, now, access_expires_at, TokenType::Access)?;
        let refresh_token = self.sign(subject_id, now, refresh_expires_at, TokenType::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Issue a pair and make its refresh token the subject's only valid one.
    ///
    /// Used at login: any refresh token handed out earlier stops working.
    pub async fn issue_and_store(&self, subject_id: DbId) -> Result<TokenPair, CoreError> {
        let pair = self.issue(subject_id)?;
        let digest = hash_refresh_token(&pair.refresh_token);
        self.credentials
            .update_refresh_token(subject_id, Some(&digest))
            .await?;
        tracing::info!(subject_id, "Session issued");
        Ok(pair)
    }

    /// Verify an access token and return its subject. Stateless.
    pub fn verify_access(&self, token: &str) -> Result<DbId, CoreError> {
        self.verify(token, TokenType::Access).map(|claims| claims.sub)
    }

    /// Exchange a refresh token for a new pair, invalidating the presented one.
    ///
    /// Fails with [`CoreError::TokenReuseDetected`] when the presented token is
    /// well-formed and unexpired but no longer the stored one, including when
    /// a concurrent rotation with the same token won the swap first.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, CoreError> {
        let claims = self.verify(presented, TokenType::Refresh)?;
        let subject_id = claims.sub;

        let credential = self
            .credentials
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("Invalid refresh token".into()))?;

        let Some(stored) = credential.refresh_token_hash else {
            return Err(CoreError::Unauthorized("Session has ended".into()));
        };

        let presented_digest = hash_refresh_token(presented);
        if stored != presented_digest {
            tracing::warn!(subject_id, jti = %claims.jti, "Superseded refresh token presented");
            return Err(CoreError::TokenReuseDetected { subject_id });
        }

        let pair = self.issue(subject_id)?;
        let swapped = self
            .credentials
            .swap_refresh_token(
                subject_id,
                &presented_digest,
                &hash_refresh_token(&pair.refresh_token),
            )
            .await?;

        if !swapped {
            tracing::warn!(subject_id, jti = %claims.jti, "Lost refresh rotation race");
            return Err(CoreError::TokenReuseDetected { subject_id });
        }

        tracing::debug!(subject_id, "Refresh token rotated");
        Ok(pair)
    }

    /// End the subject's session. Idempotent.
    pub async fn revoke(&self, subject_id: DbId) -> Result<(), CoreError> {
        self.credentials
            .update_refresh_token(subject_id, None)
            .await?;
        tracing::info!(subject_id, "Session revoked");
        Ok(())
    }

    fn sign(
        &self,
        subject_id: DbId,
        iat: i64,
        exp: i64,
        typ: TokenType,
    ) -> Result<String, CoreError> {
        let claims = Claims {
            sub: subject_id,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
            typ,
        };
        encode_token(&claims, &self.config).map_err(|e| CoreError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, CoreError> {
        let claims = decode_token(token, &self.config)
            .map_err(|_| CoreError::Unauthorized("Invalid token".into()))?;

        if claims.typ != expected {
            return Err(CoreError::Unauthorized("Wrong token type".into()));
        }
        if self.clock.now() >= claims.exp {
            return Err(CoreError::Expired);
        }
        Ok(claims)
    }
}
