//! Bearer token verification.
//!
//! Tokens are ID tokens from a Cognito user pool, checked against the pool's
//! published signing keys. For local development a shared HS256 secret can
//! stand in for the user pool.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable subject identifier issued by the provider
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("Authorization header is malformed")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("no signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("authentication is not configured: set USER_POOL_ID and CLIENT_ID, or AUTH_JWT_SECRET")]
    NotConfigured,

    #[error("token generation failed: {0}")]
    TokenGeneration(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}

/// Turns a bearer token into verified claims or fails closed
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Minimum gap between two JWKS downloads. Unknown kids inside this window
/// are rejected from the cached set.
pub const JWKS_REFETCH_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Default)]
struct KeyCache {
    set: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

/// Verifies Cognito ID tokens (RS256) against the user pool's JWKS
pub struct CognitoVerifier {
    issuer: String,
    jwks_url: String,
    client_id: String,
    refetch_cooldown: std::time::Duration,
    http: reqwest::Client,
    keys: RwLock<KeyCache>,
}

impl CognitoVerifier {
    pub fn new(region: &str, user_pool_id: &str, client_id: &str) -> Self {
        let issuer = format!("https://cognito-idp.{}.amazonaws.com/{}", region, user_pool_id);
        let jwks_url = format!("{}/.well-known/jwks.json", issuer);
        Self::with_endpoints(issuer, jwks_url, client_id, JWKS_REFETCH_COOLDOWN)
    }

    pub(crate) fn with_endpoints(
        issuer: impl Into<String>,
        jwks_url: impl Into<String>,
        client_id: &str,
        refetch_cooldown: std::time::Duration,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            jwks_url: jwks_url.into(),
            client_id: client_id.to_string(),
            refetch_cooldown,
            http: reqwest::Client::new(),
            keys: RwLock::new(KeyCache::default()),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;
        let keys = response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;
        tracing::info!("Fetched {} signing keys from {}", keys.keys.len(), self.jwks_url);
        Ok(keys)
    }

    /// Cached key for `kid`. An unknown kid refreshes the set, at most once
    /// per cooldown; the refresh runs under the write lock so concurrent
    /// misses share one download.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.keys.read().await;
            if let Some(jwk) = cache.set.as_ref().and_then(|set| set.find(kid)) {
                return Ok(DecodingKey::from_jwk(jwk)?);
            }
        }

        let mut cache = self.keys.write().await;
        if let Some(jwk) = cache.set.as_ref().and_then(|set| set.find(kid)) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        let due = cache
            .fetched_at
            .map_or(true, |at| at.elapsed() >= self.refetch_cooldown);
        if !due {
            tracing::debug!("Unknown kid '{}' inside JWKS refetch cooldown", kid);
            return Err(AuthError::UnknownKey(kid.to_string()));
        }

        // Failed downloads count toward the cooldown too.
        cache.fetched_at = Some(Instant::now());
        cache.set = Some(self.fetch_keys().await?);

        let jwk = cache
            .set
            .as_ref()
            .and_then(|set| set.find(kid))
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}

#[async_trait]
impl IdentityVerifier for CognitoVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.client_id]);

        let claims = decode::<Claims>(token, &key, &validation)?.claims;
        if claims.token_use.as_deref() != Some("id") {
            return Err(AuthError::InvalidToken("token_use must be 'id'".to_string()));
        }
        Ok(claims)
    }
}

/// HS256 tokens signed with a shared secret
pub struct HmacVerifier {
    secret: String,
    audience: Option<String>,
}

impl HmacVerifier {
    pub fn new(secret: impl Into<String>, audience: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            audience,
        }
    }

    /// Sign a token for `sub` valid for `ttl`
    pub fn issue(&self, sub: &str, ttl: Duration) -> Result<String, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::NotConfigured);
        }
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            email: None,
            iss: None,
            token_use: Some("id".to_string()),
            aud: self.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for HmacVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        Ok(decode::<Claims>(token, &key, &validation)?.claims)
    }
}

/// Cognito pool ids are `<region>_<suffix>`
fn region_from_pool_id(user_pool_id: &str) -> Option<&str> {
    user_pool_id.split_once('_').map(|(region, _)| region)
}

/// Pick the verifier for the configured identity provider
pub fn verifier_from_config(config: &AuthConfig) -> Result<Arc<dyn IdentityVerifier>, AuthError> {
    if let (Some(pool), Some(client_id)) = (&config.user_pool_id, &config.client_id) {
        let region = config
            .region
            .as_deref()
            .or_else(|| region_from_pool_id(pool))
            .ok_or(AuthError::NotConfigured)?;
        tracing::info!("Verifying Cognito ID tokens from pool {} ({})", pool, region);
        return Ok(Arc::new(CognitoVerifier::new(region, pool, client_id)));
    }

    if let Some(secret) = &config.jwt_secret {
        tracing::warn!(
            "No user pool configured; accepting HS256 tokens signed with AUTH_JWT_SECRET"
        );
        return Ok(Arc::new(HmacVerifier::new(secret.clone(), config.client_id.clone())));
    }

    Err(AuthError::NotConfigured)
}
