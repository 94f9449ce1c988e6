//! Bearer-token verification against the configured issuer, audience, and
//! remote key set.

use std::fmt;

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::Deserialize;
use tracing::debug;

use crate::auth::jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache, JwksError};

/// Token-verification configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Expected token issuer.
    pub issuer: String,
    /// Expected token audience.
    pub audience: String,
    /// JWKS endpoint URL for key fetching.
    pub jwks_url: String,
    /// JWKS cache TTL in seconds.
    pub jwks_cache_seconds: u64,
    /// Whether to allow a stale JWKS cache when the endpoint is unreachable.
    pub allow_stale_jwks: bool,
}

impl AuthConfig {
    /// Create a config with the default cache behavior.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: jwks_url.into(),
            jwks_cache_seconds: DEFAULT_CACHE_TTL_SECONDS,
            allow_stale_jwks: true,
        }
    }
}

/// Claims this crate cares about; the rest of the payload is ignored.
#[derive(Debug, Deserialize)]
pub struct Claims {
    /// Subject identifier from the identity provider.
    pub sub: String,
    /// Expiration time (Unix timestamp); validated during decode.
    pub exp: u64,
}

/// Token-verification errors.
#[derive(Debug)]
pub enum VerifyError {
    /// The token could not be parsed at all.
    Malformed(String),
    /// Signature, issuer, audience, or expiry validation failed.
    Invalid(String),
    /// The decoding key could not be resolved.
    Keys(JwksError),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "Malformed token: {}", msg),
            Self::Invalid(msg) => write!(f, "Token validation failed: {}", msg),
            Self::Keys(e) => write!(f, "Key resolution failed: {}", e),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Verifies RS256 bearer tokens using keys from a [`JwksCache`].
pub struct TokenVerifier {
    validation: Validation,
    jwks: JwksCache,
}

impl TokenVerifier {
    /// Create a verifier for the given configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Self {
            validation,
            jwks: JwksCache::new(
                config.jwks_url.clone(),
                config.jwks_cache_seconds,
                config.allow_stale_jwks,
            ),
        }
    }

    /// Verify a bearer token (without the `Bearer ` scheme prefix) and return
    /// its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let header = decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;

        let key = self
            .jwks
            .get_key(header.kid.as_deref())
            .await
            .map_err(VerifyError::Keys)?;

        let data = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| VerifyError::Invalid(e.to_string()))?;

        debug!("token verified for subject: {}", data.claims.sub);
        Ok(data.claims)
    }
}
