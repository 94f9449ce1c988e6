//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! Decoding keys are cached by `kid` with a TTL. Fetches are spaced by a
//! minimum interval so a burst of unknown-`kid` tokens cannot hammer the
//! identity provider, and a bounded-staleness fallback keeps verification
//! working through short key-set endpoint outages.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Maximum age at which a stale cache may still serve keys (24 hours).
const MAX_STALE_SECONDS: u64 = 86400;

/// Minimum spacing between fetches from the key-set endpoint (~5 per minute).
const MIN_FETCH_INTERVAL: Duration = Duration::from_secs(12);

/// A single JSON Web Key from a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA")
    pub kty: String,
    /// Key ID, matched against the JWT header `kid`
    pub kid: Option<String>,
    /// Key use (e.g., "sig" for signature)
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url encoded)
    pub n: Option<String>,
    /// RSA exponent (base64url encoded)
    pub e: Option<String>,
}

/// A JWKS document containing multiple keys.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

#[derive(Default)]
struct CacheState {
    keys: HashMap<String, DecodingKey>,
    /// Last successful fetch.
    fetched_at: Option<Instant>,
    /// Last fetch attempt, successful or not; drives the fetch spacing.
    attempted_at: Option<Instant>,
}

impl CacheState {
    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(k) => self.keys.get(k).cloned(),
            // No kid in the token header: any signature key will do.
            None => self.keys.values().next().cloned(),
        }
    }

    fn age_within(&self, limit: Duration) -> bool {
        self.fetched_at.is_some_and(|t| t.elapsed() < limit)
    }
}

/// Thread-safe JWKS cache.
pub struct JwksCache {
    jwks_url: String,
    cache_ttl: Duration,
    allow_stale: bool,
    state: RwLock<CacheState>,
    client: reqwest::Client,
}

impl JwksCache {
    /// Create a new cache for the given JWKS endpoint.
    pub fn new(jwks_url: String, cache_ttl_seconds: u64, allow_stale: bool) -> Self {
        Self {
            jwks_url,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            allow_stale,
            state: RwLock::new(CacheState::default()),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Get a decoding key by key ID, fetching from the endpoint when the
    /// cache is stale or the key is unknown.
    ///
    /// If `kid` is `None`, the first available key is returned.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        let (cached, may_fetch) = {
            let state = self.state.read().await;
            let fresh = state.age_within(self.cache_ttl);
            let spaced = state
                .attempted_at
                .is_none_or(|t| t.elapsed() >= MIN_FETCH_INTERVAL);
            let hit = if fresh { state.lookup(kid) } else { None };
            (hit, spaced)
        };

        if let Some(key) = cached {
            return Ok(key);
        }

        if !may_fetch {
            // Within the fetch spacing window: serve whatever the cache has,
            // stale included, rather than hitting the endpoint again.
            let state = self.state.read().await;
            return state.lookup(kid).ok_or_else(|| Self::miss_error(kid));
        }

        match self.fetch_keys().await {
            Ok(()) => {
                let state = self.state.read().await;
                state.lookup(kid).ok_or_else(|| Self::miss_error(kid))
            }
            Err(e) => {
                if self.allow_stale {
                    let state = self.state.read().await;
                    if state.age_within(Duration::from_secs(MAX_STALE_SECONDS)) {
                        if let Some(key) = state.lookup(kid) {
                            warn!("JWKS fetch failed, using stale cache: {}", e);
                            return Ok(key);
                        }
                    }
                }
                Err(e)
            }
        }
    }

    fn miss_error(kid: Option<&str>) -> JwksError {
        match kid {
            Some(k) => JwksError::KeyNotFound(k.to_string()),
            None => JwksError::NoKeysAvailable,
        }
    }

    /// Fetch the key set from the endpoint and replace the cache.
    pub async fn fetch_keys(&self) -> Result<(), JwksError> {
        {
            let mut state = self.state.write().await;
            state.attempted_at = Some(Instant::now());
        }

        debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwksDocument = response
            .json()
            .await
            .map_err(|e| JwksError::Parse(e.to_string()))?;

        let mut new_keys = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                debug!("Skipping non-RSA key: {:?}", jwk.kty);
                continue;
            }
            if jwk.key_use.as_deref() == Some("enc") {
                debug!("Skipping encryption key");
                continue;
            }

            match Self::decoding_key(&jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| "default".to_string());
                    debug!("Cached key with kid: {}", kid);
                    new_keys.insert(kid, key);
                }
                Err(e) => {
                    warn!("Failed to parse JWK: {}", e);
                }
            }
        }

        if new_keys.is_empty() {
            return Err(JwksError::NoValidKeys);
        }

        let mut state = self.state.write().await;
        state.keys = new_keys;
        state.fetched_at = Some(Instant::now());
        debug!("Cached {} JWKS keys", state.keys.len());

        Ok(())
    }

    fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, JwksError> {
        let n = jwk
            .n
            .as_ref()
            .ok_or_else(|| JwksError::Parse("Missing 'n' in RSA key".to_string()))?;
        let e = jwk
            .e
            .as_ref()
            .ok_or_else(|| JwksError::Parse("Missing 'e' in RSA key".to_string()))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| JwksError::Parse(format!("Invalid RSA components: {}", e)))
    }

    /// Number of cached keys.
    pub async fn key_count(&self) -> usize {
        self.state.read().await.keys.len()
    }
}

/// Errors that can occur when resolving keys from the JWKS endpoint.
#[derive(Debug, Clone)]
pub enum JwksError {
    /// Failed to fetch the key set from the endpoint.
    Fetch(String),
    /// Failed to parse the key-set response.
    Parse(String),
    /// The document contained no usable signature keys.
    NoValidKeys,
    /// Key with the requested kid not found.
    KeyNotFound(String),
    /// No keys available at all.
    NoKeysAvailable,
}

impl std::fmt::Display for JwksError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "Failed to fetch JWKS: {}", msg),
            Self::Parse(msg) => write!(f, "Failed to parse JWKS: {}", msg),
            Self::NoValidKeys => write!(f, "No valid keys found in JWKS"),
            Self::KeyNotFound(kid) => write!(f, "Key not found: {}", kid),
            Self::NoKeysAvailable => write!(f, "No keys available in cache"),
        }
    }
}

impl std::error::Error for JwksError {}

impl JwksError {
    /// Whether this error means the key-set endpoint itself failed, as
    /// opposed to the presented token referencing an unknown key.
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Parse(_))
    }
}
