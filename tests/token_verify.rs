//! Verifier and key-cache behavior against a mock identity provider.

mod common;

use tollgate::{AuthConfig, JwksCache, TokenVerifier, VerifyError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{JWKS_PATH, TEST_AUDIENCE, TEST_ISSUER, TEST_KID, issue_token, issue_token_with, jwks_body};

fn auth_config(jwks_base: &str) -> AuthConfig {
    AuthConfig::new(
        TEST_ISSUER,
        TEST_AUDIENCE,
        format!("{}{}", jwks_base, JWKS_PATH),
    )
}

#[tokio::test]
async fn test_valid_token_yields_claims() {
    let mock = common::start_jwks_server().await;
    let verifier = TokenVerifier::new(&auth_config(&mock.uri()));

    let claims = verifier.verify(&issue_token("auth0|alice")).await.unwrap();
    assert_eq!(claims.sub, "auth0|alice");
}

#[tokio::test]
async fn test_expired_token_is_invalid() {
    let mock = common::start_jwks_server().await;
    let verifier = TokenVerifier::new(&auth_config(&mock.uri()));

    let token = issue_token_with("auth0|alice", TEST_ISSUER, TEST_AUDIENCE, TEST_KID, -3600);
    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(VerifyError::Invalid(_))));
}

#[tokio::test]
async fn test_wrong_issuer_is_invalid() {
    let mock = common::start_jwks_server().await;
    let verifier = TokenVerifier::new(&auth_config(&mock.uri()));

    let token = issue_token_with(
        "auth0|alice",
        "https://somebody-else.test/",
        TEST_AUDIENCE,
        TEST_KID,
        3600,
    );
    assert!(matches!(verifier.verify(&token).await, Err(VerifyError::Invalid(_))));
}

#[tokio::test]
async fn test_wrong_audience_is_invalid() {
    let mock = common::start_jwks_server().await;
    let verifier = TokenVerifier::new(&auth_config(&mock.uri()));

    let token = issue_token_with("auth0|alice", TEST_ISSUER, "another-api", TEST_KID, 3600);
    assert!(matches!(verifier.verify(&token).await, Err(VerifyError::Invalid(_))));
}

#[tokio::test]
async fn test_unknown_kid_is_a_key_error() {
    let mock = common::start_jwks_server().await;
    let verifier = TokenVerifier::new(&auth_config(&mock.uri()));

    let token = issue_token_with("auth0|alice", TEST_ISSUER, TEST_AUDIENCE, "rotated-away", 3600);
    assert!(matches!(verifier.verify(&token).await, Err(VerifyError::Keys(_))));
}

#[tokio::test]
async fn test_jwks_fetched_once_within_ttl() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .expect(1)
        .mount(&mock)
        .await;

    let cache = JwksCache::new(format!("{}{}", mock.uri(), JWKS_PATH), 3600, true);

    cache.get_key(Some(TEST_KID)).await.unwrap();
    cache.get_key(Some(TEST_KID)).await.unwrap();
    assert_eq!(cache.key_count().await, 1);
}

#[tokio::test]
async fn test_fetch_spacing_serves_stale_cache() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .expect(1)
        .mount(&mock)
        .await;

    // TTL of zero: the cache is stale immediately, but the second call lands
    // inside the fetch-spacing window and must be served from the cache
    // instead of a second request.
    let cache = JwksCache::new(format!("{}{}", mock.uri(), JWKS_PATH), 0, true);

    cache.get_key(Some(TEST_KID)).await.unwrap();
    cache.get_key(Some(TEST_KID)).await.unwrap();
}

#[tokio::test]
async fn test_endpoint_failure_without_cache_is_an_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock)
        .await;

    let cache = JwksCache::new(format!("{}{}", mock.uri(), JWKS_PATH), 3600, true);

    let result = cache.get_key(Some(TEST_KID)).await;
    assert!(result.is_err());
    assert!(result.unwrap_err().is_endpoint_failure());
}
