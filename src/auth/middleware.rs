//! The single verification-and-attachment stage in front of the `/api`
//! routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::header::AUTHORIZATION;
use tracing::debug;

use crate::api::AppState;
use crate::auth::context::CurrentUser;
use crate::auth::verifier::VerifyError;
use crate::error::ApiError;
use crate::types::SubjectId;

/// Authenticate the request and attach the corresponding user.
///
/// Rejections:
/// - no usable `Authorization` header: 401 "Authentication invalid";
/// - anything wrong with the presented token (scheme, structure, signature,
///   issuer, audience, expiry, unknown signing key): 401 "There was a problem
///   authorizing the request";
/// - key-set endpoint or store failure: 500 through [`ApiError::Internal`].
///
/// On success the user record is found or created (the write is awaited)
/// and [`CurrentUser`] is inserted into the request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(header) = header else {
        return ApiError::missing_credentials().into_response();
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return ApiError::not_authorized().into_response();
    };

    let claims = match state.verifier.verify(token).await {
        Ok(claims) => claims,
        Err(VerifyError::Keys(e)) if e.is_endpoint_failure() => {
            // The token might be fine; the key set could not be consulted.
            return ApiError::internal(state.environment, e).into_response();
        }
        Err(e) => {
            debug!("rejected bearer token: {}", e);
            return ApiError::not_authorized().into_response();
        }
    };

    let subject = SubjectId::new(claims.sub);
    let user = match state.users.find_or_create(&subject).await {
        Ok(user) => user,
        Err(e) => return ApiError::internal(state.environment, e).into_response(),
    };

    request
        .extensions_mut()
        .insert(CurrentUser::new(user.id, subject));

    next.run(request).await
}
