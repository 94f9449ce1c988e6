//! Bearer-token authentication and lazy user provisioning.
//!
//! Every request to the `/api` routes passes through a single
//! verification-and-attachment stage:
//!
//! 1. the `Authorization: Bearer <token>` header is required;
//! 2. the token is verified against the configured issuer, audience, and the
//!    remote key set (RS256, keys cached by [`JwksCache`]);
//! 3. a user record is found or created for the token subject; the write is
//!    awaited before the request proceeds;
//! 4. the resulting [`CurrentUser`] is attached to the request extensions for
//!    downstream handlers.
//!
//! Verification happens exactly once, here; there is no second defensive
//! header check deeper in the chain.

mod context;
pub mod jwks;
mod middleware;
mod user_store;
mod verifier;

pub use context::CurrentUser;
pub use jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache, JwksError};
pub use middleware::authenticate;
pub use user_store::UserStore;
pub use verifier::{AuthConfig, Claims, TokenVerifier, VerifyError};
