// Core modules
pub mod api;
mod auth;
mod config;
mod db;
mod error;
pub mod server;
mod types;

// Re-export key types and functions
pub use auth::{
    AuthConfig, Claims, CurrentUser, JwksCache, JwksError, TokenVerifier, UserStore, VerifyError,
};
pub use config::{Environment, ServerConfig};
pub use db::{DatabaseConfig, Db, UserRecord, create_connection, ensure_schema};
pub use error::{ApiError, ErrorBody};
pub use server::{Server, ShutdownReason};
pub use types::SubjectId;
