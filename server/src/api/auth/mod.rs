//! Authentication module

pub mod context;
pub mod jwt;
mod manager;
pub mod middleware;
pub mod sync;

pub use context::Principal;
pub use jwt::TokenClaims;
pub use manager::AuthManager;
pub use middleware::{AuthError, AuthState, require_auth};
