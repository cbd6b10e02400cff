//! # Auth Module
//!
//! Team managers: accounts, password hashing, refresh-token sessions and
//! JWT access tokens.

pub mod context;
pub mod crypto;
pub mod errors;
pub mod jwt;
pub mod service;
pub mod session;
pub mod user;

pub use context::AuthContext;
pub use crypto::PasswordPolicy;
pub use errors::{AuthError, AuthResult};
pub use jwt::{JwtConfig, JwtManager, TokenResponse};
pub use service::AuthService;
pub use session::{InMemorySessionRepository, SessionConfig, SessionManager};
pub use user::{User, UserRepository};
