//! # auth-adapters
//!
//! Implementations of the identity and session ports:
//!
//! - [`password::Argon2IdentityProvider`]: email/password identities hashed
//!   with Argon2id, persisted through any `CredentialStore`.
//! - [`jwt::JwtSessionIssuer`]: HS256 session tokens carrying the role claim,
//!   with server-side revocation (feature `auth-jwt`).

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2IdentityProvider;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtSessionIssuer;
