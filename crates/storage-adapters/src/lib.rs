//! # storage-adapters
//!
//! Implementations of the persistence ports defined in `domains`:
//!
//! - [`memory`]: dashmap-backed document store, the default for development
//!   and tests.
//! - [`postgres`]: sqlx/PostgreSQL store (feature `db-postgres`).
//! - [`media`]: content-addressed local filesystem blob store
//!   (feature `media-local`).

pub mod memory;

#[cfg(feature = "media-local")]
pub mod media;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::{MemoryComplaintRepository, MemoryCredentialStore, MemoryUserRepository};

#[cfg(feature = "media-local")]
pub use media::LocalMediaStorage;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
