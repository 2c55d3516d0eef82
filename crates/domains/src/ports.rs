//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Complaint, Credential, IssuedSession, ListScope, NewComplaint, Normalization, SessionClaims,
    StoredMedia, User,
};
use crate::vocabulary::Status;

/// Document-store contract for the `complaints` collection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ComplaintRepository: Send + Sync {
    /// Single atomic insert. The store assigns `id` and `created_at`.
    async fn create(&self, complaint: NewComplaint) -> Result<Complaint>;

    async fn get(&self, id: Uuid) -> Result<Option<Complaint>>;

    /// Newest first by `created_at`.
    async fn list_newest_first(&self, scope: ListScope) -> Result<Vec<Complaint>>;

    /// Mutates `status` only. `Ok(None)` when the id does not exist.
    async fn update_status(&self, id: Uuid, status: Status) -> Result<Option<Complaint>>;

    /// Rewrites legacy status/priority text with canonical values.
    async fn normalize(&self, id: Uuid, fix: Normalization) -> Result<Option<Complaint>>;
}

/// Document-store contract for the `users` collection.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
}

/// Storage for password credentials, used by identity providers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with `DomainError::Auth` when the email is already registered.
    async fn insert(&self, credential: Credential) -> Result<()>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>>;
}

/// Email/password authentication.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates a new identity and returns its user id.
    async fn register(&self, email: &str, password: &str) -> Result<Uuid>;

    /// Returns the user id for valid credentials, `DomainError::Auth` otherwise.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Uuid>;
}

/// Issues and verifies session tokens carrying the role claim.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self, user: &User) -> Result<IssuedSession>;

    /// `DomainError::Unauthorized` for malformed, expired or revoked tokens.
    async fn verify(&self, token: &str) -> Result<SessionClaims>;

    /// Invalidates the token until it would have expired anyway.
    async fn revoke(&self, token: &str) -> Result<()>;
}

/// Blob storage for complaint attachments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Saves raw bytes and returns the key and public URL.
    async fn save(&self, data: Bytes, content_type: &Mime) -> Result<StoredMedia>;

    /// Returns the URL for a previously stored key.
    fn url_for(&self, key: &str) -> String;
}
