//! Argon2-based implementation of `IdentityProvider`.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use domains::{normalize_email, Credential, CredentialStore, DomainError, IdentityProvider, Result};
use uuid::Uuid;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Generic message for every credential failure so callers cannot tell
/// which emails are registered.
const BAD_CREDENTIALS: &str = "invalid email or password";

pub struct Argon2IdentityProvider {
    store: Arc<dyn CredentialStore>,
}

impl Argon2IdentityProvider {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

/// Hashing is CPU-bound; keep it off the async workers.
async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(DomainError::internal)
    })
    .await
    .map_err(DomainError::internal)?
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(DomainError::internal)
}

#[async_trait]
impl IdentityProvider for Argon2IdentityProvider {
    async fn register(&self, email: &str, password: &str) -> Result<Uuid> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(DomainError::Auth("invalid email address".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::Auth(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let credential = Credential {
            user_id: Uuid::new_v4(),
            email,
            password_hash: hash_password(password.to_string()).await?,
            created_at: Utc::now(),
        };
        let user_id = credential.user_id;
        self.store.insert(credential).await?;

        tracing::info!(%user_id, "identity registered");
        Ok(user_id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Uuid> {
        let email = normalize_email(email);
        let Some(credential) = self.store.find_by_email(&email).await? else {
            tracing::debug!("login for unknown email");
            return Err(DomainError::Auth(BAD_CREDENTIALS.into()));
        };

        if verify_password(password.to_string(), credential.password_hash).await? {
            Ok(credential.user_id)
        } else {
            tracing::debug!(user_id = %credential.user_id, "password mismatch");
            Err(DomainError::Auth(BAD_CREDENTIALS.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_adapters::MemoryCredentialStore;

    fn provider() -> Argon2IdentityProvider {
        Argon2IdentityProvider::new(Arc::new(MemoryCredentialStore::new()))
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let idp = provider();
        let id = idp.register("Student@College.edu ", "secret1").await.unwrap();

        let authed = idp.authenticate("student@college.edu", "secret1").await.unwrap();
        assert_eq!(authed, id);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_identical() {
        let idp = provider();
        idp.register("a@college.edu", "secret1").await.unwrap();

        let wrong = idp.authenticate("a@college.edu", "nope123").await.unwrap_err();
        let unknown = idp.authenticate("b@college.edu", "secret1").await.unwrap_err();
        assert_eq!(wrong, unknown);
        assert!(matches!(wrong, DomainError::Auth(_)));
    }

    #[tokio::test]
    async fn test_duplicate_and_weak_registrations_fail() {
        let idp = provider();
        idp.register("a@college.edu", "secret1").await.unwrap();

        assert!(matches!(
            idp.register("A@college.edu", "secret2").await,
            Err(DomainError::Auth(_))
        ));
        assert!(matches!(idp.register("c@college.edu", "123").await, Err(DomainError::Auth(_))));
        assert!(matches!(idp.register("not-an-email", "secret1").await, Err(DomainError::Auth(_))));
    }
}
