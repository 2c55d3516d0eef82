//! JWT implementation of `SessionIssuer`.
//!
//! The role travels inside the signed token, so authorization decisions are
//! made on the server from a claim the client cannot forge. Logout records
//! the token id in a revocation list until the token would have expired.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use domains::{DomainError, IssuedSession, Result, Role, SessionClaims, SessionIssuer, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: Uuid,
    email: String,
    role: Role,
    jti: String,
    iat: i64,
    exp: i64,
}

pub struct JwtSessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    /// jti -> exp (unix seconds)
    revoked: DashMap<String, i64>,
}

impl JwtSessionIssuer {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl,
            revoked: DashMap::new(),
        }
    }

    fn decode_claims(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                DomainError::Unauthorized("invalid or expired session".into())
            })
    }

    /// Drops revocation entries whose tokens have expired on their own.
    fn prune_revoked(&self) {
        let now = Utc::now().timestamp();
        self.revoked.retain(|_, exp| *exp > now);
    }
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

#[async_trait]
impl SessionIssuer for JwtSessionIssuer {
    async fn issue(&self, user: &User) -> Result<IssuedSession> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(DomainError::internal)?;

        Ok(IssuedSession {
            token,
            claims: SessionClaims {
                user_id: claims.sub,
                email: claims.email,
                role: claims.role,
                session_id: claims.jti,
                expires_at: to_datetime(claims.exp),
            },
        })
    }

    async fn verify(&self, token: &str) -> Result<SessionClaims> {
        let claims = self.decode_claims(token)?;
        if self.revoked.contains_key(&claims.jti) {
            return Err(DomainError::Unauthorized("session has been logged out".into()));
        }
        Ok(SessionClaims {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            session_id: claims.jti,
            expires_at: to_datetime(claims.exp),
        })
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let claims = self.decode_claims(token)?;
        self.prune_revoked();
        self.revoked.insert(claims.jti.clone(), claims.exp);
        tracing::info!(user_id = %claims.sub, session = %claims.jti, "session revoked");
        Ok(())
    }
}
