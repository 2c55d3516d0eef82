//! # AuthService
//!
//! Signup, login and logout, plus token authorization for every protected
//! operation. Maintenance logins must also present the configured access
//! key; once issued, the role travels in the signed session claim and is
//! enforced on the server.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    normalize_email, DomainError, IdentityProvider, Result, Role, SessionClaims, SessionIssuer,
    User, UserRepository,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Where the client should navigate after an auth operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    Login,
    Signup,
    SubmitComplaint,
    MyComplaints,
    MaintenanceDashboard,
}

impl Landing {
    pub fn path(&self) -> &'static str {
        match self {
            Landing::Login => "/login",
            Landing::Signup => "/signup",
            Landing::SubmitComplaint => "/complaint",
            Landing::MyComplaints => "/my-complaints",
            Landing::MaintenanceDashboard => "/maintenance-dashboard",
        }
    }

    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Maintenance => Landing::MaintenanceDashboard,
            Role::Student | Role::Staff => Landing::MyComplaints,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: SecretString,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Student
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub maintenance_key: Option<SecretString>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    pub user: User,
    pub landing: Landing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub claims: SessionClaims,
    pub landing: Landing,
}

/// Fails with `Forbidden` unless the session belongs to maintenance staff.
pub fn require_maintenance(claims: &SessionClaims) -> Result<()> {
    if claims.is_maintenance() {
        Ok(())
    } else {
        Err(DomainError::Forbidden("maintenance role required".into()))
    }
}

pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionIssuer>,
    maintenance_key: SecretString,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionIssuer>,
        maintenance_key: SecretString,
    ) -> Self {
        Self { identity, users, sessions, maintenance_key }
    }

    /// Creates the identity and its role record. The caller is sent back to
    /// login; signup never starts a session.
    ///
    /// If an earlier signup registered the identity but failed to store the
    /// role record, repeating it with the same password stores the record.
    pub async fn signup(&self, req: SignupRequest) -> Result<SignupOutcome> {
        let user_id = match self
            .identity
            .register(&req.email, req.password.expose_secret())
            .await
        {
            Ok(user_id) => user_id,
            Err(err @ DomainError::Auth(_)) => match self.orphaned_identity(&req).await {
                Some(user_id) => {
                    tracing::warn!(%user_id, "identity without role record, completing signup");
                    user_id
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        };

        let user = User {
            id: user_id,
            email: normalize_email(&req.email),
            role: req.role,
            created_at: Utc::now(),
        };
        if let Err(err) = self.users.insert(user.clone()).await {
            tracing::error!(
                %user_id,
                error = %err,
                "identity registered but role record was not stored; repeat signup to repair"
            );
            return Err(err);
        }

        tracing::info!(%user_id, role = %user.role, "user signed up");
        Ok(SignupOutcome { user, landing: Landing::Login })
    }

    /// The id of an identity matching these credentials that has no role
    /// record yet.
    async fn orphaned_identity(&self, req: &SignupRequest) -> Option<Uuid> {
        let user_id = self
            .identity
            .authenticate(&req.email, req.password.expose_secret())
            .await
            .ok()?;
        match self.users.get(user_id).await {
            Ok(None) => Some(user_id),
            _ => None,
        }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginOutcome> {
        let user_id = self
            .identity
            .authenticate(&req.email, req.password.expose_secret())
            .await?;

        let user = self.users.get(user_id).await?.ok_or_else(|| {
            tracing::warn!(%user_id, "authenticated identity has no role record");
            DomainError::NoRoleRecord(user_id.to_string())
        })?;

        if user.role == Role::Maintenance && !self.key_matches(req.maintenance_key.as_ref()) {
            tracing::warn!(%user_id, "maintenance login with wrong access key");
            return Err(DomainError::InvalidKey);
        }

        let session = self.sessions.issue(&user).await?;
        tracing::info!(%user_id, role = %user.role, "login succeeded");

        Ok(LoginOutcome {
            token: session.token,
            claims: session.claims,
            landing: Landing::for_role(user.role),
        })
    }

    pub async fn logout(&self, token: &str) -> Result<Landing> {
        self.sessions.revoke(token).await?;
        Ok(Landing::Login)
    }

    pub async fn authorize(&self, token: &str) -> Result<SessionClaims> {
        self.sessions.verify(token).await
    }

    fn key_matches(&self, supplied: Option<&SecretString>) -> bool {
        let expected = self.maintenance_key.expose_secret().as_bytes();
        supplied.is_some_and(|key| key.expose_secret().as_bytes().ct_eq(expected).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{IssuedSession, MockIdentityProvider, MockSessionIssuer, MockUserRepository};

    const KEY: &str = "plant-room-7";

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn user(id: Uuid, role: Role) -> User {
        User { id, email: "u@college.edu".into(), role, created_at: Utc::now() }
    }

    fn issuing_sessions() -> MockSessionIssuer {
        let mut sessions = MockSessionIssuer::new();
        sessions.expect_issue().returning(|u| {
            Ok(IssuedSession {
                token: format!("token-{}", u.id),
                claims: SessionClaims {
                    user_id: u.id,
                    email: u.email.clone(),
                    role: u.role,
                    session_id: "jti".into(),
                    expires_at: Utc::now(),
                },
            })
        });
        sessions
    }

    fn service_with(role: Option<Role>, sessions: MockSessionIssuer) -> (AuthService, Uuid) {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity.expect_authenticate().returning(move |_, password| {
            if password == "secret1" {
                Ok(id)
            } else {
                Err(DomainError::Auth("invalid email or password".into()))
            }
        });
        let mut users = MockUserRepository::new();
        users.expect_get().returning(move |uid| Ok(role.map(|r| user(uid, r))));

        let svc = AuthService::new(Arc::new(identity), Arc::new(users), Arc::new(sessions), secret(KEY));
        (svc, id)
    }

    fn login_req(password: &str, key: Option<&str>) -> LoginRequest {
        LoginRequest {
            email: "u@college.edu".into(),
            password: secret(password),
            maintenance_key: key.map(secret),
        }
    }

    #[tokio::test]
    async fn test_student_lands_on_my_complaints() {
        let (svc, id) = service_with(Some(Role::Student), issuing_sessions());
        let outcome = svc.login(login_req("secret1", None)).await.unwrap();
        assert_eq!(outcome.landing, Landing::MyComplaints);
        assert_eq!(outcome.claims.user_id, id);
    }

    #[tokio::test]
    async fn test_maintenance_needs_matching_key() {
        let (svc, _) = service_with(Some(Role::Maintenance), issuing_sessions());
        let outcome = svc.login(login_req("secret1", Some(KEY))).await.unwrap();
        assert_eq!(outcome.landing, Landing::MaintenanceDashboard);
        assert_eq!(outcome.claims.role, Role::Maintenance);
    }

    #[tokio::test]
    async fn test_maintenance_wrong_or_missing_key_never_issues_session() {
        let mut sessions = MockSessionIssuer::new();
        sessions.expect_issue().never();
        let (svc, _) = service_with(Some(Role::Maintenance), sessions);

        for key in [None, Some("wrong"), Some("plant-room-77"), Some("")] {
            let err = svc.login(login_req("secret1", key)).await.unwrap_err();
            assert_eq!(err, DomainError::InvalidKey, "key {key:?}");
        }

        // Wrong credentials fail before the key is even considered.
        let err = svc.login(login_req("bad", Some("wrong"))).await.unwrap_err();
        assert!(matches!(err, DomainError::Auth(_)));
    }

    #[tokio::test]
    async fn test_missing_role_record() {
        let (svc, id) = service_with(None, issuing_sessions());
        let err = svc.login(login_req("secret1", None)).await.unwrap_err();
        assert_eq!(err, DomainError::NoRoleRecord(id.to_string()));
    }

    #[tokio::test]
    async fn test_signup_stores_role_and_routes_to_login() {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity.expect_register().returning(move |_, _| Ok(id));
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .withf(move |u| u.id == id && u.role == Role::Staff && u.email == "new@college.edu")
            .times(1)
            .returning(|_| Ok(()));
        let mut sessions = MockSessionIssuer::new();
        sessions.expect_issue().never();

        let svc = AuthService::new(Arc::new(identity), Arc::new(users), Arc::new(sessions), secret(KEY));
        let outcome = svc
            .signup(SignupRequest {
                email: " New@College.edu".into(),
                password: secret("secret1"),
                role: Role::Staff,
            })
            .await
            .unwrap();

        assert_eq!(outcome.landing, Landing::Login);
        assert_eq!(outcome.user.id, id);
    }

    fn signup_req(password: &str) -> SignupRequest {
        SignupRequest { email: "u@college.edu".into(), password: secret(password), role: Role::Student }
    }

    #[tokio::test]
    async fn test_failed_role_record_insert_is_reported() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_register().times(1).returning(|_, _| Ok(Uuid::new_v4()));
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .times(1)
            .returning(|_| Err(DomainError::Internal("users table offline".into())));

        let svc = AuthService::new(
            Arc::new(identity),
            Arc::new(users),
            Arc::new(MockSessionIssuer::new()),
            secret(KEY),
        );
        let err = svc.signup(signup_req("secret1")).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[tokio::test]
    async fn test_repeated_signup_repairs_missing_role_record() {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_register()
            .returning(|_, _| Err(DomainError::Auth("email already registered".into())));
        identity.expect_authenticate().returning(move |_, password| {
            if password == "secret1" {
                Ok(id)
            } else {
                Err(DomainError::Auth("invalid email or password".into()))
            }
        });
        let mut users = MockUserRepository::new();
        users.expect_get().returning(|_| Ok(None));
        users.expect_insert().withf(move |u| u.id == id).times(1).returning(|_| Ok(()));

        let svc = AuthService::new(
            Arc::new(identity),
            Arc::new(users),
            Arc::new(MockSessionIssuer::new()),
            secret(KEY),
        );

        // Someone else's password never claims the identity.
        let err = svc.signup(signup_req("guess")).await.unwrap_err();
        assert_eq!(err, DomainError::Auth("email already registered".into()));

        let outcome = svc.signup(signup_req("secret1")).await.unwrap();
        assert_eq!(outcome.user.id, id);
        assert_eq!(outcome.landing, Landing::Login);
    }

    #[tokio::test]
    async fn test_duplicate_signup_with_role_record_is_rejected() {
        let id = Uuid::new_v4();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_register()
            .returning(|_, _| Err(DomainError::Auth("email already registered".into())));
        identity.expect_authenticate().returning(move |_, _| Ok(id));
        let mut users = MockUserRepository::new();
        users.expect_get().returning(|uid| Ok(Some(user(uid, Role::Student))));
        users.expect_insert().never();

        let svc = AuthService::new(
            Arc::new(identity),
            Arc::new(users),
            Arc::new(MockSessionIssuer::new()),
            secret(KEY),
        );
        assert!(matches!(svc.signup(signup_req("secret1")).await, Err(DomainError::Auth(_))));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_routes_to_login() {
        let mut sessions = MockSessionIssuer::new();
        sessions.expect_revoke().withf(|t| t == "tok").times(1).returning(|_| Ok(()));
        let (svc, _) = service_with(Some(Role::Student), sessions);
        assert_eq!(svc.logout("tok").await.unwrap(), Landing::Login);
    }

    #[test]
    fn test_require_maintenance() {
        let mut claims = SessionClaims {
            user_id: Uuid::new_v4(),
            email: "a@b".into(),
            role: Role::Staff,
            session_id: "s".into(),
            expires_at: Utc::now(),
        };
        assert!(matches!(require_maintenance(&claims), Err(DomainError::Forbidden(_))));
        claims.role = Role::Maintenance;
        assert!(require_maintenance(&claims).is_ok());
    }
}
