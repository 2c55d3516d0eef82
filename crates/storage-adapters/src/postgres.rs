//! # PostgreSQL store
//!
//! Maps the relational model onto the `domains` models. Status and priority
//! columns are plain text; rows are classified through
//! `Recorded::from_stored` so legacy spellings are never lost on read.

use async_trait::async_trait;
use domains::{
    Attachment, Complaint, ComplaintRepository, Credential, CredentialStore, DomainError,
    ListScope, NewComplaint, Normalization, Recorded, Result, Role, Status, User, UserRepository,
    Vocabulary,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const COMPLAINT_COLUMNS: &str = "id, subject, category, priority, status, location, landmark, \
     description, attachment, assigned_to, submitted_by, created_at";

/// One pool serving the complaints, users and credentials tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn db_err(err: sqlx::Error) -> DomainError {
    tracing::error!(error = %err, "postgres query failed");
    DomainError::internal(err)
}

fn complaint_from_row(row: &PgRow) -> std::result::Result<Complaint, sqlx::Error> {
    let attachment: Option<Json<Attachment>> = row.try_get("attachment")?;
    Ok(Complaint {
        id: row.try_get("id")?,
        subject: row.try_get("subject")?,
        category: row.try_get("category")?,
        priority: Recorded::from_stored(row.try_get::<&str, _>("priority")?),
        status: Recorded::from_stored(row.try_get::<&str, _>("status")?),
        location: row.try_get("location")?,
        landmark: row.try_get("landmark")?,
        description: row.try_get("description")?,
        attachment: attachment.map(|Json(a)| a),
        assigned_to: row.try_get("assigned_to")?,
        submitted_by: row.try_get("submitted_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn complaint_from_optional(row: Option<PgRow>) -> Result<Option<Complaint>> {
    row.as_ref().map(complaint_from_row).transpose().map_err(db_err)
}

#[async_trait]
impl ComplaintRepository for PgStore {
    /// `created_at` comes from the database clock.
    async fn create(&self, new: NewComplaint) -> Result<Complaint> {
        let sql = format!(
            "INSERT INTO complaints (id, subject, category, priority, status, location, landmark, \
             description, attachment, submitted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {COMPLAINT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.subject)
            .bind(&new.category)
            .bind(new.priority.wire())
            .bind(new.status.wire())
            .bind(&new.location)
            .bind(&new.landmark)
            .bind(&new.description)
            .bind(new.attachment.as_ref().map(Json))
            .bind(new.submitted_by)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        complaint_from_row(&row).map_err(db_err)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Complaint>> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        complaint_from_optional(row)
    }

    async fn list_newest_first(&self, scope: ListScope) -> Result<Vec<Complaint>> {
        let rows = match scope {
            ListScope::All => {
                let sql = format!(
                    "SELECT {COMPLAINT_COLUMNS} FROM complaints ORDER BY created_at DESC, id"
                );
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
            ListScope::SubmittedBy(user) => {
                let sql = format!(
                    "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE submitted_by = $1 \
                     ORDER BY created_at DESC, id"
                );
                sqlx::query(&sql).bind(user).fetch_all(&self.pool).await
            }
        }
        .map_err(db_err)?;

        rows.iter()
            .map(complaint_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn update_status(&self, id: Uuid, status: Status) -> Result<Option<Complaint>> {
        let sql = format!(
            "UPDATE complaints SET status = $2 WHERE id = $1 RETURNING {COMPLAINT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(status.wire())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        complaint_from_optional(row)
    }

    async fn normalize(&self, id: Uuid, fix: Normalization) -> Result<Option<Complaint>> {
        let sql = format!(
            "UPDATE complaints SET status = COALESCE($2, status), priority = COALESCE($3, priority) \
             WHERE id = $1 RETURNING {COMPLAINT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(fix.status.map(|s| s.wire()))
            .bind(fix.priority.map(|p| p.wire()))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        complaint_from_optional(row)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, user: User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, role, created_at) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(&user.email)
            .bind(user.role.wire())
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, role, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(row) = row else { return Ok(None) };
        let raw_role: String = row.try_get("role").map_err(db_err)?;
        let role = Role::from_wire(&raw_role).ok_or_else(|| {
            DomainError::Internal(format!("user {id} has unknown role '{raw_role}'"))
        })?;

        Ok(Some(User {
            id: row.try_get("id").map_err(db_err)?,
            email: row.try_get("email").map_err(db_err)?,
            role,
            created_at: row.try_get("created_at").map_err(db_err)?,
        }))
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert(&self, credential: Credential) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO credentials (user_id, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (email) DO NOTHING",
        )
        .bind(credential.user_id)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Auth("email already registered".into()));
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            "SELECT user_id, email, password_hash, created_at FROM credentials WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|row| -> std::result::Result<Credential, sqlx::Error> {
            Ok(Credential {
                user_id: row.try_get("user_id")?,
                email: row.try_get("email")?,
                password_hash: row.try_get("password_hash")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
        .map_err(db_err)
    }
}
