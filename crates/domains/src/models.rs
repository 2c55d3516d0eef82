//! # Domain Models
//!
//! These structs represent the core entities of the complaint portal.
//! Identifiers and `created_at` are assigned by the store; nothing above the
//! repository layer invents them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vocabulary::{Priority, Recorded, Role, Status};

/// A single maintenance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    #[serde(alias = "title")]
    pub subject: String,
    /// Open set (Library, Classroom, Electrical, Plumbing, ...)
    #[serde(alias = "type")]
    pub category: String,
    pub priority: Recorded<Priority>,
    pub status: Recorded<Status>,
    pub location: String,
    #[serde(alias = "property")]
    pub landmark: Option<String>,
    pub description: Option<String>,
    pub attachment: Option<Attachment>,
    pub assigned_to: Option<String>,
    /// Absent on records imported from before submitters were tracked.
    pub submitted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Complaint {
    /// Case-insensitive substring match on subject or description.
    /// `needle` must already be lowercased.
    pub fn mentions(&self, needle: &str) -> bool {
        self.subject.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Everything the store needs to create a complaint.
/// `id` and `created_at` are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComplaint {
    pub subject: String,
    pub category: String,
    pub priority: Priority,
    pub status: Status,
    pub location: String,
    pub landmark: Option<String>,
    pub description: Option<String>,
    pub attachment: Option<Attachment>,
    pub submitted_by: Option<Uuid>,
}

/// Reference to a file held by the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Key returned by `MediaStorage::save`.
    pub media_key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub file_name: Option<String>,
}

/// Result of persisting an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub key: String,
    pub url: String,
}

/// Which complaints a listing or subscription covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    SubmittedBy(Uuid),
}

impl ListScope {
    pub fn includes(&self, complaint: &Complaint) -> bool {
        match self {
            ListScope::All => true,
            ListScope::SubmittedBy(user) => complaint.submitted_by == Some(*user),
        }
    }
}

/// Canonical replacements for legacy values on one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalization {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

impl Normalization {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }
}

/// Role record, keyed by the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Password credential held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: Uuid,
    /// Lowercased and trimmed.
    pub email: String,
    /// PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Claims carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn is_maintenance(&self) -> bool {
        self.role == Role::Maintenance
    }
}

/// A freshly issued session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Normalizes an email for lookups and uniqueness checks.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
