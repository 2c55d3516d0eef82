//! # ComplaintService
//!
//! Submission, lifecycle updates and listings for complaints. Every write
//! publishes a [`ChangeEvent`] so live subscriptions re-deliver.

use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;
use domains::{
    Attachment, Complaint, ComplaintRepository, DomainError, ListScope, MediaStorage,
    NewComplaint, Priority, Result, SessionClaims, Status, TransitionPolicy, TransitionVerdict,
    INITIAL_STATUS,
};
use mime::Mime;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::auth::require_maintenance;
use crate::dashboard::{DashboardFilter, DashboardSnapshot};
use crate::feed::{ChangeEvent, ChangeFeed, RetryPolicy, Subscription};
use crate::migration::{normalize_legacy_records, NormalizationReport};

/// Default cap on decoded attachment size (5 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// A file as sent by the client: base64 text, optionally as a data URL
/// (`data:image/png;base64,....`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttachmentUpload {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub data_base64: String,
}

/// The submission form's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComplaintDraft {
    #[serde(default, alias = "title")]
    pub subject: Option<String>,
    #[serde(alias = "type")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Priority,
    pub location: String,
    #[serde(default, alias = "property")]
    pub landmark: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attachment: Option<AttachmentUpload>,
}

/// Accepts the same spellings as status updates ("High", "high priority")
/// and keeps the canonical value.
fn lenient_priority<'de, D>(deserializer: D) -> std::result::Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Decodes the transported text back into bytes and settles the MIME type:
/// explicit `content_type`, then the data-URL header, then the file
/// extension.
fn decode_upload(upload: &AttachmentUpload) -> Result<(Bytes, Mime)> {
    let raw = upload.data_base64.trim();
    let (declared, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| DomainError::Encoding("malformed data URL".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| DomainError::Encoding("data URL is not base64".into()))?;
            (Some(mime.to_string()).filter(|m| !m.is_empty()), data)
        }
        None => (None, raw),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| DomainError::Encoding(e.to_string()))?;
    if bytes.is_empty() {
        return Err(DomainError::Encoding("attachment is empty".into()));
    }

    let content_type = upload
        .content_type
        .clone()
        .or(declared)
        .and_then(|m| m.parse::<Mime>().ok())
        .unwrap_or_else(|| {
            mime_guess::from_path(upload.file_name.as_deref().unwrap_or_default())
                .first_or_octet_stream()
        });

    Ok((Bytes::from(bytes), content_type))
}

pub struct ComplaintService {
    repo: Arc<dyn ComplaintRepository>,
    media: Arc<dyn MediaStorage>,
    feed: ChangeFeed,
    policy: TransitionPolicy,
    retry: RetryPolicy,
    max_attachment_bytes: usize,
}

impl ComplaintService {
    pub fn new(repo: Arc<dyn ComplaintRepository>, media: Arc<dyn MediaStorage>) -> Self {
        Self {
            repo,
            media,
            feed: ChangeFeed::default(),
            policy: TransitionPolicy::default(),
            retry: RetryPolicy::default(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_attachment_bytes(mut self, max: usize) -> Self {
        self.max_attachment_bytes = max;
        self
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Validates the draft, stores any attachment, and inserts one complaint
    /// with status `Pending`.
    pub async fn submit(&self, submitted_by: Option<Uuid>, draft: ComplaintDraft) -> Result<Complaint> {
        let category = draft.category.trim().to_string();
        let location = draft.location.trim().to_string();
        if category.is_empty() {
            return Err(DomainError::Validation("complaint type is required".into()));
        }
        if location.is_empty() {
            return Err(DomainError::Validation("location is required".into()));
        }
        let subject =
            non_blank(draft.subject).unwrap_or_else(|| format!("{category} at {location}"));

        // Blobs are content-addressed and may be shared, so a failed insert
        // leaves the file in place; resubmitting reuses the same key.
        let attachment = match &draft.attachment {
            Some(upload) => Some(self.store_attachment(upload).await?),
            None => None,
        };

        let complaint = self
            .repo
            .create(NewComplaint {
                subject,
                category,
                priority: draft.priority,
                status: INITIAL_STATUS,
                location,
                landmark: non_blank(draft.landmark),
                description: non_blank(draft.description),
                attachment,
                submitted_by,
            })
            .await?;

        tracing::info!(
            complaint_id = %complaint.id,
            category = %complaint.category,
            priority = %draft.priority,
            "complaint submitted"
        );
        self.feed.publish(ChangeEvent::Created(complaint.id));
        Ok(complaint)
    }

    async fn store_attachment(&self, upload: &AttachmentUpload) -> Result<Attachment> {
        let (bytes, content_type) = decode_upload(upload)?;
        if bytes.len() > self.max_attachment_bytes {
            return Err(DomainError::Validation(format!(
                "attachment is {} bytes, limit is {}",
                bytes.len(),
                self.max_attachment_bytes
            )));
        }
        let size_bytes = bytes.len() as u64;
        let stored = self.media.save(bytes, &content_type).await?;
        Ok(Attachment {
            media_key: stored.key,
            url: stored.url,
            content_type: content_type.to_string(),
            size_bytes,
            file_name: non_blank(upload.file_name.clone()),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Complaint> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::complaint_not_found(id))
    }

    /// Detail view: maintenance sees everything, others only what they submitted.
    pub async fn get_for(&self, actor: &SessionClaims, id: Uuid) -> Result<Complaint> {
        let complaint = self.get(id).await?;
        if actor.is_maintenance() || complaint.submitted_by == Some(actor.user_id) {
            Ok(complaint)
        } else {
            Err(DomainError::Forbidden("complaint belongs to another user".into()))
        }
    }

    pub async fn list(&self, scope: ListScope) -> Result<Vec<Complaint>> {
        self.repo.list_newest_first(scope).await
    }

    /// Moves a complaint along its lifecycle. Only `status` is written.
    pub async fn update_status(&self, id: Uuid, next: Status) -> Result<Complaint> {
        let current = self.get(id).await?;

        match self.policy.check(&current.status, next)? {
            TransitionVerdict::Regular => {}
            TransitionVerdict::Anomalous(reason) => {
                tracing::warn!(complaint_id = %id, %reason, "anomalous status change");
            }
        }

        let updated = self
            .repo
            .update_status(id, next)
            .await?
            .ok_or_else(|| DomainError::complaint_not_found(id))?;

        tracing::info!(complaint_id = %id, from = %current.status, to = %next, "status updated");
        self.feed.publish(ChangeEvent::StatusChanged { id, status: next });
        Ok(updated)
    }

    /// `update_status` gated on the maintenance role claim.
    pub async fn update_status_as(&self, actor: &SessionClaims, id: Uuid, next: Status) -> Result<Complaint> {
        require_maintenance(actor)?;
        self.update_status(id, next).await
    }

    pub fn subscribe(&self, scope: ListScope) -> Subscription {
        Subscription::spawn(self.repo.clone(), &self.feed, scope, self.retry)
    }

    pub async fn dashboard(&self, filter: &DashboardFilter) -> Result<DashboardSnapshot> {
        let all = self.repo.list_newest_first(ListScope::All).await?;
        Ok(DashboardSnapshot::project(&all, filter))
    }

    /// Runs the legacy normalization pass and notifies subscribers of each
    /// rewritten record.
    pub async fn normalize_legacy(&self) -> Result<NormalizationReport> {
        let report = normalize_legacy_records(self.repo.as_ref()).await?;
        for id in &report.rewritten_ids {
            self.feed.publish(ChangeEvent::Normalized(*id));
        }
        Ok(report)
    }
}
