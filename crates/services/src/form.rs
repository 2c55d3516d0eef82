//! Submission form state.

use domains::{Complaint, Result};
use uuid::Uuid;

use crate::complaints::{ComplaintDraft, ComplaintService};

/// Holds the draft between edits. A successful submit clears every field
/// back to its default; a failed one leaves them for retry.
#[derive(Debug, Clone, Default)]
pub struct ComplaintForm {
    pub draft: ComplaintDraft,
}

impl ComplaintForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pristine(&self) -> bool {
        self.draft == ComplaintDraft::default()
    }

    pub fn reset(&mut self) {
        self.draft = ComplaintDraft::default();
    }

    pub async fn submit(&mut self, service: &ComplaintService, submitted_by: Option<Uuid>) -> Result<Complaint> {
        let result = service.submit(submitted_by, self.draft.clone()).await;
        match &result {
            Ok(_) => self.reset(),
            Err(err) => tracing::debug!(error = %err, "submission failed, keeping form contents"),
        }
        result
    }
}
