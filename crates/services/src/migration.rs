//! One-time rewrite of legacy status/priority spellings.
//!
//! Older records used "In Progress", "completed", "High Priority" and
//! similar. Each record whose value resolves through the legacy parser is
//! rewritten in place with the canonical value; anything else is logged and
//! left for a human.

use domains::{ComplaintRepository, ListScope, Normalization, Recorded, Result};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub scanned: usize,
    pub rewritten: usize,
    pub unresolved: usize,
    #[serde(skip)]
    pub rewritten_ids: Vec<Uuid>,
}

pub async fn normalize_legacy_records(repo: &dyn ComplaintRepository) -> Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    for complaint in repo.list_newest_first(ListScope::All).await? {
        report.scanned += 1;

        let mut fix = Normalization::default();
        let mut unresolved = false;

        if let Recorded::Unrecognized(raw) = &complaint.status {
            match complaint.status.resolve() {
                Some(status) => fix.status = Some(status),
                None => {
                    tracing::warn!(complaint_id = %complaint.id, status = %raw, "status has no canonical form");
                    unresolved = true;
                }
            }
        }
        if let Recorded::Unrecognized(raw) = &complaint.priority {
            match complaint.priority.resolve() {
                Some(priority) => fix.priority = Some(priority),
                None => {
                    tracing::warn!(complaint_id = %complaint.id, priority = %raw, "priority has no canonical form");
                    unresolved = true;
                }
            }
        }

        if unresolved {
            report.unresolved += 1;
        }
        if fix.is_empty() {
            continue;
        }

        if repo.normalize(complaint.id, fix).await?.is_some() {
            report.rewritten += 1;
            report.rewritten_ids.push(complaint.id);
        }
    }

    tracing::info!(
        scanned = report.scanned,
        rewritten = report.rewritten,
        unresolved = report.unresolved,
        "legacy normalization finished"
    );
    Ok(report)
}
