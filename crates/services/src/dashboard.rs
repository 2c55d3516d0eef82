//! # Dashboard projection
//!
//! Filtering and aggregate counts over a subscribed complaint set. Both are
//! pure functions of their inputs: the subscribed set is never mutated.

use domains::{Complaint, DomainError, Priority, Result, Status};
use serde::Serialize;

/// Filter value meaning "no restriction".
pub const ALL: &str = "All";

fn is_inactive(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None | Some("") => true,
        Some(v) => v.eq_ignore_ascii_case(ALL),
    }
}

/// The four independent dashboard predicates. A record is visible when it
/// satisfies every active one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    /// Lowercased; empty means inactive.
    search: String,
    pub category: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

/// One active predicate, kept separate so they can be applied in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Search(String),
    Category(String),
    Status(Status),
    Priority(Priority),
}

impl Predicate {
    pub fn matches(&self, c: &Complaint) -> bool {
        match self {
            Predicate::Search(needle) => c.mentions(needle),
            Predicate::Category(category) => c.category == *category,
            Predicate::Status(status) => c.status.is(*status),
            Predicate::Priority(priority) => c.priority.is(*priority),
        }
    }
}

impl DashboardFilter {
    /// Parses raw query values. `None`, empty and `"All"` disable a
    /// predicate; status and priority accept legacy spellings.
    pub fn parse(
        search: Option<&str>,
        category: Option<&str>,
        status: Option<&str>,
        priority: Option<&str>,
    ) -> Result<Self> {
        let status = match status {
            s if is_inactive(s) => None,
            Some(raw) => Some(raw.parse::<Status>().map_err(DomainError::Validation)?),
            None => None,
        };
        let priority = match priority {
            p if is_inactive(p) => None,
            Some(raw) => Some(raw.parse::<Priority>().map_err(DomainError::Validation)?),
            None => None,
        };
        let category = (!is_inactive(category))
            .then(|| category.map(|c| c.trim().to_string()))
            .flatten();

        Ok(Self::default()
            .with_search(search.unwrap_or_default())
            .with_category(category)
            .with_status(status)
            .with_priority(priority))
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.trim().to_lowercase();
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::with_capacity(4);
        if !self.search.is_empty() {
            out.push(Predicate::Search(self.search.clone()));
        }
        if let Some(category) = &self.category {
            out.push(Predicate::Category(category.clone()));
        }
        if let Some(status) = self.status {
            out.push(Predicate::Status(status));
        }
        if let Some(priority) = self.priority {
            out.push(Predicate::Priority(priority));
        }
        out
    }

    pub fn matches(&self, c: &Complaint) -> bool {
        self.predicates().iter().all(|p| p.matches(c))
    }

    /// Visible subset, order preserved.
    pub fn apply<'a>(&self, complaints: &'a [Complaint]) -> Vec<&'a Complaint> {
        let predicates = self.predicates();
        complaints
            .iter()
            .filter(|c| predicates.iter().all(|p| p.matches(c)))
            .collect()
    }
}

/// Aggregates over the unfiltered set.
///
/// `pending + in_progress + resolved + unrecognized == total`, so the three
/// canonical buckets never exceed `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub unrecognized: usize,
}

impl StatusCounts {
    pub fn tally(complaints: &[Complaint]) -> Self {
        let mut counts = Self { total: complaints.len(), ..Self::default() };
        for c in complaints {
            match c.status.canonical() {
                Some(Status::Pending) => counts.pending += 1,
                Some(Status::InProgress) => counts.in_progress += 1,
                Some(Status::Resolved) => counts.resolved += 1,
                None => counts.unrecognized += 1,
            }
        }
        if counts.unrecognized > 0 {
            tracing::warn!(
                unrecognized = counts.unrecognized,
                "complaints with unrecognized status counted in total only"
            );
        }
        counts
    }
}

/// What the dashboard renders: counts over everything, plus the filtered list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub counts: StatusCounts,
    pub complaints: Vec<Complaint>,
}

impl DashboardSnapshot {
    pub fn project(all: &[Complaint], filter: &DashboardFilter) -> Self {
        Self {
            counts: StatusCounts::tally(all),
            complaints: filter.apply(all).into_iter().cloned().collect(),
        }
    }
}
