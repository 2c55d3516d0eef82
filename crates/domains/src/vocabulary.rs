//! # Vocabulary
//!
//! Closed enumerations for complaint status, priority and user role.
//!
//! Older records were written with several spellings for the same value
//! ("In Progress", "in-progress", "completed", "High Priority", ...). Those
//! spellings are accepted by the `from_legacy` parsers only; everything this
//! crate writes uses the canonical wire form. Values read back from storage
//! are wrapped in [`Recorded`] so that unknown spellings survive a round trip
//! instead of being dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A closed set of values with one canonical wire spelling each.
pub trait Vocabulary: Copy + Eq + fmt::Debug + Sized + 'static {
    /// Every member, in display order.
    const ALL: &'static [Self];

    /// The canonical spelling persisted and returned by the API.
    fn wire(&self) -> &'static str;

    /// Parses the canonical spelling only.
    fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.wire() == raw)
    }

    /// Parses canonical and historical spellings.
    fn from_legacy(raw: &str) -> Option<Self>;
}

/// Lowercases and strips separators so "In Progress", "in-progress" and
/// "in_progress" compare equal.
fn squash(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
}

impl Vocabulary for Status {
    const ALL: &'static [Self] = &[Self::Pending, Self::InProgress, Self::Resolved];

    fn wire(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    fn from_legacy(raw: &str) -> Option<Self> {
        match squash(raw).as_str() {
            "pending" => Some(Self::Pending),
            "inprogress" => Some(Self::InProgress),
            "resolved" | "completed" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        })
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_legacy(s).ok_or_else(|| format!("unknown status '{s}'"))
    }
}

// ── Priority ────────────────────────────────────────────────────────────────

/// Urgency assigned by the submitter. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Vocabulary for Priority {
    const ALL: &'static [Self] = &[Self::Low, Self::Medium, Self::High];

    fn wire(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn from_legacy(raw: &str) -> Option<Self> {
        let squashed = squash(raw);
        let word = squashed.strip_suffix("priority").unwrap_or(&squashed);
        match word {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_legacy(s).ok_or_else(|| format!("unknown priority '{s}'"))
    }
}

// ── Role ────────────────────────────────────────────────────────────────────

/// Role stored on the user record; drives routing and authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Staff,
    Maintenance,
}

impl Vocabulary for Role {
    const ALL: &'static [Self] = &[Self::Student, Self::Staff, Self::Maintenance];

    fn wire(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Maintenance => "maintenance",
        }
    }

    fn from_legacy(raw: &str) -> Option<Self> {
        Self::from_wire(squash(raw).as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_legacy(s).ok_or_else(|| format!("unknown role '{s}'"))
    }
}

// ── Recorded ────────────────────────────────────────────────────────────────

/// A vocabulary value as found in storage.
///
/// Serializes as a plain string: the canonical spelling, or the raw stored
/// text for values no parser recognises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded<T> {
    Canonical(T),
    Unrecognized(String),
}

impl<T: Vocabulary> Recorded<T> {
    /// Classifies raw stored text. Only the canonical spelling is accepted
    /// here; historical spellings stay `Unrecognized` until the
    /// normalization pass rewrites them.
    pub fn from_stored(raw: &str) -> Self {
        T::from_wire(raw)
            .map(Self::Canonical)
            .unwrap_or_else(|| Self::Unrecognized(raw.to_string()))
    }

    pub fn canonical(&self) -> Option<T> {
        match self {
            Self::Canonical(v) => Some(*v),
            Self::Unrecognized(_) => None,
        }
    }

    /// The canonical value this record would normalize to, if any.
    pub fn resolve(&self) -> Option<T> {
        match self {
            Self::Canonical(v) => Some(*v),
            Self::Unrecognized(raw) => T::from_legacy(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(v) => v.wire(),
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is(&self, value: T) -> bool {
        self.canonical() == Some(value)
    }
}

impl<T> From<T> for Recorded<T> {
    fn from(value: T) -> Self {
        Self::Canonical(value)
    }
}

impl<T: Vocabulary> fmt::Display for Recorded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T: Vocabulary> Serialize for Recorded<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, T: Vocabulary> Deserialize<'de> for Recorded<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_stored(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_legacy_spellings() {
        for raw in ["Pending", "pending", " PENDING "] {
            assert_eq!(Status::from_legacy(raw), Some(Status::Pending), "{raw}");
        }
        for raw in ["In Progress", "in-progress", "in_progress", "InProgress"] {
            assert_eq!(Status::from_legacy(raw), Some(Status::InProgress), "{raw}");
        }
        for raw in ["Resolved", "completed", "Completed"] {
            assert_eq!(Status::from_legacy(raw), Some(Status::Resolved), "{raw}");
        }
        assert_eq!(Status::from_legacy("closed"), None);
    }

    #[test]
    fn priority_accepts_suffixed_form() {
        assert_eq!(Priority::from_legacy("High Priority"), Some(Priority::High));
        assert_eq!(Priority::from_legacy("high"), Some(Priority::High));
        assert_eq!(Priority::from_legacy("Low Priority"), Some(Priority::Low));
        assert_eq!(Priority::from_legacy("Urgent"), None);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn recorded_keeps_unknown_text() {
        let legacy: Recorded<Status> = Recorded::from_stored("In Progress");
        assert_eq!(legacy, Recorded::Unrecognized("In Progress".into()));
        assert_eq!(legacy.canonical(), None);
        assert_eq!(legacy.resolve(), Some(Status::InProgress));

        let canonical: Recorded<Status> = Recorded::from_stored("in_progress");
        assert!(canonical.is(Status::InProgress));
    }

    #[test]
    fn recorded_serializes_as_plain_string() {
        let value = serde_json::to_value(Recorded::Canonical(Status::Resolved)).unwrap();
        assert_eq!(value, serde_json::json!("resolved"));

        let back: Recorded<Priority> = serde_json::from_value(serde_json::json!("High Priority")).unwrap();
        assert_eq!(back, Recorded::Unrecognized("High Priority".into()));
    }

    #[test]
    fn role_round_trips_wire_form() {
        for role in Role::ALL {
            assert_eq!(role.wire().parse::<Role>().unwrap(), *role);
        }
    }
}
