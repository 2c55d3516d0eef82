//! # In-memory document store
//!
//! DashMap-backed implementations of the repository ports. State lives for
//! the lifetime of the process.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    Complaint, ComplaintRepository, Credential, CredentialStore, DomainError, ListScope,
    NewComplaint, Normalization, Recorded, Result, Status, User, UserRepository,
};
use uuid::Uuid;

/// Strictly increasing store clock.
///
/// Two inserts inside the same microsecond still get distinct, ordered
/// timestamps, so newest-first listings are total.
#[derive(Debug, Default)]
struct StoreClock {
    last_micros: AtomicI64,
}

impl StoreClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self.last_micros.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
                Err(actual) => prev = actual,
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryComplaintRepository {
    complaints: DashMap<Uuid, Complaint>,
    clock: StoreClock,
}

impl MemoryComplaintRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports an existing record verbatim, legacy values included.
    pub fn import(&self, complaint: Complaint) {
        self.complaints.insert(complaint.id, complaint);
    }

    pub fn len(&self) -> usize {
        self.complaints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.complaints.is_empty()
    }
}

#[async_trait]
impl ComplaintRepository for MemoryComplaintRepository {
    async fn create(&self, new: NewComplaint) -> Result<Complaint> {
        let complaint = Complaint {
            id: Uuid::new_v4(),
            subject: new.subject,
            category: new.category,
            priority: new.priority.into(),
            status: new.status.into(),
            location: new.location,
            landmark: new.landmark,
            description: new.description,
            attachment: new.attachment,
            assigned_to: None,
            submitted_by: new.submitted_by,
            created_at: self.clock.now(),
        };
        self.complaints.insert(complaint.id, complaint.clone());
        Ok(complaint)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Complaint>> {
        Ok(self.complaints.get(&id).map(|c| c.value().clone()))
    }

    async fn list_newest_first(&self, scope: ListScope) -> Result<Vec<Complaint>> {
        let mut list: Vec<Complaint> = self
            .complaints
            .iter()
            .filter(|c| scope.includes(c.value()))
            .map(|c| c.value().clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn update_status(&self, id: Uuid, status: Status) -> Result<Option<Complaint>> {
        Ok(self.complaints.get_mut(&id).map(|mut c| {
            c.status = Recorded::Canonical(status);
            c.value().clone()
        }))
    }

    async fn normalize(&self, id: Uuid, fix: Normalization) -> Result<Option<Complaint>> {
        Ok(self.complaints.get_mut(&id).map(|mut c| {
            if let Some(status) = fix.status {
                c.status = Recorded::Canonical(status);
            }
            if let Some(priority) = fix.priority {
                c.priority = Recorded::Canonical(priority);
            }
            c.value().clone()
        }))
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, User>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: User) -> Result<()> {
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }
}

/// Credentials keyed by normalized email.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    by_email: DashMap<String, Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, credential: Credential) -> Result<()> {
        match self.by_email.entry(credential.email.clone()) {
            Entry::Occupied(_) => Err(DomainError::Auth("email already registered".into())),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        Ok(self.by_email.get(email).map(|c| c.value().clone()))
    }
}
