//! Client-side view state for the live listings.
//!
//! Each view owns a [`Subscription`] and keeps whatever it last delivered.
//! Closing or dropping the view releases the subscription.

use domains::{Complaint, ListScope, Recorded, Result, Status};
use uuid::Uuid;

use crate::complaints::ComplaintService;
use crate::dashboard::{DashboardFilter, StatusCounts};
use crate::feed::Subscription;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    Ready(Vec<Complaint>),
    /// The subscription failed and has stopped. The message is user-facing.
    Failed(String),
}

/// Pulls one delivery into `state`. Returns `false` once the subscription
/// is over, whether it ended cleanly or with an error.
async fn pull(subscription: &mut Option<Subscription>, state: &mut ViewState) -> bool {
    let Some(sub) = subscription.as_mut() else {
        return false;
    };
    match sub.next().await {
        Some(Ok(snapshot)) => {
            *state = ViewState::Ready(snapshot);
            true
        }
        Some(Err(err)) => {
            tracing::warn!(error = %err, "live listing failed");
            *state = ViewState::Failed(err.to_string());
            *subscription = None;
            false
        }
        None => {
            *subscription = None;
            false
        }
    }
}

/// The signed-in user's own complaints, newest first.
pub struct MyComplaintsView {
    subscription: Option<Subscription>,
    state: ViewState,
}

impl MyComplaintsView {
    pub fn open(service: &ComplaintService, user_id: Uuid) -> Self {
        Self {
            subscription: Some(service.subscribe(ListScope::SubmittedBy(user_id))),
            state: ViewState::Loading,
        }
    }

    /// Waits for the next push and stores it.
    pub async fn refresh(&mut self) -> bool {
        pull(&mut self.subscription, &mut self.state).await
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn close(&mut self) {
        self.subscription = None;
    }
}

/// Maintenance dashboard: the full set, filters, and the single editable field.
pub struct DashboardView {
    subscription: Option<Subscription>,
    state: ViewState,
    filter: DashboardFilter,
}

impl DashboardView {
    pub fn open(service: &ComplaintService) -> Self {
        Self {
            subscription: Some(service.subscribe(ListScope::All)),
            state: ViewState::Loading,
            filter: DashboardFilter::default(),
        }
    }

    pub async fn refresh(&mut self) -> bool {
        pull(&mut self.subscription, &mut self.state).await
    }

    /// Replaces the held set, e.g. from a snapshot fetched out of band.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Complaint>) {
        self.state = ViewState::Ready(snapshot);
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    fn all(&self) -> &[Complaint] {
        match &self.state {
            ViewState::Ready(all) => all,
            _ => &[],
        }
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(self.all())
    }

    pub fn visible(&self) -> Vec<&Complaint> {
        self.filter.apply(self.all())
    }

    pub fn filter(&self) -> &DashboardFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: DashboardFilter) {
        self.filter = filter;
    }

    /// Read-only detail from the held set; no backend call.
    pub fn detail(&self, id: Uuid) -> Option<&Complaint> {
        self.all().iter().find(|c| c.id == id)
    }

    /// Patches the held record first, then writes through the service. On
    /// failure the patch is reverted and the error returned for display.
    pub async fn apply_status_update(
        &mut self,
        service: &ComplaintService,
        id: Uuid,
        next: Status,
    ) -> Result<Complaint> {
        let previous = self.patch_status(id, Recorded::Canonical(next));

        match service.update_status(id, next).await {
            Ok(updated) => {
                if let ViewState::Ready(all) = &mut self.state {
                    if let Some(slot) = all.iter_mut().find(|c| c.id == id) {
                        *slot = updated.clone();
                    }
                }
                Ok(updated)
            }
            Err(err) => {
                if let Some(previous) = previous {
                    self.patch_status(id, previous);
                }
                tracing::warn!(complaint_id = %id, error = %err, "status update rolled back");
                Err(err)
            }
        }
    }

    /// Swaps the held status, returning what was there.
    fn patch_status(&mut self, id: Uuid, status: Recorded<Status>) -> Option<Recorded<Status>> {
        let ViewState::Ready(all) = &mut self.state else {
            return None;
        };
        let slot = all.iter_mut().find(|c| c.id == id)?;
        Some(std::mem::replace(&mut slot.status, status))
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn close(&mut self) {
        self.subscription = None;
    }
}
