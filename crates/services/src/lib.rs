//! # services
//!
//! Application logic for the complaint portal. Services orchestrate the
//! ports from `domains`; they never touch HTTP, SQL or the filesystem
//! directly.
//!
//! - [`complaints`]: submission, lifecycle updates, listings, live
//!   subscriptions.
//! - [`auth`]: signup, login with the maintenance gate, logout, token
//!   authorization.
//! - [`dashboard`]: filter predicates and aggregate counts.
//! - [`feed`]: change notifications and the subscription handle.
//! - [`form`] / [`views`]: client-side state for the submission form, the
//!   my-complaints list and the maintenance dashboard.
//! - [`migration`]: one-time rewrite of legacy status/priority spellings.

pub mod auth;
pub mod complaints;
pub mod dashboard;
pub mod feed;
pub mod form;
pub mod migration;
pub mod views;

pub use auth::{require_maintenance, AuthService, Landing, LoginOutcome, LoginRequest, SignupOutcome, SignupRequest};
pub use complaints::{AttachmentUpload, ComplaintDraft, ComplaintService};
pub use dashboard::{DashboardFilter, DashboardSnapshot, StatusCounts};
pub use feed::{ChangeEvent, ChangeFeed, RetryPolicy, Subscription};
pub use form::ComplaintForm;
pub use migration::{normalize_legacy_records, NormalizationReport};
pub use views::{DashboardView, MyComplaintsView, ViewState};
