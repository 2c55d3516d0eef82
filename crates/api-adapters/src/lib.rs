//! # api-adapters
//!
//! HTTP surface for the complaint portal (feature `web-axum`). Handlers
//! translate requests into service calls and map `DomainError` onto status
//! codes; no business rule lives here.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod session;

#[cfg(feature = "web-axum")]
mod router;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use router::{router, AppState};
