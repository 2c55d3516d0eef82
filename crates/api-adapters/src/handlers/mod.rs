//! Route handlers, grouped by the page they serve.

pub mod auth;
pub mod complaints;
pub mod dashboard;
pub mod health;

mod sse;
