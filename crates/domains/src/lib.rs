//! # domains
//!
//! The central domain model and port definitions for the complaint portal.
//! Nothing in this crate performs I/O; adapters implement the traits in
//! [`ports`] and services orchestrate them.

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod ports;
pub mod vocabulary;

// Re-exporting for easier access in other crates
pub use error::*;
pub use lifecycle::*;
pub use models::*;
pub use ports::*;
pub use vocabulary::*;
