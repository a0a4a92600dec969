//! Farmdesk Core — domain models, repository traits, and the access
//! rules shared by every other crate.

pub mod access;
pub mod error;
pub mod models;
pub mod repository;
pub mod slug;

pub use access::{AccessDenied, Action, Principal, Scope};
pub use error::{FarmdeskError, FarmdeskResult};
