//! Domain models for Farmdesk.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod farmer;
pub mod farmer_group;
pub mod membership;
pub mod organization;
pub mod session;
pub mod tenant;
pub mod user;
pub mod verification;
