//! SurrealDB repository implementations.

mod audit;
mod farmer;
mod farmer_group;
mod membership;
mod organization;
mod session;
mod tenant;
mod user;
mod verification;

pub use audit::SurrealAuditLogRepository;
pub use farmer::SurrealFarmerRepository;
pub use farmer_group::SurrealFarmerGroupRepository;
pub use membership::SurrealMembershipRepository;
pub use organization::SurrealOrganizationRepository;
pub use session::SurrealSessionRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;
pub use verification::SurrealVerificationRepository;

use farmdesk_core::error::FarmdeskError;
use farmdesk_core::slug::to_slug;
use surrealdb_types::SurrealValue;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn total_of(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

/// Normalize the explicit slug when given, otherwise derive one from
/// `name`. Fails only when nothing slug-worthy is left.
pub(crate) fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, FarmdeskError> {
    let slug = to_slug(explicit.unwrap_or(name));
    if !slug.is_empty() {
        return Ok(slug);
    }
    Err(match explicit {
        Some(raw) => FarmdeskError::validation(format!("invalid slug: {raw:?}")),
        None => FarmdeskError::validation("name must contain at least one letter or digit"),
    })
}
