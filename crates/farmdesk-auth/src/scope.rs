//! Organization-scoped request resolution.

use farmdesk_core::access::{Action, Principal, Scope, authorize};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::audit::AuditOutcome;
use farmdesk_core::models::membership::Membership;
use farmdesk_core::models::organization::Organization;
use farmdesk_core::repository::{
    AuditLogRepository, MembershipRepository, OrganizationRepository,
};
use tracing::debug;
use uuid::Uuid;

use crate::audit::AuditEvent;

/// An organization the caller has been cleared to act in.
#[derive(Debug, Clone)]
pub struct ScopedOrganization {
    pub organization: Organization,
    /// `None` when a platform admin acts without being a member.
    pub membership: Option<Membership>,
}

/// Resolves `/{org_id}` path segments into a checked organization scope.
pub struct OrganizationScope<O, M, A>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    A: AuditLogRepository,
{
    organizations: O,
    memberships: M,
    audit: A,
}

impl<O, M, A> OrganizationScope<O, M, A>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    A: AuditLogRepository,
{
    pub fn new(organizations: O, memberships: M, audit: A) -> Self {
        Self {
            organizations,
            memberships,
            audit,
        }
    }

    /// Load the organization and check that `principal` may perform
    /// `action` inside it. A missing organization is `NotFound`; a
    /// denial is audited before it is returned.
    pub async fn resolve(
        &self,
        principal: &Principal,
        organization_id: Uuid,
        action: Action,
    ) -> FarmdeskResult<ScopedOrganization> {
        let organization = self.organizations.get_by_id(organization_id).await?;
        let membership = self
            .memberships
            .get(organization_id, principal.user_id)
            .await?;

        if let Err(denied) = authorize(
            principal,
            Scope::Organization(organization_id),
            membership.as_ref().map(|m| m.role),
            action,
        ) {
            debug!(user_id = %principal.user_id, %organization_id, ?action, "Organization access denied");
            AuditEvent::new("organization.access", AuditOutcome::Denied)
                .actor(principal.user_id)
                .organization(organization_id)
                .metadata(serde_json::json!({ "action": action }))
                .record(&self.audit)
                .await;
            return Err(denied.into());
        }

        Ok(ScopedOrganization {
            organization,
            membership,
        })
    }
}
