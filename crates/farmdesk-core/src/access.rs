//! Role/permission gate.
//!
//! Every request is evaluated against a [`Scope`]: admin routes run in
//! the platform scope, app routes in the scope of one organization.
//! The gate is pure; callers look up the membership beforehand.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::FarmdeskError;
use crate::models::membership::OrgRole;
use crate::models::user::PlatformRole;

/// The visibility window a request operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Cross-tenant administration.
    Platform,
    /// A single organization.
    Organization(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    View,
    Edit,
    Manage,
}

/// An authenticated caller, as resolved from a session credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub session_id: Uuid,
    /// Role of the user the session belongs to. During impersonation
    /// this is the impersonated user's role.
    pub role: PlatformRole,
    pub impersonated_by: Option<Uuid>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == PlatformRole::Admin
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("platform administrator role required")]
    AdminRequired,

    #[error("not a member of organization {0}")]
    NotMember(Uuid),

    #[error("organization owner or admin role required")]
    ManagerRequired,

    #[error("organization owner role required")]
    OwnerRequired,
}

impl From<AccessDenied> for FarmdeskError {
    fn from(err: AccessDenied) -> Self {
        FarmdeskError::AuthorizationDenied {
            reason: err.to_string(),
        }
    }
}

/// Decide whether `principal` may perform `action` in `scope`.
///
/// `membership` is the principal's role in the scoped organization, if
/// any; it is ignored for the platform scope.
pub fn authorize(
    principal: &Principal,
    scope: Scope,
    membership: Option<OrgRole>,
    action: Action,
) -> Result<(), AccessDenied> {
    if principal.is_admin() {
        return Ok(());
    }

    match scope {
        Scope::Platform => Err(AccessDenied::AdminRequired),
        Scope::Organization(org_id) => {
            let role = membership.ok_or(AccessDenied::NotMember(org_id))?;
            match action {
                Action::View | Action::Edit => Ok(()),
                Action::Manage if role.can_manage() => Ok(()),
                Action::Manage => Err(AccessDenied::ManagerRequired),
            }
        }
    }
}

/// Decide whether `principal` may move a member of `org_id` from role
/// `from` to role `to`, where `None` means "not a member".
///
/// Any membership change needs [`Action::Manage`]. Granting, changing
/// or revoking the `Owner` role is reserved to owners and platform
/// admins.
pub fn authorize_role_change(
    principal: &Principal,
    org_id: Uuid,
    membership: Option<OrgRole>,
    from: Option<OrgRole>,
    to: Option<OrgRole>,
) -> Result<(), AccessDenied> {
    authorize(principal, Scope::Organization(org_id), membership, Action::Manage)?;
    let touches_owner = from == Some(OrgRole::Owner) || to == Some(OrgRole::Owner);
    if touches_owner && !principal.is_admin() && membership != Some(OrgRole::Owner) {
        return Err(AccessDenied::OwnerRequired);
    }
    Ok(())
}
