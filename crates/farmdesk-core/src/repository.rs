//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Organization-scoped
//! repositories require an `organization_id` parameter on every call
//! to enforce data isolation.

use uuid::Uuid;

use crate::error::FarmdeskResult;
use crate::models::{
    audit::{AuditLogEntry, AuditOutcome, CreateAuditLogEntry},
    farmer::{CreateFarmer, Farmer, UpdateFarmer},
    farmer_group::{CreateFarmerGroup, FarmerGroup},
    membership::{CreateMembership, Membership, OrgRole},
    organization::{CreateOrganization, Organization, UpdateOrganization},
    session::{CreateSession, Session},
    tenant::{CreateTenant, Tenant, UpdateTenant},
    user::{CreateUser, PlatformRole, UpdateUser, User},
    verification::{CreateVerification, Verification},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenant & Organization (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = FarmdeskResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = FarmdeskResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = FarmdeskResult<Tenant>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<Tenant>>> + Send;
}

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = FarmdeskResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<Organization>> + Send;
    fn get_by_slug(
        &self,
        tenant_id: Uuid,
        slug: &str,
    ) -> impl Future<Output = FarmdeskResult<Organization>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrganization,
    ) -> impl Future<Output = FarmdeskResult<Organization>> + Send;
    /// Delete an organization together with its memberships, farmers
    /// and farmer groups.
    fn delete(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<()>> + Send;
    /// List organizations, optionally restricted to one tenant.
    fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<Organization>>> + Send;
}

// ---------------------------------------------------------------------------
// Users, sessions & verification tokens (global scope)
// ---------------------------------------------------------------------------

/// Query filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring match on email or name.
    pub search: Option<String>,
    pub role: Option<PlatformRole>,
    pub banned: Option<bool>,
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = FarmdeskResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = FarmdeskResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = FarmdeskResult<User>> + Send;
    /// Hard delete, including the user's sessions, memberships and
    /// verification tokens.
    fn delete(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<()>> + Send;
    fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<User>>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = FarmdeskResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = FarmdeskResult<Session>> + Send;
    /// All sessions of a user, newest first.
    fn list_by_user(&self, user_id: Uuid)
    -> impl Future<Output = FarmdeskResult<Vec<Session>>> + Send;
    /// Invalidate a single session.
    fn invalidate(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<()>> + Send;
    /// Invalidate all sessions for a user (e.g., on password change),
    /// optionally keeping one.
    fn invalidate_user_sessions(
        &self,
        user_id: Uuid,
        keep: Option<Uuid>,
    ) -> impl Future<Output = FarmdeskResult<()>> + Send;
    /// Remove all expired sessions.
    fn cleanup_expired(&self) -> impl Future<Output = FarmdeskResult<u64>> + Send;
}

pub trait VerificationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateVerification,
    ) -> impl Future<Output = FarmdeskResult<Verification>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = FarmdeskResult<Verification>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = FarmdeskResult<()>> + Send;
    fn delete_for_user(&self, user_id: Uuid) -> impl Future<Output = FarmdeskResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Memberships (user <-> organization)
// ---------------------------------------------------------------------------

pub trait MembershipRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the user is already a member.
    fn add(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = FarmdeskResult<Membership>> + Send;
    fn get(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<Option<Membership>>> + Send;
    fn update_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> impl Future<Output = FarmdeskResult<Membership>> + Send;
    fn remove(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<()>> + Send;
    fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<Membership>>> + Send;
    fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<Vec<Membership>>> + Send;
    fn count_with_role(
        &self,
        organization_id: Uuid,
        role: OrgRole,
    ) -> impl Future<Output = FarmdeskResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Farmers & farmer groups (organization scope)
// ---------------------------------------------------------------------------

pub trait FarmerRepository: Send + Sync {
    fn create(&self, input: CreateFarmer) -> impl Future<Output = FarmdeskResult<Farmer>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<Farmer>> + Send;
    fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateFarmer,
    ) -> impl Future<Output = FarmdeskResult<Farmer>> + Send;
    fn delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<()>> + Send;
    fn list(
        &self,
        organization_id: Uuid,
        group_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<Farmer>>> + Send;
    /// Cross-organization listing for platform administrators.
    fn list_all(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<Farmer>>> + Send;
}

pub trait FarmerGroupRepository: Send + Sync {
    fn create(
        &self,
        input: CreateFarmerGroup,
    ) -> impl Future<Output = FarmdeskResult<FarmerGroup>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<FarmerGroup>> + Send;
    /// Delete the group and detach its farmers.
    fn delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = FarmdeskResult<()>> + Send;
    fn list(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<FarmerGroup>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub organization_id: Option<Uuid>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = FarmdeskResult<AuditLogEntry>> + Send;
    /// Newest entries first.
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = FarmdeskResult<PaginatedResult<AuditLogEntry>>> + Send;
}
