//! Shared application state.

use farmdesk_auth::{AdminService, AuthConfig, AuthService, OrganizationScope};
use farmdesk_db::repository::{
    SurrealAuditLogRepository, SurrealFarmerGroupRepository, SurrealFarmerRepository,
    SurrealMembershipRepository, SurrealOrganizationRepository, SurrealSessionRepository,
    SurrealTenantRepository, SurrealUserRepository, SurrealVerificationRepository,
};
use farmdesk_mail::Mailer;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

pub type Users = SurrealUserRepository<Any>;
pub type Sessions = SurrealSessionRepository<Any>;
pub type Audit = SurrealAuditLogRepository<Any>;
pub type Organizations = SurrealOrganizationRepository<Any>;
pub type Memberships = SurrealMembershipRepository<Any>;

pub struct AppState {
    pub auth: AuthService<Users, Sessions, SurrealVerificationRepository<Any>, Audit>,
    pub admin: AdminService<Users, Sessions, Audit>,
    pub org_scope: OrganizationScope<Organizations, Memberships, Audit>,
    pub users: Users,
    pub tenants: SurrealTenantRepository<Any>,
    pub organizations: Organizations,
    pub memberships: Memberships,
    pub farmers: SurrealFarmerRepository<Any>,
    pub groups: SurrealFarmerGroupRepository<Any>,
    pub audit: Audit,
    /// Add `Secure` to the session cookie.
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(db: Surreal<Any>, auth_config: AuthConfig, mailer: Mailer, secure_cookies: bool) -> Self {
        Self {
            auth: AuthService::new(
                SurrealUserRepository::new(db.clone()),
                SurrealSessionRepository::new(db.clone()),
                SurrealVerificationRepository::new(db.clone()),
                SurrealAuditLogRepository::new(db.clone()),
                mailer,
                auth_config.clone(),
            ),
            admin: AdminService::new(
                SurrealUserRepository::new(db.clone()),
                SurrealSessionRepository::new(db.clone()),
                SurrealAuditLogRepository::new(db.clone()),
                auth_config,
            ),
            org_scope: OrganizationScope::new(
                SurrealOrganizationRepository::new(db.clone()),
                SurrealMembershipRepository::new(db.clone()),
                SurrealAuditLogRepository::new(db.clone()),
            ),
            users: SurrealUserRepository::new(db.clone()),
            tenants: SurrealTenantRepository::new(db.clone()),
            organizations: SurrealOrganizationRepository::new(db.clone()),
            memberships: SurrealMembershipRepository::new(db.clone()),
            farmers: SurrealFarmerRepository::new(db.clone()),
            groups: SurrealFarmerGroupRepository::new(db.clone()),
            audit: SurrealAuditLogRepository::new(db),
            secure_cookies,
        }
    }
}
