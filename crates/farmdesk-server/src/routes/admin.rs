//! `/api/admin` routes. Platform scope: every handler requires a
//! platform administrator.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use farmdesk_auth::{AuditEvent, CreateUserInput};
use farmdesk_core::Principal;
use farmdesk_core::models::audit::{AuditLogEntry, AuditOutcome};
use farmdesk_core::models::farmer::Farmer;
use farmdesk_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use farmdesk_core::models::session::Session;
use farmdesk_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use farmdesk_core::models::user::{PlatformRole, User};
use farmdesk_core::repository::{
    AuditLogFilter, AuditLogRepository, FarmerRepository, OrganizationRepository,
    PaginatedResult, TenantRepository, UserFilter,
};
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use super::auth::with_cookie;
use crate::error::ApiResult;
use crate::extract::{ClientInfo, CurrentSession};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(remove_user))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/ban", post(ban_user))
        .route("/users/{id}/unban", post(unban_user))
        .route("/users/{id}/impersonate", post(impersonate_user))
        .route(
            "/users/{id}/sessions",
            get(list_user_sessions).delete(revoke_user_sessions),
        )
        .route("/sessions/{id}", delete(revoke_session))
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/tenants/{id}",
            get(get_tenant).patch(update_tenant).delete(delete_tenant),
        )
        .route(
            "/organizations",
            get(list_organizations).post(create_organization),
        )
        .route(
            "/organizations/{id}",
            get(get_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
        .route("/farmers", get(list_farmers))
        .route("/audit", get(list_audit))
}

async fn audited(state: &AppState, actor: &Principal, action: &str, target: Uuid) {
    AuditEvent::new(action, AuditOutcome::Success)
        .actor(actor.user_id)
        .target(target)
        .record(&state.audit)
        .await;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<PlatformRole>,
    pub banned: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: PlatformRole,
}

fn default_role() -> PlatformRole {
    PlatformRole::User
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: PlatformRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct BanBody {
    pub reason: Option<String>,
    /// Ban length in seconds; permanent when absent.
    pub expires_in_secs: Option<u32>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Query(filter): Query<UserQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<User>>> {
    let filter = UserFilter {
        search: filter.search.filter(|s| !s.trim().is_empty()),
        role: filter.role,
        banned: filter.banned,
    };
    let users = state
        .admin
        .list_users(&current.principal, filter, page.into())
        .await?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .admin
        .create_user(
            &current.principal,
            CreateUserInput {
                email: body.email,
                name: body.name,
                password: body.password,
                role: body.role,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.admin.get_user(&current.principal, id).await?))
}

async fn remove_user(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.admin.remove_user(&current.principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleBody>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        state.admin.set_role(&current.principal, id, body.role).await?,
    ))
}

async fn ban_user(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
    Json(body): Json<BanBody>,
) -> ApiResult<Json<User>> {
    let user = state
        .admin
        .ban_user(
            &current.principal,
            id,
            body.reason.filter(|r| !r.trim().is_empty()),
            body.expires_in_secs.map(|secs| Duration::seconds(i64::from(secs))),
        )
        .await?;
    Ok(Json(user))
}

async fn unban_user(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.admin.unban_user(&current.principal, id).await?))
}

async fn impersonate_user(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    client: ClientInfo,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let tokens = state
        .admin
        .impersonate_user(&current.principal, id, client.ip_address, client.user_agent)
        .await?;
    with_cookie(&state, tokens)
}

async fn list_user_sessions(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(
        state.admin.list_user_sessions(&current.principal, id).await?,
    ))
}

async fn revoke_user_sessions(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .admin
        .revoke_user_sessions(&current.principal, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn revoke_session(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.admin.revoke_user_session(&current.principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

async fn list_tenants(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Tenant>>> {
    state
        .admin
        .require_admin(&current.principal, "admin.list_tenants")
        .await?;
    Ok(Json(state.tenants.list(page.into()).await?))
}

async fn create_tenant(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Json(body): Json<CreateTenant>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    state
        .admin
        .require_admin(&current.principal, "admin.create_tenant")
        .await?;
    let tenant = state.tenants.create(body).await?;
    audited(&state, &current.principal, "admin.create_tenant", tenant.id).await;
    Ok((StatusCode::CREATED, Json(tenant)))
}

async fn get_tenant(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Tenant>> {
    state
        .admin
        .require_admin(&current.principal, "admin.get_tenant")
        .await?;
    Ok(Json(state.tenants.get_by_id(id).await?))
}

async fn update_tenant(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTenant>,
) -> ApiResult<Json<Tenant>> {
    state
        .admin
        .require_admin(&current.principal, "admin.update_tenant")
        .await?;
    let tenant = state.tenants.update(id, body).await?;
    audited(&state, &current.principal, "admin.update_tenant", id).await;
    Ok(Json(tenant))
}

async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .admin
        .require_admin(&current.principal, "admin.delete_tenant")
        .await?;
    state.tenants.delete(id).await?;
    audited(&state, &current.principal, "admin.delete_tenant", id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationQuery {
    pub tenant_id: Option<Uuid>,
}

async fn list_organizations(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Query(filter): Query<OrganizationQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Organization>>> {
    state
        .admin
        .require_admin(&current.principal, "admin.list_organizations")
        .await?;
    Ok(Json(
        state
            .organizations
            .list(filter.tenant_id, page.into())
            .await?,
    ))
}

async fn create_organization(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Json(body): Json<CreateOrganization>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    state
        .admin
        .require_admin(&current.principal, "admin.create_organization")
        .await?;
    let organization = state.organizations.create(body).await?;
    audited(
        &state,
        &current.principal,
        "admin.create_organization",
        organization.id,
    )
    .await;
    Ok((StatusCode::CREATED, Json(organization)))
}

async fn get_organization(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Organization>> {
    state
        .admin
        .require_admin(&current.principal, "admin.get_organization")
        .await?;
    Ok(Json(state.organizations.get_by_id(id).await?))
}

async fn update_organization(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrganization>,
) -> ApiResult<Json<Organization>> {
    state
        .admin
        .require_admin(&current.principal, "admin.update_organization")
        .await?;
    let organization = state.organizations.update(id, body).await?;
    audited(&state, &current.principal, "admin.update_organization", id).await;
    Ok(Json(organization))
}

async fn delete_organization(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .admin
        .require_admin(&current.principal, "admin.delete_organization")
        .await?;
    state.organizations.delete(id).await?;
    audited(&state, &current.principal, "admin.delete_organization", id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Farmers & audit
// ---------------------------------------------------------------------------

async fn list_farmers(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Farmer>>> {
    state
        .admin
        .require_admin(&current.principal, "admin.list_farmers")
        .await?;
    Ok(Json(state.farmers.list_all(page.into()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub organization_id: Option<Uuid>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

async fn list_audit(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Query(query): Query<AuditQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<AuditLogEntry>>> {
    state
        .admin
        .require_admin(&current.principal, "admin.list_audit")
        .await?;
    let filter = AuditLogFilter {
        actor_id: query.actor_id,
        action: query.action,
        organization_id: query.organization_id,
        outcome: query.outcome,
        from: query.from,
        to: query.to,
    };
    Ok(Json(state.audit.list(filter, page.into()).await?))
}
