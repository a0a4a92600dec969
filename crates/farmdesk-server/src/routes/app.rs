//! `/api/app/{org_id}` routes. Every handler resolves the organization
//! scope first and only ever queries rows of that organization.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use farmdesk_auth::AuditEvent;
use farmdesk_core::Principal;
use farmdesk_core::FarmdeskError;
use farmdesk_core::access::{Action, authorize_role_change};
use farmdesk_core::models::audit::AuditOutcome;
use farmdesk_core::models::farmer::{CreateFarmer, Farmer, UpdateFarmer};
use farmdesk_core::models::farmer_group::{CreateFarmerGroup, FarmerGroup};
use farmdesk_core::models::membership::{CreateMembership, Membership, OrgRole};
use farmdesk_core::models::organization::Organization;
use farmdesk_core::repository::{
    FarmerGroupRepository, FarmerRepository, MembershipRepository, PaginatedResult, Pagination,
    UserRepository,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::PageQuery;
use crate::error::ApiResult;
use crate::extract::CurrentSession;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(overview))
        .route("/farmers", get(list_farmers).post(create_farmer))
        .route(
            "/farmers/{id}",
            get(get_farmer).patch(update_farmer).delete(delete_farmer),
        )
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}", get(get_group).delete(delete_group))
        .route("/members", get(list_members).post(add_member))
        .route(
            "/members/{user_id}",
            patch(update_member).delete(remove_member),
        )
}

async fn audited(state: &AppState, actor: &Principal, action: &str, org_id: Uuid, target: Uuid) {
    AuditEvent::new(action, AuditOutcome::Success)
        .actor(actor.user_id)
        .organization(org_id)
        .target(target)
        .record(&state.audit)
        .await;
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Overview {
    pub organization: Organization,
    /// `None` for platform admins who are not members.
    pub role: Option<OrgRole>,
    pub farmers: u64,
    pub groups: u64,
    pub members: u64,
}

async fn overview(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Overview>> {
    let scoped = state
        .org_scope
        .resolve(&current.principal, org_id, Action::View)
        .await?;
    let count_only = || Pagination {
        offset: 0,
        limit: 1,
    };
    let farmers = state.farmers.list(org_id, None, count_only()).await?.total;
    let groups = state.groups.list(org_id, count_only()).await?.total;
    let members = state
        .memberships
        .list_by_organization(org_id, count_only())
        .await?
        .total;

    Ok(Json(Overview {
        organization: scoped.organization,
        role: scoped.membership.map(|m| m.role),
        farmers,
        groups,
        members,
    }))
}

// ---------------------------------------------------------------------------
// Farmers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct FarmerQuery {
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFarmerBody {
    pub full_name: String,
    pub phone: Option<String>,
    pub village: Option<String>,
    pub group_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

/// Absent fields are left alone; explicit `null` clears them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFarmerBody {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub village: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub group_id: Option<Option<Uuid>>,
    pub metadata: Option<serde_json::Value>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

async fn list_farmers(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
    Query(filter): Query<FarmerQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Farmer>>> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::View)
        .await?;
    Ok(Json(
        state
            .farmers
            .list(org_id, filter.group_id, page.into())
            .await?,
    ))
}

async fn create_farmer(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateFarmerBody>,
) -> ApiResult<(StatusCode, Json<Farmer>)> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::Edit)
        .await?;
    let farmer = state
        .farmers
        .create(CreateFarmer {
            organization_id: org_id,
            full_name: body.full_name,
            phone: body.phone,
            village: body.village,
            group_id: body.group_id,
            metadata: body.metadata,
        })
        .await?;
    audited(&state, &current.principal, "farmer.create", org_id, farmer.id).await;
    Ok((StatusCode::CREATED, Json(farmer)))
}

async fn get_farmer(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Farmer>> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::View)
        .await?;
    Ok(Json(state.farmers.get_by_id(org_id, id).await?))
}

async fn update_farmer(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateFarmerBody>,
) -> ApiResult<Json<Farmer>> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::Edit)
        .await?;
    let farmer = state
        .farmers
        .update(
            org_id,
            id,
            UpdateFarmer {
                full_name: body.full_name,
                phone: body.phone,
                village: body.village,
                group_id: body.group_id,
                metadata: body.metadata,
            },
        )
        .await?;
    audited(&state, &current.principal, "farmer.update", org_id, id).await;
    Ok(Json(farmer))
}

async fn delete_farmer(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::Edit)
        .await?;
    state.farmers.delete(org_id, id).await?;
    audited(&state, &current.principal, "farmer.delete", org_id, id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Farmer groups
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateGroupBody {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

async fn list_groups(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<FarmerGroup>>> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::View)
        .await?;
    Ok(Json(state.groups.list(org_id, page.into()).await?))
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateGroupBody>,
) -> ApiResult<(StatusCode, Json<FarmerGroup>)> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::Edit)
        .await?;
    let group = state
        .groups
        .create(CreateFarmerGroup {
            organization_id: org_id,
            name: body.name,
            slug: body.slug,
            description: body.description,
        })
        .await?;
    audited(&state, &current.principal, "group.create", org_id, group.id).await;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn get_group(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<FarmerGroup>> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::View)
        .await?;
    Ok(Json(state.groups.get_by_id(org_id, id).await?))
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::Edit)
        .await?;
    state.groups.delete(org_id, id).await?;
    audited(&state, &current.principal, "group.delete", org_id, id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddMemberBody {
    pub email: String,
    #[serde(default = "default_member_role")]
    pub role: OrgRole,
}

fn default_member_role() -> OrgRole {
    OrgRole::Member
}

#[derive(Debug, Deserialize)]
pub struct MemberRoleBody {
    pub role: OrgRole,
}

async fn list_members(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Membership>>> {
    state
        .org_scope
        .resolve(&current.principal, org_id, Action::View)
        .await?;
    Ok(Json(
        state
            .memberships
            .list_by_organization(org_id, page.into())
            .await?,
    ))
}

/// Apply the ownership rules to a membership change of `target` from
/// `from` to `to`. The last owner can be neither demoted nor removed.
async fn guard_role_change(
    state: &AppState,
    actor: &Principal,
    actor_role: Option<OrgRole>,
    org_id: Uuid,
    target: Uuid,
    from: Option<OrgRole>,
    to: Option<OrgRole>,
) -> ApiResult<()> {
    if let Err(denied) = authorize_role_change(actor, org_id, actor_role, from, to) {
        AuditEvent::new("member.role_change", AuditOutcome::Denied)
            .actor(actor.user_id)
            .organization(org_id)
            .target(target)
            .metadata(serde_json::json!({ "reason": denied.to_string() }))
            .record(&state.audit)
            .await;
        return Err(FarmdeskError::from(denied).into());
    }

    if from == Some(OrgRole::Owner)
        && to != Some(OrgRole::Owner)
        && state.memberships.count_with_role(org_id, OrgRole::Owner).await? <= 1
    {
        return Err(
            FarmdeskError::validation("an organization must keep at least one owner").into(),
        );
    }
    Ok(())
}

/// Current role of `user_id` in the organization; 404 for non-members.
async fn member_role(state: &AppState, org_id: Uuid, user_id: Uuid) -> ApiResult<OrgRole> {
    match state.memberships.get(org_id, user_id).await? {
        Some(membership) => Ok(membership.role),
        None => Err(FarmdeskError::not_found("membership", user_id).into()),
    }
}

async fn add_member(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(org_id): Path<Uuid>,
    Json(body): Json<AddMemberBody>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    let actor_role = state
        .org_scope
        .resolve(&current.principal, org_id, Action::Manage)
        .await?
        .membership
        .map(|m| m.role);
    let user = state.users.get_by_email(&body.email).await?;
    guard_role_change(
        &state,
        &current.principal,
        actor_role,
        org_id,
        user.id,
        None,
        Some(body.role),
    )
    .await?;
    let membership = state
        .memberships
        .add(CreateMembership {
            organization_id: org_id,
            user_id: user.id,
            role: body.role,
        })
        .await?;
    audited(&state, &current.principal, "member.add", org_id, user.id).await;
    Ok((StatusCode::CREATED, Json(membership)))
}

async fn update_member(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MemberRoleBody>,
) -> ApiResult<Json<Membership>> {
    let actor_role = state
        .org_scope
        .resolve(&current.principal, org_id, Action::Manage)
        .await?
        .membership
        .map(|m| m.role);
    let from = member_role(&state, org_id, user_id).await?;
    guard_role_change(
        &state,
        &current.principal,
        actor_role,
        org_id,
        user_id,
        Some(from),
        Some(body.role),
    )
    .await?;
    let membership = state
        .memberships
        .update_role(org_id, user_id, body.role)
        .await?;
    audited(&state, &current.principal, "member.update_role", org_id, user_id).await;
    Ok(Json(membership))
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let actor_role = state
        .org_scope
        .resolve(&current.principal, org_id, Action::Manage)
        .await?
        .membership
        .map(|m| m.role);
    let from = member_role(&state, org_id, user_id).await?;
    guard_role_change(
        &state,
        &current.principal,
        actor_role,
        org_id,
        user_id,
        Some(from),
        None,
    )
    .await?;
    state.memberships.remove(org_id, user_id).await?;
    audited(&state, &current.principal, "member.remove", org_id, user_id).await;
    Ok(StatusCode::NO_CONTENT)
}
