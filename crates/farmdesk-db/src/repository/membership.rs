//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Memberships are `member_of` graph edges from `user` to `organization`
//! carrying the organization role.

use chrono::{DateTime, Utc};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::membership::{CreateMembership, Membership, OrgRole};
use farmdesk_core::repository::{MembershipRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, total_of};
use crate::error::{DbError, parse_uuid};

const EDGE_FIELDS: &str = "meta::id(in) AS user_id, meta::id(out) AS organization_id, \
                           role, created_at";

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    user_id: String,
    organization_id: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            organization_id: parse_uuid("organization", &self.organization_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
        })
    }
}

/// Minimal edge projection used to detect whether a delete matched.
#[derive(Debug, SurrealValue)]
struct EdgeRoleRow {
    #[allow(dead_code)]
    role: String,
}

fn parse_role(s: &str) -> Result<OrgRole, DbError> {
    match s {
        "Owner" => Ok(OrgRole::Owner),
        "Admin" => Ok(OrgRole::Admin),
        "Member" => Ok(OrgRole::Member),
        other => Err(DbError::Decode(format!("unknown organization role: {other}"))),
    }
}

fn role_to_str(role: OrgRole) -> &'static str {
    match role {
        OrgRole::Owner => "Owner",
        OrgRole::Admin => "Admin",
        OrgRole::Member => "Member",
    }
}

#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn add(&self, input: CreateMembership) -> FarmdeskResult<Membership> {
        let user_id_str = input.user_id.to_string();
        let org_id_str = input.organization_id.to_string();

        // Both ends must exist before the edge is created.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE id = type::record('user', $user_id) GROUP ALL; \
                 SELECT count() AS total FROM organization \
                 WHERE id = type::record('organization', $org_id) GROUP ALL;",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("org_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let users: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total_of(&users) == 0 {
            return Err(DbError::not_found("user", user_id_str).into());
        }
        let orgs: Vec<CountRow> = check.take(1).map_err(DbError::from)?;
        if total_of(&orgs) == 0 {
            return Err(DbError::not_found("organization", org_id_str).into());
        }

        let query = format!(
            "RELATE user:`{user_id_str}` -> member_of -> organization:`{org_id_str}` \
             SET role = $role;"
        );
        self.db
            .query(query)
            .bind(("role", role_to_str(input.role).to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("membership", e))?;

        tracing::info!(
            user_id = %input.user_id,
            organization_id = %input.organization_id,
            role = role_to_str(input.role),
            "Membership added"
        );

        self.get(input.organization_id, input.user_id)
            .await?
            .ok_or_else(|| DbError::not_found("membership", user_id_str).into())
    }

    async fn get(&self, organization_id: Uuid, user_id: Uuid) -> FarmdeskResult<Option<Membership>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {EDGE_FIELDS} FROM member_of \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('organization', $org_id)"
            ))
            .bind(("user_id", user_id.to_string()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_membership())
            .transpose()?)
    }

    async fn update_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> FarmdeskResult<Membership> {
        self.db
            .query(
                "UPDATE member_of SET role = $role \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('organization', $org_id)",
            )
            .bind(("role", role_to_str(role).to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get(organization_id, user_id)
            .await?
            .ok_or_else(|| DbError::not_found("membership", user_id).into())
    }

    async fn remove(&self, organization_id: Uuid, user_id: Uuid) -> FarmdeskResult<()> {
        let mut result = self
            .db
            .query(
                "DELETE member_of \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('organization', $org_id) \
                 RETURN BEFORE",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let deleted: Vec<EdgeRoleRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::not_found("membership", user_id).into());
        }

        Ok(())
    }

    async fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<Membership>> {
        let org_id_str = organization_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of \
                 WHERE out = type::record('organization', $org_id) GROUP ALL",
            )
            .bind(("org_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(format!(
                "SELECT {EDGE_FIELDS} FROM member_of \
                 WHERE out = type::record('organization', $org_id) \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("org_id", org_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_membership())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_user(&self, user_id: Uuid) -> FarmdeskResult<Vec<Membership>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {EDGE_FIELDS} FROM member_of \
                 WHERE in = type::record('user', $user_id) \
                 ORDER BY created_at ASC"
            ))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let memberships = rows
            .into_iter()
            .map(|row| row.try_into_membership())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(memberships)
    }

    async fn count_with_role(&self, organization_id: Uuid, role: OrgRole) -> FarmdeskResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of \
                 WHERE out = type::record('organization', $org_id) \
                 AND role = $role GROUP ALL",
            )
            .bind(("org_id", organization_id.to_string()))
            .bind(("role", role_to_str(role).to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(total_of(&rows))
    }
}
