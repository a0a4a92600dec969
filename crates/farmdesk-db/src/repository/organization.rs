//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use farmdesk_core::repository::{OrganizationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, resolve_slug, total_of};
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    tenant_id: String,
    name: String,
    slug: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self, id: Uuid) -> Result<Organization, DbError> {
        Ok(Organization {
            id,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            slug: self.slug,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    slug: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRowWithId {
    fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid("organization", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            slug: self.slug,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> FarmdeskResult<Organization> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let tenant_id_str = input.tenant_id.to_string();
        let slug = resolve_slug(input.slug.as_deref(), &input.name)?;
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        // The owning tenant must exist.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM tenant \
                 WHERE id = type::record('tenant', $tenant_id) GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let tenants: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total_of(&tenants) == 0 {
            return Err(DbError::not_found("tenant", tenant_id_str).into());
        }

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 tenant_id = $tenant_id, name = $name, slug = $slug, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id_str))
            .bind(("name", input.name))
            .bind(("slug", slug))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("organization", e))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organization", &id_str))?;

        tracing::info!(organization_id = %id, tenant_id = %input.tenant_id, "Organization created");
        Ok(row.into_organization(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FarmdeskResult<Organization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('organization', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organization", &id_str))?;

        Ok(row.into_organization(id)?)
    }

    async fn get_by_slug(&self, tenant_id: Uuid, slug: &str) -> FarmdeskResult<Organization> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM organization \
                 WHERE tenant_id = $tenant_id AND slug = $slug",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("slug", slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organization", format!("slug={slug}")))?;

        Ok(row.try_into_organization()?)
    }

    async fn update(&self, id: Uuid, input: UpdateOrganization) -> FarmdeskResult<Organization> {
        let id_str = id.to_string();
        let slug = match input.slug {
            Some(ref slug) => Some(resolve_slug(Some(slug), "")?),
            None => None,
        };

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if slug.is_some() {
            sets.push("slug = $slug");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('organization', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(slug) = slug {
            builder = builder.bind(("slug", slug));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("organization", e))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organization", &id_str))?;

        Ok(row.into_organization(id)?)
    }

    async fn delete(&self, id: Uuid) -> FarmdeskResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("DELETE type::record('organization', $id) RETURN BEFORE")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let deleted: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::not_found("organization", id_str).into());
        }

        // Organization-scoped data goes with it.
        self.db
            .query(
                "DELETE member_of WHERE out = type::record('organization', $id); \
                 DELETE farmer WHERE organization_id = $id; \
                 DELETE farmer_group WHERE organization_id = $id;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        tracing::info!(organization_id = %id, "Organization deleted");
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<Organization>> {
        let filter = if tenant_id.is_some() {
            "WHERE tenant_id = $tenant_id"
        } else {
            ""
        };
        let tenant_id_str = tenant_id.map(|t| t.to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM organization {filter} GROUP ALL"
            ))
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM organization {filter} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_organization())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
