//! SurrealDB implementation of [`FarmerGroupRepository`].

use chrono::{DateTime, Utc};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::farmer_group::{CreateFarmerGroup, FarmerGroup};
use farmdesk_core::repository::{FarmerGroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, resolve_slug, total_of};
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct FarmerGroupRow {
    organization_id: String,
    name: String,
    slug: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FarmerGroupRow {
    fn into_group(self, id: Uuid) -> Result<FarmerGroup, DbError> {
        Ok(FarmerGroup {
            id,
            organization_id: parse_uuid("organization", &self.organization_id)?,
            name: self.name,
            slug: self.slug,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FarmerGroupRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    slug: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FarmerGroupRowWithId {
    fn try_into_group(self) -> Result<FarmerGroup, DbError> {
        let id = parse_uuid("farmer_group", &self.record_id)?;
        FarmerGroupRow {
            organization_id: self.organization_id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_group(id)
    }
}

#[derive(Clone)]
pub struct SurrealFarmerGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFarmerGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FarmerGroupRepository for SurrealFarmerGroupRepository<C> {
    async fn create(&self, input: CreateFarmerGroup) -> FarmdeskResult<FarmerGroup> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let slug = resolve_slug(input.slug.as_deref(), &input.name)?;

        let result = self
            .db
            .query(
                "CREATE type::record('farmer_group', $id) SET \
                 organization_id = $org_id, name = $name, slug = $slug, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("name", input.name))
            .bind(("slug", slug))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("farmer_group", e))?;

        let rows: Vec<FarmerGroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("farmer_group", &id_str))?;

        Ok(row.into_group(id)?)
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> FarmdeskResult<FarmerGroup> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('farmer_group', $id) \
                 WHERE organization_id = $org_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FarmerGroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("farmer_group", &id_str))?;

        Ok(row.into_group(id)?)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> FarmdeskResult<()> {
        let id_str = id.to_string();
        let org_id_str = organization_id.to_string();

        let mut result = self
            .db
            .query(
                "DELETE type::record('farmer_group', $id) \
                 WHERE organization_id = $org_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let deleted: Vec<FarmerGroupRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::not_found("farmer_group", id_str).into());
        }

        // Farmers stay in the organization, just without a group.
        self.db
            .query(
                "UPDATE farmer SET group_id = NONE, updated_at = time::now() \
                 WHERE organization_id = $org_id AND group_id = $id",
            )
            .bind(("id", id_str))
            .bind(("org_id", org_id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<FarmerGroup>> {
        let org_id_str = organization_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM farmer_group \
                 WHERE organization_id = $org_id GROUP ALL",
            )
            .bind(("org_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM farmer_group \
                 WHERE organization_id = $org_id \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("org_id", org_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FarmerGroupRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
