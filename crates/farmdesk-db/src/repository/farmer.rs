//! SurrealDB implementation of [`FarmerRepository`].
//!
//! Every query filters on `organization_id`; a farmer id from another
//! organization behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use farmdesk_core::error::{FarmdeskError, FarmdeskResult};
use farmdesk_core::models::farmer::{CreateFarmer, Farmer, UpdateFarmer};
use farmdesk_core::repository::{FarmerRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, total_of};
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct FarmerRow {
    organization_id: String,
    full_name: String,
    phone: Option<String>,
    village: Option<String>,
    group_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FarmerRow {
    fn into_farmer(self, id: Uuid) -> Result<Farmer, DbError> {
        Ok(Farmer {
            id,
            organization_id: parse_uuid("organization", &self.organization_id)?,
            full_name: self.full_name,
            phone: self.phone,
            village: self.village,
            group_id: self
                .group_id
                .as_deref()
                .map(|g| parse_uuid("farmer_group", g))
                .transpose()?,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FarmerRowWithId {
    record_id: String,
    organization_id: String,
    full_name: String,
    phone: Option<String>,
    village: Option<String>,
    group_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FarmerRowWithId {
    fn try_into_farmer(self) -> Result<Farmer, DbError> {
        let id = parse_uuid("farmer", &self.record_id)?;
        FarmerRow {
            organization_id: self.organization_id,
            full_name: self.full_name,
            phone: self.phone,
            village: self.village,
            group_id: self.group_id,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_farmer(id)
    }
}

fn check_full_name(name: &str) -> Result<String, FarmdeskError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FarmdeskError::validation("full_name must not be empty"));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct SurrealFarmerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFarmerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// A farmer may only join a group of its own organization.
    async fn ensure_group_in_org(&self, organization_id: Uuid, group_id: Uuid) -> FarmdeskResult<()> {
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM farmer_group \
                 WHERE id = type::record('farmer_group', $group_id) \
                 AND organization_id = $org_id GROUP ALL",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total_of(&rows) == 0 {
            return Err(DbError::not_found("farmer_group", group_id).into());
        }
        Ok(())
    }

    async fn page(
        &self,
        where_clause: &str,
        org_id: Option<String>,
        group_id: Option<String>,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<Farmer>> {
        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM farmer {where_clause} GROUP ALL"
            ))
            .bind(("org_id", org_id.clone()))
            .bind(("group_id", group_id.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM farmer {where_clause} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("org_id", org_id))
            .bind(("group_id", group_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FarmerRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_farmer())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> FarmerRepository for SurrealFarmerRepository<C> {
    async fn create(&self, input: CreateFarmer) -> FarmdeskResult<Farmer> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let full_name = check_full_name(&input.full_name)?;

        if let Some(group_id) = input.group_id {
            self.ensure_group_in_org(input.organization_id, group_id)
                .await?;
        }

        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('farmer', $id) SET \
                 organization_id = $org_id, full_name = $full_name, \
                 phone = $phone, village = $village, group_id = $group_id, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("full_name", full_name))
            .bind(("phone", input.phone))
            .bind(("village", input.village))
            .bind(("group_id", input.group_id.map(|g| g.to_string())))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("farmer", e))?;

        let rows: Vec<FarmerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("farmer", &id_str))?;

        Ok(row.into_farmer(id)?)
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> FarmdeskResult<Farmer> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('farmer', $id) \
                 WHERE organization_id = $org_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FarmerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("farmer", &id_str))?;

        Ok(row.into_farmer(id)?)
    }

    async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateFarmer,
    ) -> FarmdeskResult<Farmer> {
        let id_str = id.to_string();

        let full_name = input.full_name.as_deref().map(check_full_name).transpose()?;
        if let Some(Some(group_id)) = input.group_id {
            self.ensure_group_in_org(organization_id, group_id).await?;
        }

        let mut sets = Vec::new();
        if full_name.is_some() {
            sets.push("full_name = $full_name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.village.is_some() {
            sets.push("village = $village");
        }
        if input.group_id.is_some() {
            sets.push("group_id = $group_id");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('farmer', $id) SET {} \
             WHERE organization_id = $org_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("org_id", organization_id.to_string()));

        if let Some(full_name) = full_name {
            builder = builder.bind(("full_name", full_name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(village) = input.village {
            builder = builder.bind(("village", village));
        }
        if let Some(group_id) = input.group_id {
            builder = builder.bind(("group_id", group_id.map(|g| g.to_string())));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("farmer", e))?;

        let rows: Vec<FarmerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("farmer", &id_str))?;

        Ok(row.into_farmer(id)?)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> FarmdeskResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "DELETE type::record('farmer', $id) \
                 WHERE organization_id = $org_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("org_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let deleted: Vec<FarmerRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::not_found("farmer", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        organization_id: Uuid,
        group_id: Option<Uuid>,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<Farmer>> {
        let where_clause = if group_id.is_some() {
            "WHERE organization_id = $org_id AND group_id = $group_id"
        } else {
            "WHERE organization_id = $org_id"
        };
        self.page(
            where_clause,
            Some(organization_id.to_string()),
            group_id.map(|g| g.to_string()),
            pagination,
        )
        .await
    }

    async fn list_all(&self, pagination: Pagination) -> FarmdeskResult<PaginatedResult<Farmer>> {
        self.page("", None, None, pagination).await
    }
}
