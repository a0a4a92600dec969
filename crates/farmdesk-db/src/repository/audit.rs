//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The `audit_log` table denies UPDATE and DELETE at the schema level;
//! this repository only ever creates and reads.

use chrono::{DateTime, Utc};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::audit::{AuditLogEntry, AuditOutcome, CreateAuditLogEntry};
use farmdesk_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, total_of};
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct AuditRow {
    actor_id: Option<String>,
    action: String,
    organization_id: Option<String>,
    target_id: Option<String>,
    outcome: String,
    ip_address: Option<String>,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    actor_id: Option<String>,
    action: String,
    organization_id: Option<String>,
    target_id: Option<String>,
    outcome: String,
    ip_address: Option<String>,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, DbError> {
    match s {
        "Success" => Ok(AuditOutcome::Success),
        "Failure" => Ok(AuditOutcome::Failure),
        "Denied" => Ok(AuditOutcome::Denied),
        other => Err(DbError::Decode(format!("unknown audit outcome: {other}"))),
    }
}

fn outcome_to_str(outcome: AuditOutcome) -> &'static str {
    match outcome {
        AuditOutcome::Success => "Success",
        AuditOutcome::Failure => "Failure",
        AuditOutcome::Denied => "Denied",
    }
}

fn parse_optional(field: &str, value: Option<String>) -> Result<Option<Uuid>, DbError> {
    value.as_deref().map(|v| parse_uuid(field, v)).transpose()
}

impl AuditRow {
    fn into_entry(self, id: Uuid) -> Result<AuditLogEntry, DbError> {
        Ok(AuditLogEntry {
            id,
            actor_id: parse_optional("actor", self.actor_id)?,
            action: self.action,
            organization_id: parse_optional("organization", self.organization_id)?,
            target_id: parse_optional("target", self.target_id)?,
            outcome: parse_outcome(&self.outcome)?,
            ip_address: self.ip_address,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let id = parse_uuid("audit_log", &self.record_id)?;
        AuditRow {
            actor_id: self.actor_id,
            action: self.action,
            organization_id: self.organization_id,
            target_id: self.target_id,
            outcome: self.outcome,
            ip_address: self.ip_address,
            metadata: self.metadata,
            timestamp: self.timestamp,
        }
        .into_entry(id)
    }
}

#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> FarmdeskResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 actor_id = $actor_id, action = $action, \
                 organization_id = $organization_id, target_id = $target_id, \
                 outcome = $outcome, ip_address = $ip_address, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", input.actor_id.map(|u| u.to_string())))
            .bind(("action", input.action))
            .bind(("organization_id", input.organization_id.map(|u| u.to_string())))
            .bind(("target_id", input.target_id.map(|u| u.to_string())))
            .bind(("outcome", outcome_to_str(input.outcome).to_string()))
            .bind(("ip_address", input.ip_address))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("audit_log", &id_str))?;

        Ok(row.into_entry(id)?)
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<AuditLogEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        if filter.organization_id.is_some() {
            conditions.push("organization_id = $organization_id");
        }
        if filter.outcome.is_some() {
            conditions.push("outcome = $outcome");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let actor_id = filter.actor_id.map(|u| u.to_string());
        let organization_id = filter.organization_id.map(|u| u.to_string());
        let outcome = filter.outcome.map(|o| outcome_to_str(o).to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM audit_log {where_clause} GROUP ALL"
            ))
            .bind(("actor_id", actor_id.clone()))
            .bind(("action", filter.action.clone()))
            .bind(("organization_id", organization_id.clone()))
            .bind(("outcome", outcome.clone()))
            .bind(("from", filter.from))
            .bind(("to", filter.to))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause} \
                 ORDER BY timestamp DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("actor_id", actor_id))
            .bind(("action", filter.action))
            .bind(("organization_id", organization_id))
            .bind(("outcome", outcome))
            .bind(("from", filter.from))
            .bind(("to", filter.to))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
