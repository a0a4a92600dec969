//! SurrealDB implementation of [`VerificationRepository`].

use chrono::{DateTime, Utc};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::verification::{CreateVerification, Verification};
use farmdesk_core::repository::VerificationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct VerificationRow {
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct VerificationRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SurrealVerificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVerificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VerificationRepository for SurrealVerificationRepository<C> {
    async fn create(&self, input: CreateVerification) -> FarmdeskResult<Verification> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('verification', $id) SET \
                 user_id = $user_id, token_hash = $token_hash, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("verification", e))?;

        let rows: Vec<VerificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("verification", &id_str))?;

        Ok(Verification {
            id,
            user_id: parse_uuid("user", &row.user_id)?,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> FarmdeskResult<Verification> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM verification \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VerificationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("verification", "token"))?;

        Ok(Verification {
            id: parse_uuid("verification", &row.record_id)?,
            user_id: parse_uuid("user", &row.user_id)?,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }

    async fn delete(&self, id: Uuid) -> FarmdeskResult<()> {
        self.db
            .query("DELETE type::record('verification', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> FarmdeskResult<()> {
        self.db
            .query("DELETE verification WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
