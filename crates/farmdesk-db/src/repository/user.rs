//! SurrealDB implementation of [`UserRepository`].
//!
//! Users are platform-global. Emails are stored trimmed and lowercased,
//! and every lookup normalizes its input the same way. Password hashing
//! happens in the auth layer; this repository only stores the PHC string.

use chrono::{DateTime, Utc};
use farmdesk_core::error::FarmdeskResult;
use farmdesk_core::models::user::{CreateUser, PlatformRole, UpdateUser, User};
use farmdesk_core::repository::{PaginatedResult, Pagination, UserFilter, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, total_of};
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    name: String,
    password_hash: String,
    role: String,
    email_verified: bool,
    banned: bool,
    ban_reason: Option<String>,
    ban_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    email_verified: bool,
    banned: bool,
    ban_reason: Option<String>,
    ban_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<PlatformRole, DbError> {
    match s {
        "Admin" => Ok(PlatformRole::Admin),
        "User" => Ok(PlatformRole::User),
        other => Err(DbError::Decode(format!("unknown platform role: {other}"))),
    }
}

fn role_to_str(role: PlatformRole) -> &'static str {
    match role {
        PlatformRole::Admin => "Admin",
        PlatformRole::User => "User",
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            email_verified: self.email_verified,
            banned: self.banned,
            ban_reason: self.ban_reason,
            ban_expires: self.ban_expires,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            email_verified: self.email_verified,
            banned: self.banned,
            ban_reason: self.ban_reason,
            ban_expires: self.ban_expires,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> FarmdeskResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, name = $name, \
                 password_hash = $password_hash, \
                 role = $role, \
                 email_verified = $email_verified, \
                 banned = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", normalize_email(&input.email)))
            .bind(("name", input.name))
            .bind(("password_hash", input.password_hash))
            .bind(("role", role_to_str(input.role).to_string()))
            .bind(("email_verified", input.email_verified))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::from_check("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FarmdeskResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_email(&self, email: &str) -> FarmdeskResult<User> {
        let email = normalize_email(email);

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email")
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("email={email}")))?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> FarmdeskResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.email_verified.is_some() {
            sets.push("email_verified = $email_verified");
        }
        if input.banned.is_some() {
            sets.push("banned = $banned");
        }
        if input.ban_reason.is_some() {
            sets.push("ban_reason = $ban_reason");
        }
        if input.ban_expires.is_some() {
            sets.push("ban_expires = $ban_expires");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", normalize_email(&email)));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role_to_str(role).to_string()));
        }
        if let Some(email_verified) = input.email_verified {
            builder = builder.bind(("email_verified", email_verified));
        }
        if let Some(banned) = input.banned {
            builder = builder.bind(("banned", banned));
        }
        if let Some(ban_reason) = input.ban_reason {
            // Some(None) clears the column.
            builder = builder.bind(("ban_reason", ban_reason));
        }
        if let Some(ban_expires) = input.ban_expires {
            builder = builder.bind(("ban_expires", ban_expires));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::from_check("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn delete(&self, id: Uuid) -> FarmdeskResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("DELETE type::record('user', $id) RETURN BEFORE")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let deleted: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::not_found("user", id_str).into());
        }

        self.db
            .query(
                "DELETE member_of WHERE in = type::record('user', $id); \
                 DELETE session WHERE user_id = $id; \
                 DELETE verification WHERE user_id = $id;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        tracing::info!(user_id = %id, "User removed");
        Ok(())
    }

    async fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<User>> {
        let mut conditions = Vec::new();
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(email, $search) \
                 OR string::contains(string::lowercase(name), $search))",
            );
        }
        if filter.role.is_some() {
            conditions.push("role = $role");
        }
        if filter.banned.is_some() {
            conditions.push("banned = $banned");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let search = filter.search.map(|s| s.trim().to_lowercase());
        let role = filter.role.map(|r| role_to_str(r).to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM user {where_clause} GROUP ALL"
            ))
            .bind(("search", search.clone()))
            .bind(("role", role.clone()))
            .bind(("banned", filter.banned))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM user {where_clause} \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("search", search))
            .bind(("role", role))
            .bind(("banned", filter.banned))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
