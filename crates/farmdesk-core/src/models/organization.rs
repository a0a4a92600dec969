//! Organization domain model.
//!
//! Organizations are the unit of data isolation for app routes. Every
//! farmer, farmer group and membership belongs to exactly one
//! organization, and organizations belong to a tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cooperative, company or field office operating inside a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// The tenant this organization belongs to.
    pub tenant_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe identifier, unique within the tenant.
    pub slug: String,
    /// Arbitrary key-value metadata.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub tenant_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Fields that can be updated on an existing organization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
