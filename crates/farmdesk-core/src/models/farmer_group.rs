//! Farmer group domain model (organization scope).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named cluster of farmers inside one organization, such as a
/// village savings group or a collection-point cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmerGroup {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFarmerGroup {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
}
