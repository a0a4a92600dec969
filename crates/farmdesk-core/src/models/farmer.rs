//! Farmer domain model (organization scope).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub village: Option<String>,
    /// Farmer group within the same organization.
    pub group_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFarmer {
    pub organization_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub village: Option<String>,
    pub group_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateFarmer {
    pub full_name: Option<String>,
    /// `Some(None)` clears the phone number.
    pub phone: Option<Option<String>>,
    pub village: Option<Option<String>>,
    pub group_id: Option<Option<Uuid>>,
    pub metadata: Option<serde_json::Value>,
}
