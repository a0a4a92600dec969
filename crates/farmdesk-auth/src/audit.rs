//! Audit trail helpers shared by the services.

use farmdesk_core::models::audit::{AuditOutcome, CreateAuditLogEntry};
use farmdesk_core::repository::AuditLogRepository;
use uuid::Uuid;

/// Builder for a single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    entry: CreateAuditLogEntry,
}

impl AuditEvent {
    pub fn new(action: &str, outcome: AuditOutcome) -> Self {
        Self {
            entry: CreateAuditLogEntry {
                actor_id: None,
                action: action.into(),
                organization_id: None,
                target_id: None,
                outcome,
                ip_address: None,
                metadata: None,
            },
        }
    }

    pub fn actor(mut self, actor_id: Uuid) -> Self {
        self.entry.actor_id = Some(actor_id);
        self
    }

    pub fn organization(mut self, organization_id: Uuid) -> Self {
        self.entry.organization_id = Some(organization_id);
        self
    }

    pub fn target(mut self, target_id: Uuid) -> Self {
        self.entry.target_id = Some(target_id);
        self
    }

    pub fn ip(mut self, ip_address: Option<&str>) -> Self {
        self.entry.ip_address = ip_address.map(String::from);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.entry.metadata = Some(metadata);
        self
    }

    /// Append the entry. A failing audit write is logged, never
    /// surfaced to the caller.
    pub async fn record<A: AuditLogRepository>(self, repo: &A) {
        let action = self.entry.action.clone();
        if let Err(e) = repo.append(self.entry).await {
            tracing::warn!(error = %e, %action, "Failed to append audit log entry");
        }
    }
}
