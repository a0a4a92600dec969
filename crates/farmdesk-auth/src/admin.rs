//! Platform administration of user accounts: listing, role changes,
//! bans, impersonation and session control.
//!
//! Every operation runs through the platform-scope gate first, and
//! every outcome (including denials) lands in the audit log.

use chrono::{Duration, Utc};
use farmdesk_core::access::{Action, Principal, Scope, authorize};
use farmdesk_core::error::{FarmdeskError, FarmdeskResult};
use farmdesk_core::models::audit::AuditOutcome;
use farmdesk_core::models::session::Session;
use farmdesk_core::models::user::{CreateUser, PlatformRole, UpdateUser, User};
use farmdesk_core::repository::{
    AuditLogRepository, PaginatedResult, Pagination, SessionRepository, UserFilter,
    UserRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::service::{SessionParams, SessionTokens, seconds, start_session};

/// Account created directly by an administrator.
#[derive(Debug)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: PlatformRole,
}

pub struct AdminService<U, S, A>
where
    U: UserRepository,
    S: SessionRepository,
    A: AuditLogRepository,
{
    users: U,
    sessions: S,
    audit: A,
    config: AuthConfig,
}

impl<U, S, A> AdminService<U, S, A>
where
    U: UserRepository,
    S: SessionRepository,
    A: AuditLogRepository,
{
    pub fn new(users: U, sessions: S, audit: A, config: AuthConfig) -> Self {
        Self {
            users,
            sessions,
            audit,
            config,
        }
    }

    /// Platform-scope gate. Denials are audited under `action`.
    pub async fn require_admin(&self, actor: &Principal, action: &str) -> FarmdeskResult<()> {
        match authorize(actor, Scope::Platform, None, Action::Manage) {
            Ok(()) => Ok(()),
            Err(denied) => {
                AuditEvent::new(action, AuditOutcome::Denied)
                    .actor(actor.user_id)
                    .record(&self.audit)
                    .await;
                Err(denied.into())
            }
        }
    }

    async fn success(&self, actor: &Principal, action: &str, target: Uuid) {
        AuditEvent::new(action, AuditOutcome::Success)
            .actor(actor.user_id)
            .target(target)
            .record(&self.audit)
            .await;
    }

    pub async fn list_users(
        &self,
        actor: &Principal,
        filter: UserFilter,
        pagination: Pagination,
    ) -> FarmdeskResult<PaginatedResult<User>> {
        self.require_admin(actor, "admin.list_users").await?;
        self.users.list(filter, pagination).await
    }

    pub async fn get_user(&self, actor: &Principal, user_id: Uuid) -> FarmdeskResult<User> {
        self.require_admin(actor, "admin.get_user").await?;
        self.users.get_by_id(user_id).await
    }

    pub async fn create_user(
        &self,
        actor: &Principal,
        input: CreateUserInput,
    ) -> FarmdeskResult<User> {
        self.require_admin(actor, "admin.create_user").await?;
        if input.name.trim().is_empty() {
            return Err(FarmdeskError::validation("name must not be empty"));
        }
        password::check_policy(&input.password, &self.config)?;
        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = self
            .users
            .create(CreateUser {
                email: input.email,
                name: input.name.trim().to_string(),
                password_hash,
                role: input.role,
                email_verified: true,
            })
            .await?;

        info!(admin_id = %actor.user_id, user_id = %user.id, "User created by admin");
        self.success(actor, "admin.create_user", user.id).await;
        Ok(user)
    }

    pub async fn set_role(
        &self,
        actor: &Principal,
        user_id: Uuid,
        role: PlatformRole,
    ) -> FarmdeskResult<User> {
        self.require_admin(actor, "admin.set_role").await?;
        if user_id == actor.user_id {
            return Err(AuthError::NotPermitted("administrators cannot change their own role").into());
        }
        let user = self
            .users
            .update(
                user_id,
                UpdateUser {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;
        AuditEvent::new("admin.set_role", AuditOutcome::Success)
            .actor(actor.user_id)
            .target(user_id)
            .metadata(serde_json::json!({ "role": role }))
            .record(&self.audit)
            .await;
        Ok(user)
    }

    /// Ban a user, optionally for a limited time. All of the user's
    /// sessions are revoked.
    pub async fn ban_user(
        &self,
        actor: &Principal,
        user_id: Uuid,
        reason: Option<String>,
        expires_in: Option<Duration>,
    ) -> FarmdeskResult<User> {
        self.require_admin(actor, "admin.ban_user").await?;
        if user_id == actor.user_id {
            return Err(AuthError::NotPermitted("administrators cannot ban themselves").into());
        }
        if expires_in.is_some_and(|d| d <= Duration::zero()) {
            return Err(FarmdeskError::validation("ban duration must be positive"));
        }

        let user = self
            .users
            .update(
                user_id,
                UpdateUser {
                    banned: Some(true),
                    ban_reason: Some(reason.clone()),
                    ban_expires: Some(expires_in.map(|d| Utc::now() + d)),
                    ..Default::default()
                },
            )
            .await?;
        self.sessions.invalidate_user_sessions(user_id, None).await?;

        info!(admin_id = %actor.user_id, %user_id, "User banned");
        AuditEvent::new("admin.ban_user", AuditOutcome::Success)
            .actor(actor.user_id)
            .target(user_id)
            .metadata(serde_json::json!({
                "reason": reason,
                "expires": user.ban_expires,
            }))
            .record(&self.audit)
            .await;
        Ok(user)
    }

    pub async fn unban_user(&self, actor: &Principal, user_id: Uuid) -> FarmdeskResult<User> {
        self.require_admin(actor, "admin.unban_user").await?;
        let user = self
            .users
            .update(
                user_id,
                UpdateUser {
                    banned: Some(false),
                    ban_reason: Some(None),
                    ban_expires: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        self.success(actor, "admin.unban_user", user_id).await;
        Ok(user)
    }

    /// Start a session as `user_id` on behalf of the acting admin.
    ///
    /// Other administrators and banned users cannot be impersonated.
    pub async fn impersonate_user(
        &self,
        actor: &Principal,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> FarmdeskResult<SessionTokens> {
        self.require_admin(actor, "admin.impersonate_user").await?;
        if actor.impersonated_by.is_some() {
            return Err(AuthError::NotPermitted("already impersonating").into());
        }
        if user_id == actor.user_id {
            return Err(AuthError::NotPermitted("cannot impersonate yourself").into());
        }

        let target = self.users.get_by_id(user_id).await?;
        if target.role == PlatformRole::Admin {
            return Err(AuthError::NotPermitted("administrators cannot be impersonated").into());
        }
        if target.is_banned_at(Utc::now()) {
            return Err(AuthError::NotPermitted("banned users cannot be impersonated").into());
        }

        let expires_at = Utc::now() + seconds(self.config.impersonation_lifetime_secs);
        let tokens = start_session(
            &self.sessions,
            &self.config,
            target,
            SessionParams {
                impersonated_by: Some(actor.user_id),
                expires_at,
                ip_address: ip_address.clone(),
                user_agent,
            },
        )
        .await?;

        info!(admin_id = %actor.user_id, %user_id, "Impersonation started");
        AuditEvent::new("admin.impersonate_user", AuditOutcome::Success)
            .actor(actor.user_id)
            .target(user_id)
            .ip(ip_address.as_deref())
            .metadata(serde_json::json!({ "session_id": tokens.session_id }))
            .record(&self.audit)
            .await;
        Ok(tokens)
    }

    /// Permanently delete a user with their sessions and memberships.
    pub async fn remove_user(&self, actor: &Principal, user_id: Uuid) -> FarmdeskResult<()> {
        self.require_admin(actor, "admin.remove_user").await?;
        if user_id == actor.user_id {
            return Err(AuthError::NotPermitted("administrators cannot remove themselves").into());
        }
        self.users.delete(user_id).await?;
        info!(admin_id = %actor.user_id, %user_id, "User removed");
        self.success(actor, "admin.remove_user", user_id).await;
        Ok(())
    }

    pub async fn list_user_sessions(
        &self,
        actor: &Principal,
        user_id: Uuid,
    ) -> FarmdeskResult<Vec<Session>> {
        self.require_admin(actor, "admin.list_user_sessions").await?;
        self.users.get_by_id(user_id).await?;
        let now = Utc::now();
        let sessions = self.sessions.list_by_user(user_id).await?;
        Ok(sessions.into_iter().filter(|s| s.expires_at > now).collect())
    }

    pub async fn revoke_user_session(
        &self,
        actor: &Principal,
        session_id: Uuid,
    ) -> FarmdeskResult<()> {
        self.require_admin(actor, "admin.revoke_session").await?;
        let session = self.sessions.get_by_id(session_id).await?;
        self.sessions.invalidate(session_id).await?;
        AuditEvent::new("admin.revoke_session", AuditOutcome::Success)
            .actor(actor.user_id)
            .target(session.user_id)
            .metadata(serde_json::json!({ "session_id": session_id }))
            .record(&self.audit)
            .await;
        Ok(())
    }

    pub async fn revoke_user_sessions(
        &self,
        actor: &Principal,
        user_id: Uuid,
    ) -> FarmdeskResult<()> {
        self.require_admin(actor, "admin.revoke_user_sessions").await?;
        self.users.get_by_id(user_id).await?;
        self.sessions.invalidate_user_sessions(user_id, None).await?;
        self.success(actor, "admin.revoke_user_sessions", user_id).await;
        Ok(())
    }
}
