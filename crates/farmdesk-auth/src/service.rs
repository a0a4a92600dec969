//! Authentication service: sign-up, sign-in, session validation and
//! rotation, password reset, and leaving an impersonation session.

use chrono::{DateTime, Duration, Utc};
use farmdesk_core::access::Principal;
use farmdesk_core::error::{FarmdeskError, FarmdeskResult};
use farmdesk_core::models::audit::AuditOutcome;
use farmdesk_core::models::session::{CreateSession, Session};
use farmdesk_core::models::user::{CreateUser, PlatformRole, UpdateUser, User};
use farmdesk_core::models::verification::CreateVerification;
use farmdesk_core::repository::{
    AuditLogRepository, SessionRepository, UserRepository, VerificationRepository,
};
use farmdesk_mail::{Mailer, PasswordResetEmail};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for self-service registration.
#[derive(Debug)]
pub struct SignUpInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Input for the sign-in flow.
#[derive(Debug)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Credentials handed back to the client after sign-in, refresh or
/// impersonation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    /// Signed JWT access token.
    pub access_token: String,
    /// Raw opaque refresh token (returned to the client, never stored).
    pub refresh_token: String,
    pub session_id: Uuid,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub session_expires_at: DateTime<Utc>,
    pub user: User,
}

/// A validated session, as seen by request handlers.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub principal: Principal,
    pub user: User,
    pub session: Session,
}

/// Session lifetime settings for [`start_session`].
pub(crate) struct SessionParams {
    pub impersonated_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Create a session row for `user` and mint its token pair.
pub(crate) async fn start_session<S: SessionRepository>(
    sessions: &S,
    config: &AuthConfig,
    user: User,
    params: SessionParams,
) -> FarmdeskResult<SessionTokens> {
    let raw_refresh = token::generate_opaque_token();
    let session = sessions
        .create(CreateSession {
            user_id: user.id,
            token_hash: token::hash_token(&raw_refresh),
            ip_address: params.ip_address,
            user_agent: params.user_agent,
            impersonated_by: params.impersonated_by,
            expires_at: params.expires_at,
        })
        .await?;

    let access_token = token::issue_access_token(
        user.id,
        session.id,
        user.role,
        session.impersonated_by,
        config,
    )?;

    Ok(SessionTokens {
        access_token,
        refresh_token: raw_refresh,
        session_id: session.id,
        expires_in: config.access_token_lifetime_secs,
        session_expires_at: session.expires_at,
        user,
    })
}

pub(crate) fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs as i64)
}

fn check_email(email: &str) -> Result<(), FarmdeskError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(FarmdeskError::validation("invalid email address")),
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, S, V, A>
where
    U: UserRepository,
    S: SessionRepository,
    V: VerificationRepository,
    A: AuditLogRepository,
{
    users: U,
    sessions: S,
    verifications: V,
    audit: A,
    mailer: Mailer,
    config: AuthConfig,
}

impl<U, S, V, A> AuthService<U, S, V, A>
where
    U: UserRepository,
    S: SessionRepository,
    V: VerificationRepository,
    A: AuditLogRepository,
{
    pub fn new(users: U, sessions: S, verifications: V, audit: A, mailer: Mailer, config: AuthConfig) -> Self {
        Self {
            users,
            sessions,
            verifications,
            audit,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a new `User`-role account and sign it in.
    pub async fn sign_up(&self, input: SignUpInput) -> FarmdeskResult<SessionTokens> {
        check_email(&input.email)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(FarmdeskError::validation("name must not be empty"));
        }
        password::check_policy(&input.password, &self.config)?;
        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = self
            .users
            .create(CreateUser {
                email: input.email,
                name: name.to_string(),
                password_hash,
                role: PlatformRole::User,
                email_verified: false,
            })
            .await?;

        info!(user_id = %user.id, "User signed up");
        AuditEvent::new("auth.sign_up", AuditOutcome::Success)
            .actor(user.id)
            .ip(input.ip_address.as_deref())
            .record(&self.audit)
            .await;

        self.open_session(user, input.ip_address, input.user_agent)
            .await
    }

    /// Authenticate with email + password and issue a new session.
    pub async fn sign_in(&self, input: SignInInput) -> FarmdeskResult<SessionTokens> {
        let ip = input.ip_address.as_deref();

        let user = match self.users.get_by_email(&input.email).await {
            Ok(user) => user,
            Err(FarmdeskError::NotFound { .. }) => {
                password::verify_decoy(&input.password, self.config.pepper.as_deref());
                AuditEvent::new("auth.sign_in", AuditOutcome::Failure)
                    .ip(ip)
                    .metadata(serde_json::json!({ "reason": "unknown_email" }))
                    .record(&self.audit)
                    .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            AuditEvent::new("auth.sign_in", AuditOutcome::Failure)
                .actor(user.id)
                .ip(ip)
                .metadata(serde_json::json!({ "reason": "bad_password" }))
                .record(&self.audit)
                .await;
            return Err(AuthError::InvalidCredentials.into());
        }

        let user = self.enforce_ban(user, ip).await?;

        info!(user_id = %user.id, "User signed in");
        AuditEvent::new("auth.sign_in", AuditOutcome::Success)
            .actor(user.id)
            .ip(ip)
            .record(&self.audit)
            .await;

        self.open_session(user, input.ip_address, input.user_agent)
            .await
    }

    /// Reject an actively banned user; lift a ban whose expiry passed.
    async fn enforce_ban(&self, user: User, ip: Option<&str>) -> FarmdeskResult<User> {
        if !user.banned {
            return Ok(user);
        }
        if user.is_banned_at(Utc::now()) {
            AuditEvent::new("auth.sign_in", AuditOutcome::Denied)
                .actor(user.id)
                .ip(ip)
                .metadata(serde_json::json!({ "reason": "banned" }))
                .record(&self.audit)
                .await;
            return Err(AuthError::Banned {
                reason: user.ban_reason,
            }
            .into());
        }

        info!(user_id = %user.id, "Ban expired; lifting");
        self.users
            .update(
                user.id,
                UpdateUser {
                    banned: Some(false),
                    ban_reason: Some(None),
                    ban_expires: Some(None),
                    ..Default::default()
                },
            )
            .await
    }

    async fn open_session(
        &self,
        user: User,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> FarmdeskResult<SessionTokens> {
        let expires_at = Utc::now() + seconds(self.config.session_lifetime_secs);
        start_session(
            &self.sessions,
            &self.config,
            user,
            SessionParams {
                impersonated_by: None,
                expires_at,
                ip_address,
                user_agent,
            },
        )
        .await
    }

    /// End the caller's current session.
    pub async fn sign_out(&self, principal: &Principal) -> FarmdeskResult<()> {
        match self.sessions.invalidate(principal.session_id).await {
            Ok(()) | Err(FarmdeskError::NotFound { .. }) => {
                debug!(session_id = %principal.session_id, "Signed out");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve an access token into a live session.
    ///
    /// Beyond the JWT checks, the session must still exist and be
    /// unexpired, and its user must not be banned.
    pub async fn get_session(&self, access_token: &str) -> FarmdeskResult<AuthenticatedSession> {
        let claims = token::decode_access_token(access_token, &self.config)?;
        let session_id = claims.session_id()?;
        let user_id = claims.user_id()?;

        let session = match self.sessions.get_by_id(session_id).await {
            Ok(session) => session,
            Err(FarmdeskError::NotFound { .. }) => return Err(AuthError::SessionRevoked.into()),
            Err(e) => return Err(e),
        };
        if session.user_id != user_id {
            return Err(AuthError::TokenInvalid("session does not belong to subject".into()).into());
        }
        if session.expires_at <= Utc::now() {
            self.discard_expired(session.id).await;
            return Err(AuthError::TokenExpired.into());
        }

        let user = self.users.get_by_id(user_id).await?;
        if user.is_banned_at(Utc::now()) {
            return Err(AuthError::Banned {
                reason: user.ban_reason,
            }
            .into());
        }

        Ok(AuthenticatedSession {
            principal: Principal {
                user_id: user.id,
                session_id: session.id,
                role: user.role,
                impersonated_by: session.impersonated_by,
            },
            user,
            session,
        })
    }

    /// Rotate a refresh token: consume the old session and issue a new
    /// token pair.
    ///
    /// Each refresh token is single-use; the old session is invalidated
    /// before the new one is created. Impersonation sessions keep their
    /// original expiry so rotation cannot extend them.
    pub async fn refresh(
        &self,
        raw_refresh_token: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> FarmdeskResult<SessionTokens> {
        let token_hash = token::hash_token(raw_refresh_token);
        let session = self
            .sessions
            .get_by_token_hash(&token_hash)
            .await
            .map_err(|e| match e {
                FarmdeskError::NotFound { .. } => {
                    AuthError::TokenInvalid("refresh token not found or already used".into())
                        .into()
                }
                other => other,
            })?;

        if session.expires_at <= Utc::now() {
            self.discard_expired(session.id).await;
            return Err(AuthError::TokenExpired.into());
        }

        // A concurrent refresh may have consumed the session already.
        self.sessions
            .invalidate(session.id)
            .await
            .map_err(|e| match e {
                FarmdeskError::NotFound { .. } => {
                    AuthError::TokenInvalid("refresh token already used".into()).into()
                }
                other => other,
            })?;

        let user = self.users.get_by_id(session.user_id).await?;
        if user.is_banned_at(Utc::now()) {
            return Err(AuthError::Banned {
                reason: user.ban_reason,
            }
            .into());
        }

        let expires_at = match session.impersonated_by {
            Some(_) => session.expires_at,
            None => Utc::now() + seconds(self.config.session_lifetime_secs),
        };

        start_session(
            &self.sessions,
            &self.config,
            user,
            SessionParams {
                impersonated_by: session.impersonated_by,
                expires_at,
                ip_address,
                user_agent,
            },
        )
        .await
    }

    async fn discard_expired(&self, session_id: Uuid) {
        match self.sessions.invalidate(session_id).await {
            Ok(()) | Err(FarmdeskError::NotFound { .. }) => {}
            Err(e) => warn!(error = %e, %session_id, "Failed to delete expired session"),
        }
    }

    /// Live sessions of a user, newest first.
    pub async fn list_sessions(&self, user_id: Uuid) -> FarmdeskResult<Vec<Session>> {
        let now = Utc::now();
        let sessions = self.sessions.list_by_user(user_id).await?;
        Ok(sessions.into_iter().filter(|s| s.expires_at > now).collect())
    }

    /// Revoke one of the caller's own sessions. Sessions belonging to
    /// someone else are reported as missing.
    pub async fn revoke_session(&self, principal: &Principal, session_id: Uuid) -> FarmdeskResult<()> {
        let session = self.sessions.get_by_id(session_id).await?;
        if session.user_id != principal.user_id {
            return Err(FarmdeskError::not_found("session", session_id));
        }
        self.sessions.invalidate(session_id).await
    }

    /// Revoke every session of the caller except the current one.
    pub async fn revoke_other_sessions(&self, principal: &Principal) -> FarmdeskResult<()> {
        self.sessions
            .invalidate_user_sessions(principal.user_id, Some(principal.session_id))
            .await
    }

    /// Create a password-reset token for `email`.
    ///
    /// Returns `None` when no account exists. Earlier outstanding
    /// tokens for the same user are discarded.
    pub async fn create_reset_token(&self, email: &str) -> FarmdeskResult<Option<String>> {
        Ok(self.issue_reset_token(email).await?.map(|(_, raw)| raw))
    }

    async fn issue_reset_token(&self, email: &str) -> FarmdeskResult<Option<(User, String)>> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(FarmdeskError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        self.verifications.delete_for_user(user.id).await?;

        let raw = token::generate_opaque_token();
        self.verifications
            .create(CreateVerification {
                user_id: user.id,
                token_hash: token::hash_token(&raw),
                expires_at: Utc::now() + seconds(self.config.reset_token_lifetime_secs),
            })
            .await?;

        Ok(Some((user, raw)))
    }

    /// Email a reset link if the account exists. The outcome is the
    /// same either way, so callers cannot tell which emails are registered.
    pub async fn request_password_reset(&self, email: &str) -> FarmdeskResult<()> {
        match self.issue_reset_token(email).await? {
            Some((user, raw)) => {
                let email = PasswordResetEmail {
                    user_name: user.name.clone(),
                    reset_url: self.config.reset_url(&raw),
                };
                // Delivery runs in the background so the response time
                // does not depend on whether the account exists.
                let mailer = self.mailer.clone();
                let to = user.email.clone();
                tokio::spawn(async move {
                    mailer.send_password_reset(&to, email).await;
                });
                AuditEvent::new("auth.password_reset_requested", AuditOutcome::Success)
                    .actor(user.id)
                    .record(&self.audit)
                    .await;
            }
            None => debug!("Password reset requested for unknown email"),
        }
        Ok(())
    }

    /// Set a new password using a reset token. The token is consumed and
    /// every session of the user is revoked.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> FarmdeskResult<()> {
        password::check_policy(new_password, &self.config)?;

        let verification = self
            .verifications
            .get_by_token_hash(&token::hash_token(raw_token))
            .await
            .map_err(|e| match e {
                FarmdeskError::NotFound { .. } => {
                    AuthError::TokenInvalid("reset token not found or already used".into()).into()
                }
                other => other,
            })?;

        if verification.expires_at <= Utc::now() {
            self.verifications.delete(verification.id).await?;
            return Err(AuthError::TokenExpired.into());
        }

        let password_hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.users
            .update(
                verification.user_id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        self.verifications
            .delete_for_user(verification.user_id)
            .await?;
        self.sessions
            .invalidate_user_sessions(verification.user_id, None)
            .await?;

        info!(user_id = %verification.user_id, "Password reset");
        AuditEvent::new("auth.password_reset", AuditOutcome::Success)
            .actor(verification.user_id)
            .record(&self.audit)
            .await;
        Ok(())
    }

    /// Leave an impersonation session and sign the original admin back in.
    pub async fn stop_impersonating(
        &self,
        principal: &Principal,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> FarmdeskResult<SessionTokens> {
        let admin_id = principal.impersonated_by.ok_or(AuthError::NotImpersonating)?;

        self.sessions.invalidate(principal.session_id).await?;

        let admin = self.users.get_by_id(admin_id).await?;
        if admin.role != PlatformRole::Admin || admin.is_banned_at(Utc::now()) {
            warn!(%admin_id, "Impersonating user is no longer an active admin");
            return Err(AuthError::NotPermitted("impersonator is no longer an administrator").into());
        }

        info!(%admin_id, user_id = %principal.user_id, "Impersonation ended");
        AuditEvent::new("auth.stop_impersonating", AuditOutcome::Success)
            .actor(admin_id)
            .target(principal.user_id)
            .ip(ip_address.as_deref())
            .record(&self.audit)
            .await;

        self.open_session(admin, ip_address, user_agent).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        assert!(check_email("ada@example.com").is_ok());
        assert!(check_email(" ada@example.com ").is_ok());
        assert!(check_email("ada").is_err());
        assert!(check_email("@example.com").is_err());
        assert!(check_email("ada@localhost").is_err());
    }
}
