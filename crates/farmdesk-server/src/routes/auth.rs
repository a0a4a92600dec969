//! `/api/auth` routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use farmdesk_auth::{SessionTokens, SignInInput, SignUpInput};
use farmdesk_core::models::session::Session;
use farmdesk_core::models::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ClientInfo, CurrentSession, cleared_session_cookie, session_cookie};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
        .route("/session", get(session))
        .route("/refresh", post(refresh))
        .route("/sessions", get(list_sessions).delete(revoke_other_sessions))
        .route("/sessions/{id}", delete(revoke_session))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/stop-impersonating", post(stop_impersonating))
}

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    pub session: Session,
}

/// Token pair as JSON plus the access token as a cookie.
pub(crate) fn with_cookie(state: &AppState, tokens: SessionTokens) -> ApiResult<Response> {
    let cookie = session_cookie(&tokens.access_token, tokens.expires_in, state.secure_cookies)?;
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(tokens)).into_response())
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(body): Json<SignUpBody>,
) -> ApiResult<Response> {
    let tokens = state
        .auth
        .sign_up(SignUpInput {
            email: body.email,
            name: body.name,
            password: body.password,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        })
        .await?;
    let mut response = with_cookie(&state, tokens)?;
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(body): Json<SignInBody>,
) -> ApiResult<Response> {
    let tokens = state
        .auth
        .sign_in(SignInInput {
            email: body.email,
            password: body.password,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        })
        .await?;
    with_cookie(&state, tokens)
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
) -> ApiResult<Response> {
    state.auth.sign_out(&current.principal).await?;
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(SET_COOKIE, cleared_session_cookie())]),
    )
        .into_response())
}

async fn session(CurrentSession(current): CurrentSession) -> Json<SessionView> {
    Json(SessionView {
        user: current.user,
        session: current.session,
    })
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(body): Json<RefreshBody>,
) -> ApiResult<Response> {
    let tokens = state
        .auth
        .refresh(&body.refresh_token, client.ip_address, client.user_agent)
        .await?;
    with_cookie(&state, tokens)
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.auth.list_sessions(current.principal.user_id).await?))
}

async fn revoke_session(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.auth.revoke_session(&current.principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn revoke_other_sessions(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
) -> ApiResult<StatusCode> {
    state.auth.revoke_other_sessions(&current.principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordBody>,
) -> ApiResult<StatusCode> {
    state.auth.request_password_reset(&body.email).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordBody>,
) -> ApiResult<StatusCode> {
    state.auth.reset_password(&body.token, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stop_impersonating(
    State(state): State<Arc<AppState>>,
    CurrentSession(current): CurrentSession,
    client: ClientInfo,
) -> ApiResult<Response> {
    let tokens = state
        .auth
        .stop_impersonating(&current.principal, client.ip_address, client.user_agent)
        .await?;
    with_cookie(&state, tokens)
}
