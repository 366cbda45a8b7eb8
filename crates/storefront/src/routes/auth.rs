//! Account route handlers: register, login, logout, current identity.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoggedOut {
    pub message: &'static str,
}

async fn start_session(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store identity in session");
        AppError::Internal(format!("session error: {e}"))
    })?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(current)
}

/// `POST /api/auth/register`
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    let user = AuthService::new(state.pool())
        .register(&body.name, &body.email, &body.password)
        .await?;
    let current = start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(current)))
}

/// `POST /api/auth/login`
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginBody>,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;
    let current = start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(current))
}

/// `POST /api/auth/logout`
///
/// Drops the identity; the cart stays with the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<LoggedOut>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(Json(LoggedOut {
        message: "Logged out",
    }))
}

/// `GET /api/auth/me`
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}
