//! Authentication extractors.
//!
//! The logged-in identity lives in the session under
//! [`session_keys::CURRENT_USER`]. Rejections are JSON errors: 401 when
//! nobody is logged in, 403 when an admin route is hit by a non-admin.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable identity in session");
            None
        }
    }
}

fn not_logged_in() -> AppError {
    AppError::Unauthorized("Please log in to continue".to_string())
}

/// Extractor that requires a logged-in user.
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts).await.map(Self).ok_or_else(not_logged_in)
    }
}

/// Extractor that requires a logged-in administrator.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts).await.ok_or_else(not_logged_in)?;
        if !user.is_admin() {
            tracing::warn!(
                user_id = %user.id,
                path = %parts.uri.path(),
                "Non-admin hit admin route"
            );
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be fixated.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the logged-in user from the session (logout). The cart survives.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
