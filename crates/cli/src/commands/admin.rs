//! Admin role management.
//!
//! Accounts register through the storefront with the `user` role. Staff
//! accounts are promoted here, never over HTTP.

use animix_core::{Email, EmailError, Role};
use animix_storefront::db::{RepositoryError, UserRepository};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No account with email: {0}")]
    UnknownAccount(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// Set the role of the account registered under `email`.
///
/// # Errors
///
/// Returns `AdminError::UnknownAccount` if nobody registered with that email.
pub async fn set_role(email: &str, role: Role) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownAccount(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "Role updated");
    Ok(())
}
