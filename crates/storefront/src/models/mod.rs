//! Domain models owned by the storefront.
//!
//! Catalog, cart, and order types live in `animix-core`; this module holds
//! account and session types that only make sense next to the database.

pub mod session;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
