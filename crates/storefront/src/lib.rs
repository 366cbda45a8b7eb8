//! Animix storefront library.
//!
//! JSON API for the catalog, the session-backed cart, checkout through a
//! hosted payment page, order history, and the admin surface. Exposed as a
//! library so the binary, the CLI, and the integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
