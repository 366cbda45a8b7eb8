//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `cart` - Session-backed cart ledger
//! - `catalog` - Product listing, cached detail reads, admin product writes
//! - `checkout` - The order pipeline (order creation, payment session, return)
//! - `orders` - Order viewing and admin order management

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
