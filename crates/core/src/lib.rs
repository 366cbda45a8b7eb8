//! Animix Core - Storefront domain library.
//!
//! This crate holds the parts of the storefront that carry real invariants:
//! - [`cart`] - The cart ledger: lines keyed by (product, size, color) with
//!   quantity clamping against a stock snapshot
//! - [`pricing`] - Order price breakdown (shipping threshold, tax)
//! - [`order`] - Frozen order records, drafts, and the status state machine
//! - [`product`] - Catalog entries and their validation rules
//! - [`types`] - Newtype IDs, prices, emails, roles, and statuses
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The storefront crate owns persistence and the
//! payment gateway.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod pricing;
pub mod product;
pub mod types;

pub use cart::{CartKey, CartLedger, CartLine};
pub use order::{Order, OrderDraft, OrderError, OrderItem, PaymentResult, ShippingAddress};
pub use pricing::PriceBreakdown;
pub use product::{Product, ProductCategory, ProductError, ProductInput, ValidProduct};
pub use types::*;
