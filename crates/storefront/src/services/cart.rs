//! Session-backed cart.
//!
//! The ledger is loaded from the session, one operation is applied, and the
//! whole ledger is written back under [`session_keys::CART`]. Writes are best
//! effort: a failed save is logged and the request carries on with the
//! in-memory result.

use tower_sessions::Session;

use animix_core::{CartLedger, CartLine, Product};

use crate::models::session_keys;

/// Reasons a product variant cannot be added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("{0} is out of stock")]
    OutOfStock(String),
    #[error("Please select a size")]
    MissingSize,
    #[error("Please select a color")]
    MissingColor,
    #[error("size {0} is not available for this product")]
    UnknownSize(String),
    #[error("color {0} is not available for this product")]
    UnknownColor(String),
}

/// The cart for the current session.
pub struct SessionCart<'a> {
    session: &'a Session,
    ledger: CartLedger,
}

impl<'a> SessionCart<'a> {
    /// Load the cart. Missing or unreadable data yields an empty cart.
    pub async fn load(session: &'a Session) -> Self {
        let ledger = match session.get::<CartLedger>(session_keys::CART).await {
            Ok(Some(ledger)) => ledger,
            Ok(None) => CartLedger::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cart");
                CartLedger::new()
            }
        };
        Self { session, ledger }
    }

    #[must_use]
    pub const fn ledger(&self) -> &CartLedger {
        &self.ledger
    }

    /// Apply one mutation and persist the result.
    pub async fn mutate<R>(&mut self, op: impl FnOnce(&mut CartLedger) -> R) -> R {
        let result = op(&mut self.ledger);
        self.persist().await;
        result
    }

    async fn persist(&self) {
        if let Err(e) = self.session.insert(session_keys::CART, &self.ledger).await {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Snapshot a product variant into a cart line.
///
/// Price, stock, name, and image come from the catalog record, never from
/// the client. When a product offers sizes or colors, one of them must be
/// chosen; products without options take none.
///
/// # Errors
///
/// Returns a [`CartError`] if the product is out of stock or the variant
/// does not exist.
pub fn line_from_product(
    product: &Product,
    size: Option<String>,
    color: Option<String>,
    quantity: i64,
) -> Result<CartLine, CartError> {
    if !product.in_stock() {
        return Err(CartError::OutOfStock(product.name.clone()));
    }
    let size = pick_option(size, &product.sizes, CartError::MissingSize, CartError::UnknownSize)?;
    let color = pick_option(
        color,
        &product.colors,
        CartError::MissingColor,
        CartError::UnknownColor,
    )?;

    Ok(CartLine {
        product_id: product.id,
        size,
        color,
        quantity: u32::try_from(quantity.max(1)).unwrap_or(u32::MAX),
        unit_price: product.price,
        stock_ceiling: product.stock_ceiling(),
        name: product.name.clone(),
        image: product.primary_image().to_string(),
    })
}

fn pick_option(
    chosen: Option<String>,
    offered: &[String],
    missing: CartError,
    unknown: fn(String) -> CartError,
) -> Result<Option<String>, CartError> {
    let chosen = chosen.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    match chosen {
        None if offered.is_empty() => Ok(None),
        None => Err(missing),
        Some(value) if offered.contains(&value) => Ok(Some(value)),
        Some(value) => Err(unknown(value)),
    }
}
