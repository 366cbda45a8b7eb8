//! The cart ledger.
//!
//! A shopper's unconfirmed selection: an ordered list of lines, one per
//! (product, size, color) variant. Each line carries the unit price and stock
//! level captured when it was first added. The ledger trusts those snapshots
//! and never refreshes them from the catalog, so the totals a shopper sees are
//! exactly the totals checkout will price.
//!
//! # Invariants
//!
//! - At most one line per [`CartKey`].
//! - Every line satisfies `1 <= quantity <= stock_ceiling`. Requests outside
//!   that range clamp instead of failing.
//!
//! The ledger itself is pure; the storefront loads it from the session,
//! applies one operation, and writes it back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Identity of a cart line.
///
/// Size and color are optional because some products (mugs, posters) have
/// neither. `None` matches only `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartKey {
    #[must_use]
    pub fn new(product_id: ProductId, size: Option<String>, color: Option<String>) -> Self {
        Self {
            product_id,
            size,
            color,
        }
    }

    fn matches(&self, line: &CartLine) -> bool {
        self.product_id == line.product_id && self.size == line.size && self.color == line.color
    }
}

/// One stocked variant of a product held in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    /// Catalog price when the line was added.
    pub unit_price: Decimal,
    /// Catalog stock when the line was added; the quantity ceiling.
    pub stock_ceiling: u32,
    /// Product name snapshot, frozen into the order at checkout.
    pub name: String,
    /// Primary product image snapshot.
    pub image: String,
}

impl CartLine {
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_id, self.size.clone(), self.color.clone())
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    fn clamp_quantity(&self, requested: i64) -> u32 {
        let clamped = requested.clamp(1, i64::from(self.stock_ceiling.max(1)));
        u32::try_from(clamped).unwrap_or(self.stock_ceiling)
    }
}

/// The shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLedger {
    lines: Vec<CartLine>,
}

impl CartLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &CartKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| key.matches(line))
    }

    /// Add a line, merging with an existing line for the same key.
    ///
    /// On merge the quantity grows by the incoming quantity and is capped at
    /// the *stored* stock ceiling; the incoming line's price and stock are
    /// ignored. A new line is inserted with its quantity clamped into
    /// `[1, stock_ceiling]`. Lines with no stock are dropped.
    pub fn add(&mut self, line: CartLine) {
        let key = line.key();
        if let Some(existing) = self.lines.iter_mut().find(|l| key.matches(l)) {
            let wanted = i64::from(existing.quantity) + i64::from(line.quantity);
            existing.quantity = existing.clamp_quantity(wanted);
            return;
        }

        if line.stock_ceiling == 0 {
            return;
        }

        let quantity = line.clamp_quantity(i64::from(line.quantity));
        self.lines.push(CartLine { quantity, ..line });
    }

    /// Remove the line for `key`. Returns whether a line was removed.
    pub fn remove(&mut self, key: &CartKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !key.matches(line));
        self.lines.len() != before
    }

    /// Set the quantity for `key` to `clamp(requested, 1, stock_ceiling)`.
    ///
    /// Zero and negative requests become 1; removal is a separate operation.
    /// Returns the resulting quantity, or `None` if no line matches.
    pub fn update_quantity(&mut self, key: &CartKey, requested: i64) -> Option<u32> {
        let line = self.lines.iter_mut().find(|l| key.matches(l))?;
        line.quantity = line.clamp_quantity(requested);
        Some(line.quantity)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `unit_price * quantity` using each line's snapshot price.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn line(
        product: i32,
        size: &str,
        color: &str,
        quantity: u32,
        price: &str,
        stock: u32,
    ) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            size: Some(size.to_string()),
            color: Some(color.to_string()),
            quantity,
            unit_price: price.parse().unwrap(),
            stock_ceiling: stock,
            name: format!("Product {product}"),
            image: format!("/img/{product}.jpg"),
        }
    }

    fn key(product: i32, size: &str, color: &str) -> CartKey {
        CartKey::new(
            ProductId::new(product),
            Some(size.to_string()),
            Some(color.to_string()),
        )
    }

    #[test]
    fn test_add_merges_same_key() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 1, "25.00", 10));
        cart.add(line(1, "M", "Black", 2, "25.00", 10));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_add_distinguishes_variants() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 1, "25.00", 10));
        cart.add(line(1, "L", "Black", 1, "25.00", 10));
        cart.add(line(1, "M", "White", 1, "25.00", 10));

        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_add_merge_clamps_to_stock_ceiling() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 3, "25.00", 4));
        cart.add(line(1, "M", "Black", 3, "25.00", 4));

        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn test_add_merge_uses_stored_snapshot() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 2, "25.00", 3));
        // A stale caller claims more stock and a different price.
        cart.add(line(1, "M", "Black", 5, "19.00", 50));

        let stored = &cart.lines()[0];
        assert_eq!(stored.quantity, 3);
        assert_eq!(stored.stock_ceiling, 3);
        assert_eq!(stored.unit_price, "25.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_add_new_line_is_clamped() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 9, "25.00", 2));
        cart.add(line(2, "M", "Black", 0, "25.00", 2));

        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.lines()[1].quantity, 1);
    }

    #[test]
    fn test_add_out_of_stock_is_ignored() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 1, "25.00", 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_optional_variant_fields_match_exactly() {
        let mut cart = CartLedger::new();
        let mut mug = line(7, "", "", 1, "12.00", 5);
        mug.size = None;
        mug.color = None;
        cart.add(mug.clone());
        cart.add(mug);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert!(cart.get(&CartKey::new(ProductId::new(7), None, None)).is_some());
        assert!(cart.get(&key(7, "", "")).is_none());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 1, "25.00", 10));

        assert!(!cart.remove(&key(2, "M", "Black")));
        assert_eq!(cart.lines().len(), 1);
        assert!(cart.remove(&key(1, "M", "Black")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_clamps_low_to_one() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 3, "25.00", 10));

        assert_eq!(cart.update_quantity(&key(1, "M", "Black"), 0), Some(1));
        assert_eq!(cart.update_quantity(&key(1, "M", "Black"), -4), Some(1));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_update_quantity_clamps_high_to_ceiling() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 1, "25.00", 6));

        assert_eq!(cart.update_quantity(&key(1, "M", "Black"), 99), Some(6));
        assert_eq!(cart.update_quantity(&key(1, "M", "Black"), 4), Some(4));
    }

    #[test]
    fn test_update_quantity_missing_key() {
        let mut cart = CartLedger::new();
        assert_eq!(cart.update_quantity(&key(1, "M", "Black"), 2), None);
    }

    #[test]
    fn test_totals() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 2, "25.00", 5));
        cart.add(line(2, "L", "White", 1, "12.50", 5));

        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), "62.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_clear_zeroes_totals() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 2, "25.00", 5));
        cart.clear();

        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_persisted_layout_is_a_plain_list() {
        let mut cart = CartLedger::new();
        cart.add(line(1, "M", "Black", 2, "25.00", 5));

        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["quantity"], 2);

        let back: CartLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
