//! Orders.
//!
//! An order is created pending and unpaid the moment checkout is submitted,
//! before the shopper has paid anything. Its line items are frozen copies of
//! the cart lines and its prices are computed once, at creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::pricing::PriceBreakdown;
use crate::types::{OrderId, OrderStatus, ProductId, UserId};

/// The only payment method the storefront offers.
pub const PAYMENT_METHOD: &str = "stripe";

/// Errors building or transitioning an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("shipping address is missing {0}")]
    MissingAddressField(&'static str),
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order is already paid")]
    AlreadyPaid,
}

/// Where the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Every field is required; surrounding whitespace is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::MissingAddressField`] naming the first blank field.
    pub fn normalized(self) -> Result<Self, OrderError> {
        let field = |value: String, name: &'static str| {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                Err(OrderError::MissingAddressField(name))
            } else {
                Ok(trimmed)
            }
        };

        Ok(Self {
            full_name: field(self.full_name, "full name")?,
            address: field(self.address, "address")?,
            city: field(self.city, "city")?,
            postal_code: field(self.postal_code, "postal code")?,
            country: field(self.country, "country")?,
        })
    }
}

/// A frozen copy of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            image: line.image.clone(),
            price: line.unit_price,
            quantity: line.quantity,
            size: line.size.clone(),
            color: line.color.clone(),
        }
    }
}

/// Gateway details recorded when an order is marked paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub email: Option<String>,
}

/// Everything needed to insert a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub prices: PriceBreakdown,
}

impl OrderDraft {
    /// Freeze cart lines into a priced draft.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NoItems`] for an empty cart or
    /// [`OrderError::MissingAddressField`] for an incomplete address.
    pub fn from_cart(
        user_id: UserId,
        lines: &[CartLine],
        shipping_address: ShippingAddress,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        let shipping_address = shipping_address.normalized()?;

        let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();

        Ok(Self {
            user_id,
            items: lines.iter().map(OrderItem::from).collect(),
            shipping_address,
            payment_method: PAYMENT_METHOD.to_string(),
            prices: PriceBreakdown::from_subtotal(subtotal),
        })
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_result: Option<PaymentResult>,
    #[serde(flatten)]
    pub prices: PriceBreakdown,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a freshly inserted draft.
    #[must_use]
    pub fn from_draft(id: OrderId, draft: OrderDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            items: draft.items,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method,
            payment_result: None,
            prices: draft.prices,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Move to `next` along the status state machine.
    ///
    /// Entering `delivered` also stamps `is_delivered`/`delivered_at`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidTransition`] for moves the state machine
    /// does not allow.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next == OrderStatus::Delivered {
            self.is_delivered = true;
            self.delivered_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record out-of-band payment confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::AlreadyPaid`] if payment was already recorded.
    pub fn mark_paid(
        &mut self,
        result: Option<PaymentResult>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.is_paid {
            return Err(OrderError::AlreadyPaid);
        }
        self.is_paid = true;
        self.paid_at = Some(now);
        self.payment_result = result;
        self.updated_at = now;
        Ok(())
    }
}
