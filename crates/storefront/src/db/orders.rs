//! Order repository.
//!
//! Line items, the shipping address, and the gateway payment result are
//! stored as JSONB. Status and payment writes are conditional on the state
//! the caller read, so a concurrent admin edit surfaces as a conflict instead
//! of being silently overwritten.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use animix_core::{
    Order, OrderDraft, OrderId, OrderItem, OrderStatus, PaymentResult, PriceBreakdown,
    ShippingAddress, UserId,
};

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, payment_method, \
     payment_result, items_price, tax_price, shipping_price, total_price, is_paid, paid_at, \
     is_delivered, delivered_at, status, created_at, updated_at";

/// Which orders a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Restrict to one owner. `None` lists every order (admin view).
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
}

/// Order count and revenue across all orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderTotals {
    pub count: i64,
    pub revenue: Decimal,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_result: Option<Json<PaymentResult>>,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let prices = PriceBreakdown {
            items_price: row.items_price,
            tax_price: row.tax_price,
            shipping_price: row.shipping_price,
            total_price: row.total_price,
        };
        if !prices.is_consistent() {
            return Err(RepositoryError::DataCorruption(format!(
                "order {} total does not equal its parts",
                row.id
            )));
        }

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            payment_result: row.payment_result.map(|json| json.0),
            prices,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            is_delivered: row.is_delivered,
            delivered_at: row.delivered_at,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a draft as a pending, unpaid order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO storefront.orders
                (user_id, items, shipping_address, payment_method,
                 items_price, tax_price, shipping_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(draft.user_id)
        .bind(Json(&draft.items))
        .bind(Json(&draft.shipping_address))
        .bind(&draft.payment_method)
        .bind(draft.prices.items_price)
        .bind(draft.prices.tax_price)
        .bind(draft.prices.shipping_price)
        .bind(draft.prices.total_price)
        .fetch_one(self.pool)
        .await?;

        Order::try_from(row)
    }

    /// Orders matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE TRUE"
        ));
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// Persist a status change made with [`Order::transition`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the stored status is no longer
    /// `previous`. Returns `RepositoryError::Database` if the update fails.
    pub async fn save_status(
        &self,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET status = $2, is_delivered = $3, delivered_at = $4, updated_at = $5
            WHERE id = $1 AND status = $6
            ",
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .bind(previous)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "order {} is no longer {previous}",
                order.id
            )));
        }
        Ok(())
    }

    /// Persist a payment recorded with [`Order::mark_paid`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order was already paid.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn save_payment(&self, order: &Order) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.orders
            SET is_paid = TRUE, paid_at = $2, payment_result = $3, updated_at = $4
            WHERE id = $1 AND NOT is_paid
            ",
        )
        .bind(order.id)
        .bind(order.paid_at)
        .bind(order.payment_result.as_ref().map(Json))
        .bind(order.updated_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "order {} is already paid",
                order.id
            )));
        }
        Ok(())
    }

    /// Order count and the sum of every order's total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self) -> Result<OrderTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, OrderTotals>(
            "SELECT COUNT(*) AS count, COALESCE(SUM(total_price), 0) AS revenue FROM storefront.orders",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }
}
