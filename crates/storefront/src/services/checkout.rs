//! The order pipeline.
//!
//! ```text
//! cart ──► OrderDraft ──► OrderStore::create_order ──► PaymentGateway::create_session ──► redirect
//!                                                                                          │
//!                              cart cleared ◄── GET /checkout/success ◄────────────────────┘
//! ```
//!
//! Steps run strictly in order and nothing is rolled back: if the gateway
//! call fails the order stays pending and unpaid, and the cart is left as
//! it was so the shopper can retry. Each retry creates a new order.

use std::future::Future;

use serde::Serialize;
use tracing::instrument;
use url::Url;

use animix_core::{
    CartLedger, CurrencyCode, Order, OrderDraft, OrderError, OrderId, OrderItem, Price,
    PriceError, ShippingAddress, UserId,
};

use crate::db::{OrderRepository, RepositoryError};
use crate::payments::{
    GatewayLineItem, PaymentError, PaymentGateway, SESSION_ID_PLACEHOLDER, SessionRequest,
};
use crate::services::cart::SessionCart;

/// Errors from a checkout run.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Empty cart or incomplete address; nothing was persisted.
    #[error(transparent)]
    Invalid(#[from] OrderError),
    /// A line price has no gateway amount; nothing was persisted.
    #[error("invalid line price: {0}")]
    Pricing(#[from] PriceError),
    /// The order could not be stored; the cart is untouched.
    #[error("could not create order: {0}")]
    Persistence(#[from] RepositoryError),
    /// The order exists but no payment session was created.
    #[error("could not start payment: {0}")]
    Payment(#[from] PaymentError),
}

/// Where checkout writes new orders.
pub trait OrderStore: Send + Sync {
    fn create_order(
        &self,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;
}

impl OrderStore for OrderRepository<'_> {
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        self.create(draft).await
    }
}

/// Who is checking out.
#[derive(Debug, Clone)]
pub struct Buyer {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// A successful checkout: the pending order and where to pay for it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub session_id: String,
    pub redirect_url: String,
}

/// Runs checkout against an order store and a payment gateway.
pub struct CheckoutPipeline<'a, S, G> {
    orders: &'a S,
    gateway: &'a G,
    base_url: &'a str,
    currency: CurrencyCode,
}

impl<'a, S: OrderStore, G: PaymentGateway> CheckoutPipeline<'a, S, G> {
    /// `base_url` is the public storefront URL without trailing slash.
    #[must_use]
    pub const fn new(orders: &'a S, gateway: &'a G, base_url: &'a str) -> Self {
        Self {
            orders,
            gateway,
            base_url,
            currency: CurrencyCode::USD,
        }
    }

    /// Price the cart, persist a pending order, and open a payment session.
    ///
    /// The cart is only read; clearing it is the confirmation step's job.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`] for what each failure leaves behind.
    #[instrument(skip(self, cart, address), fields(user_id = %buyer.user_id, order_id))]
    pub async fn run(
        &self,
        buyer: &Buyer,
        cart: &CartLedger,
        address: ShippingAddress,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let draft = OrderDraft::from_cart(buyer.user_id, cart.lines(), address)?;
        let line_items = gateway_line_items(&draft.items)?;

        let order = self.orders.create_order(&draft).await?;
        tracing::Span::current().record("order_id", order.id.as_i32());
        tracing::info!(total = %order.prices.total_price, "Order created");

        let request = SessionRequest {
            line_items,
            currency: self.currency,
            success_url: success_url(self.base_url, order.id),
            cancel_url: cancel_url(self.base_url),
            customer_email: buyer.email.clone(),
            order_id: order.id,
            user_id: buyer.user_id,
        };

        let session = self.gateway.create_session(&request).await.inspect_err(|e| {
            tracing::error!(
                order_id = %order.id,
                error = %e,
                "Payment session failed; order left pending and unpaid"
            );
        })?;

        Ok(CheckoutOutcome {
            order,
            session_id: session.session_id,
            redirect_url: session.redirect_url,
        })
    }
}

/// Handle the shopper's return from the hosted payment page.
///
/// The cart is cleared on arrival alone; payment is not verified here.
pub async fn confirm_return(
    cart: &mut SessionCart<'_>,
    order_id: Option<OrderId>,
    session_id: Option<&str>,
) {
    tracing::info!(
        order_id = order_id.map(|id| id.as_i32()),
        session_id,
        "Checkout return; clearing cart without payment verification"
    );
    cart.mutate(CartLedger::clear).await;
}

/// Success URL with the gateway's session placeholder left intact.
#[must_use]
pub fn success_url(base_url: &str, order_id: OrderId) -> String {
    format!("{base_url}/checkout/success?session_id={SESSION_ID_PLACEHOLDER}&order_id={order_id}")
}

#[must_use]
pub fn cancel_url(base_url: &str) -> String {
    format!("{base_url}/cart")
}

fn gateway_line_items(items: &[OrderItem]) -> Result<Vec<GatewayLineItem>, PriceError> {
    items
        .iter()
        .map(|item| {
            Ok(GatewayLineItem {
                name: item.name.clone(),
                description: format!(
                    "Size: {}, Color: {}",
                    item.size.as_deref().unwrap_or("N/A"),
                    item.color.as_deref().unwrap_or("N/A")
                ),
                image: absolute_image(&item.image),
                unit_amount: Price::usd(item.price).to_minor_units()?,
                quantity: item.quantity,
            })
        })
        .collect()
}

fn absolute_image(image: &str) -> Option<String> {
    Url::parse(image)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use animix_core::{CartLine, OrderStatus, ProductId};

    use super::*;
    use crate::payments::PaymentSession;

    #[derive(Default)]
    struct MemoryOrders {
        orders: Mutex<Vec<Order>>,
        fail: bool,
    }

    impl OrderStore for MemoryOrders {
        async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::DataCorruption("disk full".to_string()));
            }
            let mut orders = self.orders.lock().unwrap();
            let id = OrderId::new(i32::try_from(orders.len()).unwrap() + 1);
            let order = Order::from_draft(id, draft.clone(), Utc::now());
            orders.push(order.clone());
            Ok(order)
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        requests: Mutex<Vec<SessionRequest>>,
        fail: bool,
    }

    impl PaymentGateway for RecordingGateway {
        async fn create_session(
            &self,
            request: &SessionRequest,
        ) -> Result<PaymentSession, PaymentError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(PaymentError::Api {
                    status: 402,
                    message: "card_error: declined".to_string(),
                });
            }
            Ok(PaymentSession {
                session_id: "cs_test_1".to_string(),
                redirect_url: "https://checkout.stripe.com/c/pay/cs_test_1".to_string(),
            })
        }
    }

    fn cart() -> CartLedger {
        let mut cart = CartLedger::new();
        cart.add(CartLine {
            product_id: ProductId::new(1),
            size: Some("M".to_string()),
            color: Some("Black".to_string()),
            quantity: 2,
            unit_price: "25.00".parse().unwrap(),
            stock_ceiling: 5,
            name: "Straw Hat Tee".to_string(),
            image: "https://cdn.animix.shop/hat.jpg".to_string(),
        });
        cart
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Nami".to_string(),
            address: "2 Tangerine Grove".to_string(),
            city: "Cocoyasi".to_string(),
            postal_code: "00002".to_string(),
            country: "East Blue".to_string(),
        }
    }

    fn buyer() -> Buyer {
        Buyer {
            user_id: UserId::new(3),
            email: Some("nami@sunny.sea".to_string()),
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_checkout_creates_priced_pending_order() {
        let orders = MemoryOrders::default();
        let gateway = RecordingGateway::default();
        let pipeline = CheckoutPipeline::new(&orders, &gateway, "http://localhost:3000");

        let outcome = pipeline.run(&buyer(), &cart(), address()).await.unwrap();

        assert_eq!(outcome.order.prices.items_price, dec("50.00"));
        assert_eq!(outcome.order.prices.shipping_price, dec("10.00"));
        assert_eq!(outcome.order.prices.tax_price, dec("5.00"));
        assert_eq!(outcome.order.prices.total_price, dec("65.00"));
        assert_eq!(outcome.order.status, OrderStatus::Pending);
        assert!(!outcome.order.is_paid);
        assert_eq!(outcome.session_id, "cs_test_1");
    }

    #[tokio::test]
    async fn test_checkout_session_request_shape() {
        let orders = MemoryOrders::default();
        let gateway = RecordingGateway::default();
        let pipeline = CheckoutPipeline::new(&orders, &gateway, "http://localhost:3000");
        pipeline.run(&buyer(), &cart(), address()).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        let request = requests.first().unwrap();
        assert_eq!(
            request.success_url,
            "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}&order_id=1"
        );
        assert_eq!(request.cancel_url, "http://localhost:3000/cart");
        assert_eq!(request.order_id, OrderId::new(1));
        assert_eq!(request.user_id, UserId::new(3));

        let item = request.line_items.first().unwrap();
        assert_eq!(item.unit_amount, 2500);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.description, "Size: M, Color: Black");
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_pending_order() {
        let orders = MemoryOrders::default();
        let gateway = RecordingGateway {
            fail: true,
            ..RecordingGateway::default()
        };
        let pipeline = CheckoutPipeline::new(&orders, &gateway, "http://localhost:3000");
        let cart = cart();

        let err = pipeline.run(&buyer(), &cart, address()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Payment(_)));

        let stored = orders.orders.lock().unwrap();
        assert_eq!(stored.len(), 1);
        let order = stored.first().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert_eq!(cart.total_items(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_skips_gateway() {
        let orders = MemoryOrders {
            fail: true,
            ..MemoryOrders::default()
        };
        let gateway = RecordingGateway::default();
        let pipeline = CheckoutPipeline::new(&orders, &gateway, "http://localhost:3000");

        let err = pipeline.run(&buyer(), &cart(), address()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(_)));
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_persists_nothing() {
        let orders = MemoryOrders::default();
        let gateway = RecordingGateway::default();
        let pipeline = CheckoutPipeline::new(&orders, &gateway, "http://localhost:3000");

        let err = pipeline
            .run(&buyer(), &CartLedger::new(), address())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(OrderError::NoItems)));
        assert!(orders.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected_before_persisting() {
        let orders = MemoryOrders::default();
        let gateway = RecordingGateway::default();
        let pipeline = CheckoutPipeline::new(&orders, &gateway, "http://localhost:3000");
        let mut cart = CartLedger::new();
        cart.add(CartLine {
            product_id: ProductId::new(4),
            size: None,
            color: None,
            quantity: 1,
            unit_price: "-1.00".parse().unwrap(),
            stock_ceiling: 3,
            name: "Broken Listing".to_string(),
            image: "/img/broken.jpg".to_string(),
        });

        let err = pipeline.run(&buyer(), &cart, address()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Pricing(PriceError::Negative(_))));
        assert!(orders.orders.lock().unwrap().is_empty());
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_line_item_description_defaults() {
        let items = vec![OrderItem {
            product_id: ProductId::new(9),
            name: "Survey Corps Mug".to_string(),
            image: "/img/mug.jpg".to_string(),
            price: dec("12.995"),
            quantity: 1,
            size: None,
            color: None,
        }];
        let line_items = gateway_line_items(&items).unwrap();
        let item = line_items.first().unwrap();
        assert_eq!(item.description, "Size: N/A, Color: N/A");
        assert_eq!(item.image, None);
        assert_eq!(item.unit_amount, 1300);
    }
}
