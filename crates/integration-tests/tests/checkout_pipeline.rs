//! The order pipeline end to end: session cart, order creation, payment
//! session, and the return to the success page.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use animix_core::{CartLedger, OrderError, OrderStatus, UserId};
use animix_integration_tests::{
    FakeGateway, MemoryOrderStore, address, dec, line, memory_session, product,
};
use animix_storefront::services::cart::{SessionCart, line_from_product};
use animix_storefront::services::checkout::{
    Buyer, CheckoutError, CheckoutPipeline, confirm_return,
};

const BASE_URL: &str = "https://shop.animix.test";

fn buyer() -> Buyer {
    Buyer {
        user_id: UserId::new(11),
        email: Some("yuji@jujutsu.test".to_string()),
    }
}

#[tokio::test]
async fn test_cart_to_order_to_confirmation() {
    let session = memory_session();
    let tee = product(1, "25.00", 5);

    let mut cart = SessionCart::load(&session).await;
    let picked =
        line_from_product(&tee, Some("M".to_string()), Some("Black".to_string()), 2).unwrap();
    cart.mutate(|l| l.add(picked)).await;

    let orders = MemoryOrderStore::default();
    let gateway = FakeGateway::default();
    let outcome = CheckoutPipeline::new(&orders, &gateway, BASE_URL)
        .run(&buyer(), cart.ledger(), address())
        .await
        .unwrap();

    let order = &outcome.order;
    assert_eq!(order.prices.items_price, dec("50.00"));
    assert_eq!(order.prices.shipping_price, dec("10.00"));
    assert_eq!(order.prices.tax_price, dec("5.00"));
    assert_eq!(order.prices.total_price, dec("65.00"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.is_paid);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].size.as_deref(), Some("M"));
    assert_eq!(outcome.redirect_url, "https://checkout.stripe.com/c/pay/cs_test_1");

    // Checkout only reads the cart
    assert_eq!(SessionCart::load(&session).await.ledger().total_items(), 2);

    let mut cart = SessionCart::load(&session).await;
    confirm_return(&mut cart, Some(order.id), Some(&outcome.session_id)).await;
    assert!(SessionCart::load(&session).await.ledger().is_empty());

    // Confirmation does not touch the order
    assert!(!orders.find(order.id).unwrap().is_paid);
}

#[tokio::test]
async fn test_gateway_failure_leaves_pending_order_and_cart() {
    let session = memory_session();
    let mut cart = SessionCart::load(&session).await;
    cart.mutate(|l| l.add(line(3, None, None, 1, "40.00", 2))).await;

    let orders = MemoryOrderStore::default();
    let gateway = FakeGateway::failing();
    let err = CheckoutPipeline::new(&orders, &gateway, BASE_URL)
        .run(&buyer(), cart.ledger(), address())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(_)));

    let stored = orders.orders();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, OrderStatus::Pending);
    assert!(!stored[0].is_paid);
    assert_eq!(gateway.requests()[0].order_id, stored[0].id);

    assert_eq!(SessionCart::load(&session).await.ledger().total_items(), 1);
}

#[tokio::test]
async fn test_store_failure_skips_gateway() {
    let mut cart = CartLedger::new();
    cart.add(line(3, None, None, 1, "40.00", 2));

    let orders = MemoryOrderStore::failing();
    let gateway = FakeGateway::default();
    let err = CheckoutPipeline::new(&orders, &gateway, BASE_URL)
        .run(&buyer(), &cart, address())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Persistence(_)));
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_empty_cart_and_blank_address_persist_nothing() {
    let orders = MemoryOrderStore::default();
    let gateway = FakeGateway::default();
    let pipeline = CheckoutPipeline::new(&orders, &gateway, BASE_URL);

    let err = pipeline
        .run(&buyer(), &CartLedger::new(), address())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Invalid(OrderError::NoItems)));

    let mut cart = CartLedger::new();
    cart.add(line(1, None, None, 1, "5.00", 1));
    let mut blank = address();
    blank.city = "   ".to_string();
    let err = pipeline.run(&buyer(), &cart, blank).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Invalid(OrderError::MissingAddressField("city"))
    ));

    assert!(orders.orders().is_empty());
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_free_shipping_threshold() {
    let orders = MemoryOrderStore::default();
    let gateway = FakeGateway::default();
    let pipeline = CheckoutPipeline::new(&orders, &gateway, BASE_URL);

    let mut at_threshold = CartLedger::new();
    at_threshold.add(line(1, None, None, 4, "25.00", 10));
    let outcome = pipeline.run(&buyer(), &at_threshold, address()).await.unwrap();
    assert_eq!(outcome.order.prices.shipping_price, dec("0"));
    assert_eq!(outcome.order.prices.total_price, dec("110.00"));

    let mut below = CartLedger::new();
    below.add(line(2, None, None, 1, "99.99", 10));
    let outcome = pipeline.run(&buyer(), &below, address()).await.unwrap();
    assert_eq!(outcome.order.prices.shipping_price, dec("10.00"));
    assert_eq!(outcome.order.prices.tax_price, dec("10.00"));
    assert_eq!(outcome.order.prices.total_price, dec("119.99"));
}

#[tokio::test]
async fn test_retry_creates_a_new_order() {
    let mut cart = CartLedger::new();
    cart.add(line(1, None, None, 1, "30.00", 3));

    let orders = MemoryOrderStore::default();
    let gateway = FakeGateway::default();
    let pipeline = CheckoutPipeline::new(&orders, &gateway, BASE_URL);
    let first = pipeline.run(&buyer(), &cart, address()).await.unwrap();
    let second = pipeline.run(&buyer(), &cart, address()).await.unwrap();

    assert_ne!(first.order.id, second.order.id);
    assert_eq!(orders.orders().len(), 2);
    assert_ne!(first.session_id, second.session_id);
}

#[tokio::test]
async fn test_order_uses_cart_snapshot_prices() {
    let tee = product(1, "25.00", 5);
    let mut cart = CartLedger::new();
    cart.add(line_from_product(&tee, Some("S".to_string()), Some("White".to_string()), 1).unwrap());

    let orders = MemoryOrderStore::default();
    let gateway = FakeGateway::default();
    let outcome = CheckoutPipeline::new(&orders, &gateway, BASE_URL)
        .run(&buyer(), &cart, address())
        .await
        .unwrap();

    assert_eq!(outcome.order.items[0].price, dec("25.00"));
    assert_eq!(gateway.requests()[0].line_items[0].unit_amount, 2500);
}
