//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::payments::{PaymentError, StripeClient};
use crate::services::catalog::ProductCache;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds immutable configuration, the
/// connection pool, the payment gateway client, and the product cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    stripe: StripeClient,
    product_cache: ProductCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, PaymentError> {
        let stripe = StripeClient::new(&config.stripe)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                product_cache: ProductCache::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The Stripe Checkout client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    #[must_use]
    pub fn product_cache(&self) -> &ProductCache {
        &self.inner.product_cache
    }
}
