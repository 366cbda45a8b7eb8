//! Catalog reads and admin product management.
//!
//! Product detail reads go through a 5-minute in-process cache; admin
//! writes invalidate the affected entry. Listings always hit the database.

use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use animix_core::{Product, ProductError, ProductId, ProductInput};

use crate::db::{CatalogQuery, ProductRepository, RepositoryError};

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 1000;

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Product not found")]
    NotFound,
    #[error(transparent)]
    Invalid(#[from] ProductError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cache of product detail reads.
#[derive(Clone)]
pub struct ProductCache {
    cache: Cache<ProductId, Product>,
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    async fn get(&self, id: ProductId) -> Option<Product> {
        self.cache.get(&id).await
    }

    async fn put(&self, product: Product) {
        self.cache.insert(product.id, product).await;
    }

    async fn invalidate(&self, id: ProductId) {
        self.cache.invalidate(&id).await;
    }
}

/// Pagination block of a listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    cache: &'a ProductCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a ProductCache) -> Self {
        Self {
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// One page of products plus pagination.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError> {
        let products = self.products.list(query).await?;
        let total = self.products.count(&query.filter).await?;

        Ok(CatalogPage {
            products,
            pagination: Pagination {
                page: query.page,
                limit: query.limit,
                total,
                pages: query.pages(total),
            },
        })
    }

    /// A single product, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        if let Some(product) = self.cache.get(id).await {
            tracing::debug!("Product cache hit");
            return Ok(product);
        }

        let product = self.products.get(id).await?.ok_or(CatalogError::NotFound)?;
        self.cache.put(product.clone()).await;
        Ok(product)
    }

    /// Validate and insert a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the input breaks a catalog rule.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let valid = input.validate()?;
        let product = self.products.create(&valid).await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Validate and replace a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input and
    /// `CatalogError::NotFound` if the product doesn't exist.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        let valid = input.validate()?;
        let product = self.products.update(id, &valid).await.map_err(not_found)?;
        self.cache.invalidate(id).await;
        tracing::info!("Product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        self.products.delete(id).await.map_err(not_found)?;
        self.cache.invalidate(id).await;
        tracing::info!("Product deleted");
        Ok(())
    }

    /// Total number of products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn count_all(&self) -> Result<i64, CatalogError> {
        Ok(self.products.count(&crate::db::ProductFilter::default()).await?)
    }
}

fn not_found(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::NotFound => CatalogError::NotFound,
        other => CatalogError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use animix_core::ProductCategory;

    use super::*;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: "Chainsaw Man Poster".to_string(),
            description: "A2 matte".to_string(),
            price: "18.00".parse().unwrap(),
            images: vec!["/img/csm.jpg".to_string()],
            category: ProductCategory::Poster,
            anime: "Chainsaw Man".to_string(),
            sizes: vec![],
            colors: vec![],
            stock: 40,
            featured: true,
            tags: vec!["denji".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cache_put_get_invalidate() {
        let cache = ProductCache::new();
        assert!(cache.get(ProductId::new(4)).await.is_none());

        cache.put(product(4)).await;
        assert_eq!(cache.get(ProductId::new(4)).await.unwrap().name, "Chainsaw Man Poster");

        cache.invalidate(ProductId::new(4)).await;
        assert!(cache.get(ProductId::new(4)).await.is_none());
    }

    #[test]
    fn test_not_found_mapping() {
        assert!(matches!(
            not_found(RepositoryError::NotFound),
            CatalogError::NotFound
        ));
        assert!(matches!(
            not_found(RepositoryError::Conflict("x".to_string())),
            CatalogError::Repository(_)
        ));
    }
}
