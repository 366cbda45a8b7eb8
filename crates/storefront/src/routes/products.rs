//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use animix_core::{Product, ProductCategory, ProductId};

use crate::db::{CatalogQuery, ProductFilter, ProductSort};
use crate::error::{AppError, Result};
use crate::services::catalog::{CatalogPage, CatalogService};
use crate::state::AppState;

use super::parse_id;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub anime: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListParams {
    fn into_query(self) -> Result<CatalogQuery> {
        let category = non_empty(self.category)
            .map(|raw| raw.parse::<ProductCategory>())
            .transpose()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let filter = ProductFilter {
            category,
            anime: non_empty(self.anime),
            featured: self.featured,
            search: non_empty(self.search),
        };
        Ok(CatalogQuery::new(
            filter,
            ProductSort::parse(self.sort.as_deref()),
            self.page,
            self.limit,
        ))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CatalogPage>> {
    let query = params.into_query()?;
    let page = CatalogService::new(state.pool(), state.product_cache())
        .list(&query)
        .await?;
    Ok(Json(page))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = CatalogService::new(state.pool(), state.product_cache())
        .get(id)
        .await?;
    Ok(Json(product))
}
