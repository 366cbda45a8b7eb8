//! Product repository: the catalog store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use animix_core::{Product, ProductCategory, ProductId, ValidProduct};

use super::RepositoryError;

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

const PRODUCT_COLUMNS: &str = "id, name, description, price, images, category, anime, \
     sizes, colors, stock, featured, tags, created_at, updated_at";

/// Catalog sort order, in its query-string spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// `-createdAt`
    #[default]
    Newest,
    /// `createdAt`
    Oldest,
    /// `price`
    PriceLowHigh,
    /// `-price`
    PriceHighLow,
    /// `name`
    NameAz,
    /// `-name`
    NameZa,
}

impl ProductSort {
    /// Parse a sort parameter. Unknown values fall back to newest first.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("createdAt") => Self::Oldest,
            Some("price") => Self::PriceLowHigh,
            Some("-price") => Self::PriceHighLow,
            Some("name") => Self::NameAz,
            Some("-name") => Self::NameZa,
            _ => Self::Newest,
        }
    }

    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::Oldest => "created_at ASC, id ASC",
            Self::PriceLowHigh => "price ASC, id ASC",
            Self::PriceHighLow => "price DESC, id DESC",
            Self::NameAz => "name ASC, id ASC",
            Self::NameZa => "name DESC, id DESC",
        }
    }
}

/// Catalog filters. Empty fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    pub anime: Option<String>,
    pub featured: Option<bool>,
    /// Case-insensitive substring match over name, description, and anime.
    pub search: Option<String>,
}

/// A normalized catalog listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: ProductFilter,
    pub sort: ProductSort,
    pub page: u32,
    pub limit: u32,
}

impl CatalogQuery {
    /// Build a query, clamping page to at least 1 and limit into `[1, 100]`.
    #[must_use]
    pub fn new(
        filter: ProductFilter,
        sort: ProductSort,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let limit = limit
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE));
        Self {
            filter,
            sort,
            page: u32::try_from(page).unwrap_or(1),
            limit: u32::try_from(limit).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Number of pages needed for `total` matches.
    #[must_use]
    pub fn pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total.max(0) + limit - 1) / limit
    }
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self::new(ProductFilter::default(), ProductSort::default(), None, None)
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    images: Vec<String>,
    category: String,
    anime: String,
    sizes: Vec<String>,
    colors: Vec<String>,
    stock: i32,
    featured: bool,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = row.category.parse::<ProductCategory>().map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            images: row.images,
            category,
            anime: row.anime,
            sizes: row.sizes,
            colors: row.colors,
            stock: row.stock,
            featured: row.featured,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching the query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored category is unknown.
    pub async fn list(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products"
        ));
        push_filter(&mut builder, &query.filter);
        builder.push(" ORDER BY ").push(query.sort.order_by());
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Number of products matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM storefront.products");
        push_filter(&mut builder, filter);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Insert a validated product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, product: &ValidProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.products
                (name, description, price, images, category, anime, sizes, colors, stock, featured, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.images)
        .bind(product.category.as_str())
        .bind(&product.anime)
        .bind(&product.sizes)
        .bind(&product.colors)
        .bind(product.stock)
        .bind(product.featured)
        .bind(&product.tags)
        .fetch_one(self.pool)
        .await?;

        Product::try_from(row)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ProductId,
        product: &ValidProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.products
            SET name = $2, description = $3, price = $4, images = $5, category = $6,
                anime = $7, sizes = $8, colors = $9, stock = $10, featured = $11,
                tags = $12, updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.images)
        .bind(product.category.as_str())
        .bind(&product.anime)
        .bind(&product.sizes)
        .bind(&product.colors)
        .bind(product.stock)
        .bind(product.featured)
        .bind(&product.tags)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Delete a product. Existing orders keep their frozen copies.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");

    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(anime) = filter.anime.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND lower(anime) = lower(")
            .push_bind(anime.to_string())
            .push(")");
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND featured = ").push_bind(featured);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR anime ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!(ProductSort::parse(None), ProductSort::Newest);
        assert_eq!(ProductSort::parse(Some("-createdAt")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(Some("createdAt")), ProductSort::Oldest);
        assert_eq!(ProductSort::parse(Some("price")), ProductSort::PriceLowHigh);
        assert_eq!(ProductSort::parse(Some("-price")), ProductSort::PriceHighLow);
        assert_eq!(ProductSort::parse(Some("name")), ProductSort::NameAz);
        assert_eq!(ProductSort::parse(Some("-name")), ProductSort::NameZa);
        assert_eq!(ProductSort::parse(Some("rating")), ProductSort::Newest);
    }

    #[test]
    fn test_query_defaults() {
        let query = CatalogQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 12);
        assert_eq!(query.offset(), 0);
    }

    fn newest(page: Option<i64>, limit: Option<i64>) -> CatalogQuery {
        CatalogQuery::new(ProductFilter::default(), ProductSort::Newest, page, limit)
    }

    #[test]
    fn test_query_clamps_page_and_limit() {
        let query = newest(Some(0), Some(500));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_SIZE);

        let query = newest(Some(-3), Some(0));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 1);
    }

    #[test]
    fn test_query_offset_and_pages() {
        let query = newest(Some(3), Some(12));
        assert_eq!(query.offset(), 24);
        assert_eq!(query.pages(0), 0);
        assert_eq!(query.pages(12), 1);
        assert_eq!(query.pages(13), 2);
        assert_eq!(query.pages(25), 3);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("naruto"), "naruto");
    }

    #[test]
    fn test_filter_sql_shape() {
        let filter = ProductFilter {
            category: Some(ProductCategory::Hoodie),
            anime: Some("Naruto".to_string()),
            featured: Some(true),
            search: Some("cloud".to_string()),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM storefront.products");
        push_filter(&mut builder, &filter);
        let sql = builder.sql();

        assert!(sql.contains("category = $1"));
        assert!(sql.contains("lower(anime) = lower($2)"));
        assert!(sql.contains("featured = $3"));
        assert!(sql.contains("name ILIKE $4"));
        assert!(sql.contains("anime ILIKE $6"));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let filter = ProductFilter {
            anime: Some("  ".to_string()),
            search: Some(String::new()),
            ..ProductFilter::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1");
        push_filter(&mut builder, &filter);
        assert_eq!(builder.sql(), "SELECT 1 WHERE TRUE");
    }
}
