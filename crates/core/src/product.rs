//! Catalog entries.
//!
//! Products are owned by the admin surface. The storefront only reads them,
//! and the cart snapshots price and stock from them when a line is added.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Sizes offered when a product does not specify its own.
pub const DEFAULT_SIZES: [&str; 5] = ["S", "M", "L", "XL", "XXL"];

/// Colors offered when a product does not specify its own.
pub const DEFAULT_COLORS: [&str; 2] = ["Black", "White"];

/// Merchandise category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    TShirt,
    Hoodie,
    Poster,
    Mug,
    Figure,
    Accessory,
    Other,
}

impl ProductCategory {
    pub const ALL: [Self; 7] = [
        Self::TShirt,
        Self::Hoodie,
        Self::Poster,
        Self::Mug,
        Self::Figure,
        Self::Accessory,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TShirt => "t-shirt",
            Self::Hoodie => "hoodie",
            Self::Poster => "poster",
            Self::Mug => "mug",
            Self::Figure => "figure",
            Self::Accessory => "accessory",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ProductError::UnknownCategory(s.to_string()))
    }
}

/// Product validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("Please provide a product {0}")]
    MissingField(&'static str),
    #[error("Please provide at least one image")]
    NoImages,
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("stock cannot be negative")]
    NegativeStock,
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: ProductCategory,
    pub anime: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: i32,
    pub featured: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// First image, used as the cart and order thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }

    /// Stock as a cart quantity ceiling.
    #[must_use]
    pub fn stock_ceiling(&self) -> u32 {
        u32::try_from(self.stock).unwrap_or(0)
    }
}

/// Admin payload for creating or replacing a product.
///
/// Optional list fields fall back to the catalog defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: ProductCategory,
    pub anime: String,
    #[serde(default)]
    pub sizes: Option<Vec<String>>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A [`ProductInput`] that passed validation, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: ProductCategory,
    pub anime: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: i32,
    pub featured: bool,
    pub tags: Vec<String>,
}

impl ProductInput {
    /// Check the catalog rules and fill in defaults.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProductError`] encountered.
    pub fn validate(self) -> Result<ValidProduct, ProductError> {
        let name = required(self.name, "name")?;
        let description = required(self.description, "description")?;
        let anime = required(self.anime, "anime")?;

        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ProductError::NegativePrice);
        }
        if self.stock < 0 {
            return Err(ProductError::NegativeStock);
        }

        let images: Vec<String> = self
            .images
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if images.is_empty() {
            return Err(ProductError::NoImages);
        }

        Ok(ValidProduct {
            name,
            description,
            price: self.price,
            images,
            category: self.category,
            anime,
            sizes: self
                .sizes
                .unwrap_or_else(|| DEFAULT_SIZES.map(String::from).to_vec()),
            colors: self
                .colors
                .unwrap_or_else(|| DEFAULT_COLORS.map(String::from).to_vec()),
            stock: self.stock,
            featured: self.featured,
            tags: self.tags,
        })
    }
}

fn required(value: String, field: &'static str) -> Result<String, ProductError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProductError::MissingField(field));
    }
    Ok(trimmed.to_string())
}
