//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Straw Hat Tee
//!     description: Heavyweight cotton
//!     price: "25.00"
//!     images: [/images/straw-hat-tee.jpg]
//!     category: t-shirt
//!     anime: One Piece
//!     stock: 40
//! ```
//!
//! Every entry is validated with the same rules as the admin API before the
//! database is touched; one bad entry aborts the whole run.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use animix_core::{ProductError, ProductInput, ValidProduct};
use animix_storefront::db::ProductRepository;

use super::connect;

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<ProductInput>,
}

/// Parse and validate a seed file's contents.
///
/// Returns every validation failure, labelled with the entry's position.
fn parse_products(content: &str) -> Result<Vec<ValidProduct>, Box<dyn std::error::Error>> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let mut valid = Vec::with_capacity(file.products.len());
    let mut errors: Vec<(usize, ProductError)> = Vec::new();
    for (index, input) in file.products.into_iter().enumerate() {
        match input.validate() {
            Ok(product) => valid.push(product),
            Err(e) => errors.push((index + 1, e)),
        }
    }

    if errors.is_empty() {
        return Ok(valid);
    }

    error!("Seed file validation failed:");
    for (position, err) in &errors {
        error!("  - product #{position}: {err}");
    }
    Err(format!("{} validation errors found", errors.len()).into())
}

/// Insert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or an insert fails.
pub async fn products(file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %file_path.display(), "Loading products from file");
    let content = tokio::fs::read_to_string(file_path).await?;
    let products = parse_products(&content)?;
    info!(count = products.len(), "Seed file validated");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);
    for product in &products {
        let created = repo.create(product).await?;
        info!(product_id = %created.id, name = %created.name, "Inserted");
    }

    info!("Seeding complete! {} products inserted", products.len());
    Ok(())
}
