//! Startup seeding of the product store from a JSON catalog file.

use std::path::Path;

use cart_store::{Product, ProductStore, ProductStoreExt, StoreError};

/// Errors raised while seeding the product catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parses a catalog document: a JSON array of products.
pub fn parse_catalog(json: &str) -> Result<Vec<Product>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

/// Registers every product of the catalog file that the store does not know
/// yet. Returns the number of products registered.
#[tracing::instrument(skip(store))]
pub async fn seed_catalog<P: ProductStore>(store: &P, path: &Path) -> Result<usize, CatalogError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let mut registered = 0;
    for product in parse_catalog(&json)? {
        if store.product_exists(&product.model).await? {
            tracing::warn!(model = %product.model, "product already registered, skipping");
            continue;
        }
        store.register_product(product).await?;
        registered += 1;
    }

    tracing::info!(registered, "product catalog seeded");
    Ok(registered)
}
