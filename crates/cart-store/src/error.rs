use thiserror::Error;

use crate::{CartId, CustomerId, ProductModel};

/// Errors that can occur when interacting with cart or product storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The customer already owns an open (unpaid) cart.
    #[error("Customer {customer} already has an open cart")]
    OpenCartConflict { customer: CustomerId },

    /// The cart row does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The product is already a line item of the cart.
    #[error("Product {model} is already in cart {cart_id}")]
    LineItemConflict { cart_id: CartId, model: ProductModel },

    /// The product is not a line item of the cart.
    #[error("Product {model} is not in cart {cart_id}")]
    LineItemNotFound { cart_id: CartId, model: ProductModel },

    /// The product record does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductModel),

    /// A product with the same model is already registered.
    #[error("Product already exists: {0}")]
    ProductAlreadyExists(ProductModel),

    /// Not enough units in stock to satisfy a decrement.
    #[error("Insufficient stock for {model}: requested {requested}, available {available}")]
    InsufficientStock {
        model: ProductModel,
        requested: u32,
        available: u32,
    },

    /// A stored row could not be mapped to a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true when the backing store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
