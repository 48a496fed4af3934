//! Domain error types.

use cart_store::StoreError;
use thiserror::Error;

use crate::cart::CartError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in cart or product storage.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A cart rule rejected the operation.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

impl DomainError {
    /// Returns the cart rule violation, if this is one.
    pub fn as_cart_error(&self) -> Option<&CartError> {
        match self {
            DomainError::Cart(err) => Some(err),
            DomainError::Store(_) => None,
        }
    }
}
