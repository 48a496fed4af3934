//! Cart model, rules and the engine that applies them.

mod model;
mod service;

pub use model::{Cart, ProductInCart};
pub use service::CartService;

use common::{CustomerId, ProductModel};
use thiserror::Error;

/// Errors raised by cart rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The product does not exist.
    #[error("Product not found: {model}")]
    ProductNotFound { model: ProductModel },

    /// The product has no units in stock.
    #[error("Product {model} is out of stock")]
    EmptyStock { model: ProductModel },

    /// The cart asks for more units than are in stock.
    #[error("Insufficient stock for {model}: requested {requested}, available {available}")]
    LowStock {
        model: ProductModel,
        requested: u32,
        available: u32,
    },

    /// The customer has no open cart.
    #[error("No open cart for customer {customer}")]
    CartNotFound { customer: CustomerId },

    /// The open cart has no products.
    #[error("Cart of customer {customer} is empty")]
    EmptyCart { customer: CustomerId },

    /// The product is not in the open cart.
    #[error("Product {model} is not in the cart")]
    ProductNotInCart { model: ProductModel },
}

impl CartError {
    /// Stable machine-readable identifier of the error.
    pub fn kind(&self) -> &'static str {
        match self {
            CartError::ProductNotFound { .. } => "ProductNotFound",
            CartError::EmptyStock { .. } => "EmptyStock",
            CartError::LowStock { .. } => "LowStock",
            CartError::CartNotFound { .. } => "CartNotFound",
            CartError::EmptyCart { .. } => "EmptyCart",
            CartError::ProductNotInCart { .. } => "ProductNotInCart",
        }
    }
}
