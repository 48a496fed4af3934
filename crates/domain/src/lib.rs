//! Domain layer for the cart checkout service.
//!
//! This crate provides:
//! - `Cart` and `ProductInCart`, the customer-facing cart model
//! - `CartService`, the engine enforcing add/remove/clear and checkout rules
//!   on top of an injected `CartRepository` and `ProductStore`
//! - `CartError`, the closed set of rule violations

pub mod cart;
pub mod error;

pub use cart::{Cart, CartError, CartService, ProductInCart};
pub use error::DomainError;
