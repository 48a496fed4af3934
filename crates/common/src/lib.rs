//! Identifier, role and money types shared by every crate in the workspace.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CartId, CustomerId, ProductModel, Role, UnknownRole};
