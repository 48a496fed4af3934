pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod repository;

pub use common::{CartId, CustomerId, Money, ProductModel};
pub use error::{Result, StoreError};
pub use memory::{InMemoryCartRepository, InMemoryProductStore};
pub use postgres::{PostgresCartRepository, PostgresProductStore, run_migrations};
pub use record::{CartRecord, Category, LineItemRecord, NewCart, NewLineItem, Product};
pub use repository::{CartRepository, ProductStore, ProductStoreExt};
