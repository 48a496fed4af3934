use async_trait::async_trait;

use crate::{
    CartId, CartRecord, CustomerId, LineItemRecord, Money, NewCart, NewLineItem, Product,
    ProductModel, Result,
};

/// Persistence of carts and their line items.
///
/// A customer owns at most one open cart (`payment_date` unset). Reads of the
/// current cart return `None` when the customer has no open cart; that is
/// never an error. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Returns the customer's open cart with its line items, if any.
    async fn get_current_cart(&self, customer: &CustomerId) -> Result<Option<CartRecord>>;

    /// Returns the line items of a cart in insertion order.
    async fn get_line_items(&self, cart_id: CartId) -> Result<Vec<LineItemRecord>>;

    /// Creates an open cart row and returns its generated ID.
    ///
    /// Fails with `OpenCartConflict` if the customer already has an open cart.
    async fn create_cart(&self, cart: NewCart) -> Result<CartId>;

    /// Writes the row fields (`paid`, `payment_date`, `total`) of a cart.
    ///
    /// Line items in `cart` are ignored.
    async fn update_cart(&self, cart: &CartRecord) -> Result<()>;

    /// Sets the total of an open cart.
    ///
    /// Fails with `CartNotFound` if the cart does not exist or has already
    /// been checked out.
    async fn update_open_cart_total(&self, cart_id: CartId, total: Money) -> Result<()>;

    /// Inserts a line item into a cart.
    async fn insert_line_item(&self, cart_id: CartId, item: NewLineItem) -> Result<()>;

    /// Sets the quantity of an existing line item.
    async fn update_line_item_quantity(
        &self,
        cart_id: CartId,
        model: &ProductModel,
        quantity: u32,
    ) -> Result<()>;

    /// Deletes one line item from a cart.
    async fn delete_line_item(&self, cart_id: CartId, model: &ProductModel) -> Result<()>;

    /// Deletes every line item of a cart.
    async fn delete_line_items(&self, cart_id: CartId) -> Result<()>;

    /// Lists every cart of every customer, paid or not.
    async fn list_carts(&self) -> Result<Vec<CartRecord>>;

    /// Lists the customer's checked-out carts.
    async fn list_paid_carts(&self, customer: &CustomerId) -> Result<Vec<CartRecord>>;

    /// Deletes every cart and line item.
    async fn delete_all_carts(&self) -> Result<()>;
}

/// Keyed access to product records.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Returns the product with the given model, if it exists.
    async fn get_product(&self, model: &ProductModel) -> Result<Option<Product>>;

    /// Registers a new product.
    ///
    /// Fails with `ProductAlreadyExists` if the model is taken.
    async fn register_product(&self, product: Product) -> Result<()>;

    /// Overwrites a product record.
    async fn update_product(&self, product: &Product) -> Result<()>;

    /// Atomically removes `quantity` units from stock and returns the updated record.
    ///
    /// Fails with `InsufficientStock` without changing anything if fewer
    /// units are available.
    async fn decrement_stock(&self, model: &ProductModel, quantity: u32) -> Result<Product>;
}

/// Extension trait providing convenience methods for product stores.
#[async_trait]
pub trait ProductStoreExt: ProductStore {
    /// Checks whether a product with the given model exists.
    async fn product_exists(&self, model: &ProductModel) -> Result<bool> {
        Ok(self.get_product(model).await?.is_some())
    }
}

impl<T: ProductStore + ?Sized> ProductStoreExt for T {}
