use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CartId, CartRecord, CustomerId, LineItemRecord, Money, NewCart, NewLineItem, Product,
    ProductModel, Result, StoreError,
    repository::{CartRepository, ProductStore},
};

#[derive(Debug, Default)]
struct CartTables {
    carts: BTreeMap<CartId, CartRecord>,
    next_id: i64,
}

impl CartTables {
    fn cart_mut(&mut self, cart_id: CartId) -> Result<&mut CartRecord> {
        self.carts
            .get_mut(&cart_id)
            .ok_or(StoreError::CartNotFound(cart_id))
    }
}

/// In-memory cart repository.
///
/// Provides the same interface and constraints as the PostgreSQL
/// implementation, including the one-open-cart-per-customer rule.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartRepository {
    tables: Arc<RwLock<CartTables>>,
}

impl InMemoryCartRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of cart rows stored.
    pub async fn cart_count(&self) -> usize {
        self.tables.read().await.carts.len()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn get_current_cart(&self, customer: &CustomerId) -> Result<Option<CartRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .values()
            .find(|c| &c.customer == customer && c.is_open())
            .cloned())
    }

    async fn get_line_items(&self, cart_id: CartId) -> Result<Vec<LineItemRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .get(&cart_id)
            .map(|c| c.items.clone())
            .unwrap_or_default())
    }

    async fn create_cart(&self, cart: NewCart) -> Result<CartId> {
        let mut tables = self.tables.write().await;

        // Unique partial index simulation
        if tables
            .carts
            .values()
            .any(|c| c.customer == cart.customer && c.is_open())
        {
            return Err(StoreError::OpenCartConflict {
                customer: cart.customer,
            });
        }

        tables.next_id += 1;
        let id = CartId::new(tables.next_id);
        tables.carts.insert(
            id,
            CartRecord {
                id,
                customer: cart.customer,
                paid: false,
                payment_date: None,
                total: cart.total,
                items: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_cart(&self, cart: &CartRecord) -> Result<()> {
        let mut tables = self.tables.write().await;

        if cart.payment_date.is_none()
            && tables
                .carts
                .values()
                .any(|c| c.id != cart.id && c.customer == cart.customer && c.is_open())
        {
            return Err(StoreError::OpenCartConflict {
                customer: cart.customer.clone(),
            });
        }

        let stored = tables.cart_mut(cart.id)?;
        stored.customer = cart.customer.clone();
        stored.paid = cart.paid;
        stored.payment_date = cart.payment_date;
        stored.total = cart.total;
        Ok(())
    }

    async fn update_open_cart_total(&self, cart_id: CartId, total: Money) -> Result<()> {
        let mut tables = self.tables.write().await;
        let cart = tables.cart_mut(cart_id)?;
        if !cart.is_open() {
            return Err(StoreError::CartNotFound(cart_id));
        }
        cart.total = total;
        Ok(())
    }

    async fn insert_line_item(&self, cart_id: CartId, item: NewLineItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        let cart = tables.cart_mut(cart_id)?;

        if cart.items.iter().any(|i| i.model == item.model) {
            return Err(StoreError::LineItemConflict {
                cart_id,
                model: item.model,
            });
        }

        cart.items.push(item.into());
        Ok(())
    }

    async fn update_line_item_quantity(
        &self,
        cart_id: CartId,
        model: &ProductModel,
        quantity: u32,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let cart = tables.cart_mut(cart_id)?;
        let item = cart
            .items
            .iter_mut()
            .find(|i| &i.model == model)
            .ok_or_else(|| StoreError::LineItemNotFound {
                cart_id,
                model: model.clone(),
            })?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_line_item(&self, cart_id: CartId, model: &ProductModel) -> Result<()> {
        let mut tables = self.tables.write().await;
        let cart = tables.cart_mut(cart_id)?;
        let before = cart.items.len();
        cart.items.retain(|i| &i.model != model);

        if cart.items.len() == before {
            return Err(StoreError::LineItemNotFound {
                cart_id,
                model: model.clone(),
            });
        }
        Ok(())
    }

    async fn delete_line_items(&self, cart_id: CartId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables.carts.get_mut(&cart_id) {
            cart.items.clear();
        }
        Ok(())
    }

    async fn list_carts(&self) -> Result<Vec<CartRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.values().cloned().collect())
    }

    async fn list_paid_carts(&self, customer: &CustomerId) -> Result<Vec<CartRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .values()
            .filter(|c| &c.customer == customer && c.paid && c.payment_date.is_some())
            .cloned()
            .collect())
    }

    async fn delete_all_carts(&self) -> Result<()> {
        self.tables.write().await.carts.clear();
        Ok(())
    }
}

/// In-memory product store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductModel, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty product store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a product store pre-populated with the given products.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|p| (p.model.clone(), p))
            .collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Returns the number of products stored.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn get_product(&self, model: &ProductModel) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(model).cloned())
    }

    async fn register_product(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.model) {
            return Err(StoreError::ProductAlreadyExists(product.model));
        }
        products.insert(product.model.clone(), product);
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        let stored = products
            .get_mut(&product.model)
            .ok_or_else(|| StoreError::ProductNotFound(product.model.clone()))?;
        *stored = product.clone();
        Ok(())
    }

    async fn decrement_stock(&self, model: &ProductModel, quantity: u32) -> Result<Product> {
        let mut products = self.products.write().await;
        let stored = products
            .get_mut(model)
            .ok_or_else(|| StoreError::ProductNotFound(model.clone()))?;

        if stored.quantity < quantity {
            return Err(StoreError::InsufficientStock {
                model: model.clone(),
                requested: quantity,
                available: stored.quantity,
            });
        }

        stored.quantity -= quantity;
        Ok(stored.clone())
    }
}
