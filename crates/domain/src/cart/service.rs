//! Cart engine.

use std::time::Instant;

use cart_store::{CartRepository, NewCart, NewLineItem, Product, ProductStore};
use chrono::{Local, NaiveDate};
use common::{CustomerId, Money, ProductModel};
use futures_util::future::{try_join, try_join_all};

use super::{Cart, CartError};
use crate::error::DomainError;

/// Service enforcing cart mutation and checkout rules.
///
/// The repository and product store are injected at construction and treated
/// as plain storage. Writes belonging to one operation are dispatched together
/// and awaited jointly; they are not wrapped in a transaction, and two
/// concurrent requests for the same customer may interleave. The storage-level
/// one-open-cart constraint still holds under such races.
pub struct CartService<R: CartRepository, P: ProductStore> {
    carts: R,
    products: P,
}

impl<R: CartRepository, P: ProductStore> CartService<R, P> {
    /// Creates a new cart service over the given stores.
    pub fn new(carts: R, products: P) -> Self {
        Self { carts, products }
    }

    /// Returns a reference to the cart repository.
    pub fn carts(&self) -> &R {
        &self.carts
    }

    /// Returns a reference to the product store.
    pub fn products(&self) -> &P {
        &self.products
    }

    async fn fetch_product(&self, model: &ProductModel) -> Result<Product, DomainError> {
        self.products
            .get_product(model)
            .await?
            .ok_or_else(|| {
                CartError::ProductNotFound {
                    model: model.clone(),
                }
                .into()
            })
    }

    /// Returns the customer's open cart, or an unpersisted empty cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, customer: &CustomerId) -> Result<Cart, DomainError> {
        Ok(match self.carts.get_current_cart(customer).await? {
            Some(record) => Cart::from(record),
            None => Cart::empty(customer.clone()),
        })
    }

    /// Adds one unit of a product to the customer's open cart, creating the
    /// cart if needed.
    ///
    /// Only a product with zero stock is refused here; quantity against stock
    /// is compared at checkout.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        customer: &CustomerId,
        model: &ProductModel,
    ) -> Result<(), DomainError> {
        let product = self.fetch_product(model).await?;
        if product.quantity == 0 {
            return Err(CartError::EmptyStock {
                model: model.clone(),
            }
            .into());
        }

        let cart = self.get_cart(customer).await?;

        match cart.id {
            None => {
                let cart_id = self
                    .carts
                    .create_cart(NewCart {
                        customer: customer.clone(),
                        total: product.selling_price,
                    })
                    .await?;
                self.carts
                    .insert_line_item(cart_id, NewLineItem::single_unit(&product))
                    .await?;
                tracing::info!(%cart_id, %customer, "cart created");
            }
            Some(cart_id) if cart.products.is_empty() => {
                try_join(
                    self.carts
                        .update_open_cart_total(cart_id, product.selling_price),
                    self.carts
                        .insert_line_item(cart_id, NewLineItem::single_unit(&product)),
                )
                .await?;
            }
            Some(cart_id) => match cart.find_product(model) {
                Some(line) => {
                    try_join(
                        self.carts
                            .update_line_item_quantity(cart_id, model, line.quantity + 1),
                        self.carts
                            .update_open_cart_total(cart_id, cart.total + line.price),
                    )
                    .await?;
                }
                None => {
                    try_join(
                        self.carts
                            .insert_line_item(cart_id, NewLineItem::single_unit(&product)),
                        self.carts
                            .update_open_cart_total(cart_id, cart.total + product.selling_price),
                    )
                    .await?;
                }
            },
        }

        metrics::counter!("cart_items_added_total").increment(1);
        Ok(())
    }

    /// Pays for the customer's open cart and takes its units out of stock.
    ///
    /// Every line is validated against live stock before anything is written;
    /// a failing line leaves both the cart and the products untouched.
    #[tracing::instrument(skip(self))]
    pub async fn checkout_cart(&self, customer: &CustomerId) -> Result<(), DomainError> {
        let start = Instant::now();
        let result = self.checkout(customer, today()).await;

        match &result {
            Ok(()) => {
                let duration = start.elapsed().as_secs_f64();
                metrics::histogram!("cart_checkout_duration_seconds").record(duration);
                metrics::counter!("cart_checkouts_total").increment(1);
                tracing::info!(%customer, duration, "cart checked out");
            }
            Err(err) => {
                let reason = err.as_cart_error().map_or("storage", CartError::kind);
                metrics::counter!("cart_checkout_failures_total", "reason" => reason).increment(1);
                tracing::warn!(%customer, %reason, error = %err, "checkout rejected");
            }
        }

        result
    }

    async fn checkout(&self, customer: &CustomerId, date: NaiveDate) -> Result<(), DomainError> {
        let cart = self.get_cart(customer).await?;

        let Some(cart_id) = cart.id else {
            return Err(CartError::CartNotFound {
                customer: customer.clone(),
            }
            .into());
        };
        if cart.products.is_empty() {
            return Err(CartError::EmptyCart {
                customer: customer.clone(),
            }
            .into());
        }

        let live = try_join_all(cart.products.iter().map(|p| self.fetch_product(&p.model))).await?;

        let mut decremented = Vec::with_capacity(live.len());
        for (line, mut product) in cart.products.iter().zip(live) {
            if product.quantity == 0 {
                return Err(CartError::EmptyStock {
                    model: line.model.clone(),
                }
                .into());
            }
            if line.quantity > product.quantity {
                return Err(CartError::LowStock {
                    model: line.model.clone(),
                    requested: line.quantity,
                    available: product.quantity,
                }
                .into());
            }
            product.quantity -= line.quantity;
            decremented.push(product);
        }

        let mut row = cart.row(cart_id);
        row.paid = true;
        row.payment_date = Some(date);

        try_join(
            self.carts.update_cart(&row),
            try_join_all(decremented.iter().map(|p| self.products.update_product(p))),
        )
        .await?;

        Ok(())
    }

    /// Returns the customer's checked-out carts.
    #[tracing::instrument(skip(self))]
    pub async fn get_customer_carts(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<Cart>, DomainError> {
        let records = self.carts.list_paid_carts(customer).await?;
        Ok(records.into_iter().map(Cart::from).collect())
    }

    /// Removes one unit of a product from the customer's open cart.
    ///
    /// The line disappears when its last unit is removed; the cart itself
    /// stays open.
    #[tracing::instrument(skip(self))]
    pub async fn remove_product_from_cart(
        &self,
        customer: &CustomerId,
        model: &ProductModel,
    ) -> Result<(), DomainError> {
        let (product, cart) =
            try_join(self.fetch_product(model), self.get_cart(customer)).await?;

        let cart_id = match cart.id {
            Some(id) if !cart.is_empty() => id,
            _ => {
                return Err(CartError::CartNotFound {
                    customer: customer.clone(),
                }
                .into());
            }
        };

        let line = cart
            .find_product(model)
            .ok_or_else(|| CartError::ProductNotInCart {
                model: model.clone(),
            })?;

        // The line's own price keeps the total equal to the sum of its lines
        // even if the product was repriced after it was added.
        let total = cart.total - line.price;
        if line.price != product.selling_price {
            tracing::debug!(
                %model,
                line_price = %line.price,
                current_price = %product.selling_price,
                "product repriced since it was added"
            );
        }

        let remaining = line.quantity - 1;
        let line_write = async {
            if remaining > 0 {
                self.carts
                    .update_line_item_quantity(cart_id, model, remaining)
                    .await
            } else {
                self.carts.delete_line_item(cart_id, model).await
            }
        };

        try_join(self.carts.update_open_cart_total(cart_id, total), line_write)
            .await?;

        metrics::counter!("cart_items_removed_total").increment(1);
        Ok(())
    }

    /// Removes every product from the customer's open cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, customer: &CustomerId) -> Result<(), DomainError> {
        let cart = self.get_cart(customer).await?;

        let cart_id = match cart.id {
            Some(id) if !cart.is_empty() => id,
            _ => {
                return Err(CartError::CartNotFound {
                    customer: customer.clone(),
                }
                .into());
            }
        };

        try_join(
            self.carts.update_open_cart_total(cart_id, Money::zero()),
            self.carts.delete_line_items(cart_id),
        )
        .await?;

        metrics::counter!("cart_cleared_total").increment(1);
        Ok(())
    }

    /// Deletes every cart of every customer.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_carts(&self) -> Result<(), DomainError> {
        self.carts.delete_all_carts().await?;
        tracing::info!("all carts deleted");
        Ok(())
    }

    /// Returns every cart of every customer.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_carts(&self) -> Result<Vec<Cart>, DomainError> {
        let records = self.carts.list_carts().await?;
        Ok(records.into_iter().map(Cart::from).collect())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
