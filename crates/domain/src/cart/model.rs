//! Cart value types.

use cart_store::{CartRecord, Category, LineItemRecord};
use chrono::NaiveDate;
use common::{CartId, CustomerId, Money, ProductModel};
use serde::{Deserialize, Serialize};

/// A product line within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInCart {
    /// The product model.
    pub model: ProductModel,

    /// Units of the product in the cart, always at least 1.
    pub quantity: u32,

    /// Product category at the time the line was created.
    pub category: Category,

    /// Unit price at the time the line was created.
    pub price: Money,
}

impl ProductInCart {
    /// Returns the price of all units on this line.
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

impl From<LineItemRecord> for ProductInCart {
    fn from(item: LineItemRecord) -> Self {
        Self {
            model: item.model,
            quantity: item.quantity,
            category: item.category,
            price: item.unit_price,
        }
    }
}

/// A customer's cart.
///
/// A cart without an `id` has never been persisted; the engine hands it out
/// when the customer has no open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Option<CartId>,
    pub customer: CustomerId,
    pub paid: bool,
    pub payment_date: Option<NaiveDate>,
    pub total: Money,
    pub products: Vec<ProductInCart>,
}

impl Cart {
    /// Creates the unpersisted empty cart of a customer.
    pub fn empty(customer: CustomerId) -> Self {
        Self {
            id: None,
            customer,
            paid: false,
            payment_date: None,
            total: Money::zero(),
            products: Vec::new(),
        }
    }

    /// Returns true if the cart is open and holds nothing, whether or not it
    /// has been persisted.
    pub fn is_empty(&self) -> bool {
        !self.paid
            && self.payment_date.is_none()
            && self.total.is_zero()
            && self.products.is_empty()
    }

    /// Returns the line for a product, if present.
    pub fn find_product(&self, model: &ProductModel) -> Option<&ProductInCart> {
        self.products.iter().find(|p| &p.model == model)
    }

    /// Sum of the line totals; equals `total` for every cart the engine leaves behind.
    pub fn computed_total(&self) -> Money {
        self.products.iter().map(ProductInCart::line_total).sum()
    }

    /// Returns the row fields of a persisted cart, without its line items.
    pub(crate) fn row(&self, id: CartId) -> CartRecord {
        CartRecord {
            id,
            customer: self.customer.clone(),
            paid: self.paid,
            payment_date: self.payment_date,
            total: self.total,
            items: Vec::new(),
        }
    }
}

impl From<CartRecord> for Cart {
    fn from(record: CartRecord) -> Self {
        Self {
            id: Some(record.id),
            customer: record.customer,
            paid: record.paid,
            payment_date: record.payment_date,
            total: record.total,
            products: record.items.into_iter().map(ProductInCart::from).collect(),
        }
    }
}
