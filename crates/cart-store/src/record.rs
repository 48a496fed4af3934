//! Records exchanged with the storage layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CartId, CustomerId, Money, ProductModel, StoreError};

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Smartphone,
    Laptop,
    Appliance,
}

impl Category {
    /// Returns the stored name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Smartphone => "Smartphone",
            Category::Laptop => "Laptop",
            Category::Appliance => "Appliance",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Smartphone" => Ok(Category::Smartphone),
            "Laptop" => Ok(Category::Laptop),
            "Appliance" => Ok(Category::Appliance),
            other => Err(StoreError::InvalidRecord(format!(
                "unknown product category: {other}"
            ))),
        }
    }
}

/// A product record owned by the product store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub model: ProductModel,
    pub category: Category,
    /// Units available in stock.
    pub quantity: u32,
    pub selling_price: Money,
    pub arrival_date: NaiveDate,
    #[serde(default)]
    pub details: Option<String>,
}

impl Product {
    /// Creates a product with no details.
    pub fn new(
        model: impl Into<ProductModel>,
        category: Category,
        quantity: u32,
        selling_price: Money,
        arrival_date: NaiveDate,
    ) -> Self {
        Self {
            model: model.into(),
            category,
            quantity,
            selling_price,
            arrival_date,
            details: None,
        }
    }
}

/// A stored cart line item.
///
/// Category and unit price are snapshots taken when the item was first
/// inserted and do not follow later changes to the product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub model: ProductModel,
    pub quantity: u32,
    pub category: Category,
    pub unit_price: Money,
}

/// Data for a line item being inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub model: ProductModel,
    pub quantity: u32,
    pub category: Category,
    pub unit_price: Money,
}

impl NewLineItem {
    /// Creates a single-unit line item priced at the product's current selling price.
    pub fn single_unit(product: &Product) -> Self {
        Self {
            model: product.model.clone(),
            quantity: 1,
            category: product.category,
            unit_price: product.selling_price,
        }
    }
}

impl From<NewLineItem> for LineItemRecord {
    fn from(item: NewLineItem) -> Self {
        Self {
            model: item.model,
            quantity: item.quantity,
            category: item.category,
            unit_price: item.unit_price,
        }
    }
}

/// A persisted cart row together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub customer: CustomerId,
    pub paid: bool,
    pub payment_date: Option<NaiveDate>,
    pub total: Money,
    /// Line items in insertion order.
    pub items: Vec<LineItemRecord>,
}

impl CartRecord {
    /// Returns true if the cart is still open (not checked out).
    pub fn is_open(&self) -> bool {
        self.payment_date.is_none()
    }
}

/// Data for a cart row being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCart {
    pub customer: CustomerId,
    pub total: Money,
}
