use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    CartId, CartRecord, CustomerId, LineItemRecord, Money, NewCart, NewLineItem, Product,
    ProductModel, Result, StoreError,
    repository::{CartRepository, ProductStore},
};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

fn quantity_from_db(value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("negative quantity: {value}")))
}

fn quantity_to_db(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("quantity out of range: {value}")))
}

/// PostgreSQL-backed cart repository.
#[derive(Clone)]
pub struct PostgresCartRepository {
    pool: PgPool,
}

impl PostgresCartRepository {
    /// Creates a new PostgreSQL cart repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_cart(row: &PgRow) -> Result<CartRecord> {
        Ok(CartRecord {
            id: CartId::new(row.try_get("id")?),
            customer: CustomerId::new(row.try_get::<String, _>("customer")?),
            paid: row.try_get("paid")?,
            payment_date: row.try_get::<Option<NaiveDate>, _>("payment_date")?,
            total: Money::from_cents(row.try_get("total_cents")?),
            items: Vec::new(),
        })
    }

    fn row_to_line_item(row: &PgRow) -> Result<(CartId, LineItemRecord)> {
        let category: String = row.try_get("category")?;
        let item = LineItemRecord {
            model: ProductModel::new(row.try_get::<String, _>("product_model")?),
            quantity: quantity_from_db(row.try_get("quantity")?)?,
            category: category.parse()?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        };
        Ok((CartId::new(row.try_get("cart_id")?), item))
    }

    /// Loads the rows of `rows` and attaches their line items with one query.
    async fn with_line_items(&self, rows: Vec<PgRow>) -> Result<Vec<CartRecord>> {
        let mut carts = rows
            .iter()
            .map(Self::row_to_cart)
            .collect::<Result<Vec<_>>>()?;
        if carts.is_empty() {
            return Ok(carts);
        }

        let ids: Vec<i64> = carts.iter().map(|c| c.id.as_i64()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT cart_id, product_model, quantity, category, unit_price_cents
            FROM cart_line_items
            WHERE cart_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_cart: HashMap<CartId, Vec<LineItemRecord>> = HashMap::new();
        for row in &item_rows {
            let (cart_id, item) = Self::row_to_line_item(row)?;
            by_cart.entry(cart_id).or_default().push(item);
        }

        for cart in &mut carts {
            cart.items = by_cart.remove(&cart.id).unwrap_or_default();
        }
        Ok(carts)
    }

    fn map_open_cart_conflict(e: sqlx::Error, customer: &CustomerId) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("one_open_cart_per_customer")
        {
            return StoreError::OpenCartConflict {
                customer: customer.clone(),
            };
        }
        StoreError::Database(e)
    }
}

#[async_trait]
impl CartRepository for PostgresCartRepository {
    async fn get_current_cart(&self, customer: &CustomerId) -> Result<Option<CartRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, customer, paid, payment_date, total_cents
            FROM carts
            WHERE customer = $1 AND payment_date IS NULL
            "#,
        )
        .bind(customer.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut cart = Self::row_to_cart(&row)?;
                cart.items = self.get_line_items(cart.id).await?;
                Ok(Some(cart))
            }
            None => Ok(None),
        }
    }

    async fn get_line_items(&self, cart_id: CartId) -> Result<Vec<LineItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT cart_id, product_model, quantity, category, unit_price_cents
            FROM cart_line_items
            WHERE cart_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(cart_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Self::row_to_line_item(row).map(|(_, item)| item))
            .collect()
    }

    async fn create_cart(&self, cart: NewCart) -> Result<CartId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO carts (customer, paid, payment_date, total_cents)
            VALUES ($1, FALSE, NULL, $2)
            RETURNING id
            "#,
        )
        .bind(cart.customer.as_str())
        .bind(cart.total.cents())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_open_cart_conflict(e, &cart.customer))?;

        tracing::debug!(cart_id = id, customer = %cart.customer, "cart row created");
        Ok(CartId::new(id))
    }

    async fn update_cart(&self, cart: &CartRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET customer = $1, paid = $2, payment_date = $3, total_cents = $4
            WHERE id = $5
            "#,
        )
        .bind(cart.customer.as_str())
        .bind(cart.paid)
        .bind(cart.payment_date)
        .bind(cart.total.cents())
        .bind(cart.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_open_cart_conflict(e, &cart.customer))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartNotFound(cart.id));
        }
        Ok(())
    }

    async fn update_open_cart_total(&self, cart_id: CartId, total: Money) -> Result<()> {
        let result = sqlx::query(
            "UPDATE carts SET total_cents = $1 WHERE id = $2 AND payment_date IS NULL",
        )
        .bind(total.cents())
        .bind(cart_id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartNotFound(cart_id));
        }
        Ok(())
    }

    async fn insert_line_item(&self, cart_id: CartId, item: NewLineItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_line_items
                (cart_id, product_model, quantity, category, unit_price_cents)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(cart_id.as_i64())
        .bind(item.model.as_str())
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.category.as_str())
        .bind(item.unit_price.cents())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("unique_cart_product") => {
                        return StoreError::LineItemConflict {
                            cart_id,
                            model: item.model.clone(),
                        };
                    }
                    Some("cart_line_items_cart_id_fkey") => {
                        return StoreError::CartNotFound(cart_id);
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_line_item_quantity(
        &self,
        cart_id: CartId,
        model: &ProductModel,
        quantity: u32,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE cart_line_items SET quantity = $1 WHERE cart_id = $2 AND product_model = $3",
        )
        .bind(quantity_to_db(quantity)?)
        .bind(cart_id.as_i64())
        .bind(model.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LineItemNotFound {
                cart_id,
                model: model.clone(),
            });
        }
        Ok(())
    }

    async fn delete_line_item(&self, cart_id: CartId, model: &ProductModel) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM cart_line_items WHERE cart_id = $1 AND product_model = $2")
                .bind(cart_id.as_i64())
                .bind(model.as_str())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LineItemNotFound {
                cart_id,
                model: model.clone(),
            });
        }
        Ok(())
    }

    async fn delete_line_items(&self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_line_items WHERE cart_id = $1")
            .bind(cart_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_carts(&self) -> Result<Vec<CartRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer, paid, payment_date, total_cents
            FROM carts
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.with_line_items(rows).await
    }

    async fn list_paid_carts(&self, customer: &CustomerId) -> Result<Vec<CartRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer, paid, payment_date, total_cents
            FROM carts
            WHERE customer = $1 AND paid = TRUE AND payment_date IS NOT NULL
            ORDER BY id ASC
            "#,
        )
        .bind(customer.as_str())
        .fetch_all(&self.pool)
        .await?;

        self.with_line_items(rows).await
    }

    async fn delete_all_carts(&self) -> Result<()> {
        // Line items go with their carts (ON DELETE CASCADE)
        sqlx::query("DELETE FROM carts").execute(&self.pool).await?;
        Ok(())
    }
}

/// PostgreSQL-backed product store.
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    /// Creates a new PostgreSQL product store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        let category: String = row.try_get("category")?;
        Ok(Product {
            model: ProductModel::new(row.try_get::<String, _>("model")?),
            category: category.parse()?,
            quantity: quantity_from_db(row.try_get("quantity")?)?,
            selling_price: Money::from_cents(row.try_get("selling_price_cents")?),
            arrival_date: row.try_get("arrival_date")?,
            details: row.try_get("details")?,
        })
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn get_product(&self, model: &ProductModel) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT model, category, quantity, selling_price_cents, arrival_date, details
            FROM products
            WHERE model = $1
            "#,
        )
        .bind(model.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn register_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (model, category, quantity, selling_price_cents, arrival_date, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.model.as_str())
        .bind(product.category.as_str())
        .bind(quantity_to_db(product.quantity)?)
        .bind(product.selling_price.cents())
        .bind(product.arrival_date)
        .bind(product.details.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("products_pkey")
            {
                return StoreError::ProductAlreadyExists(product.model.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET category = $1, quantity = $2, selling_price_cents = $3,
                arrival_date = $4, details = $5
            WHERE model = $6
            "#,
        )
        .bind(product.category.as_str())
        .bind(quantity_to_db(product.quantity)?)
        .bind(product.selling_price.cents())
        .bind(product.arrival_date)
        .bind(product.details.as_deref())
        .bind(product.model.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product.model.clone()));
        }
        Ok(())
    }

    async fn decrement_stock(&self, model: &ProductModel, quantity: u32) -> Result<Product> {
        let requested = quantity_to_db(quantity)?;
        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - $2
            WHERE model = $1 AND quantity >= $2
            RETURNING model, category, quantity, selling_price_cents, arrival_date, details
            "#,
        )
        .bind(model.as_str())
        .bind(requested)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_product(&row);
        }

        // Nothing updated: tell a missing product apart from a short one
        match self.get_product(model).await? {
            Some(product) => Err(StoreError::InsufficientStock {
                model: model.clone(),
                requested: quantity,
                available: product.quantity,
            }),
            None => Err(StoreError::ProductNotFound(model.clone())),
        }
    }
}
