//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use cart_store::{CartRepository, ProductStore};
use common::ProductModel;
use domain::{Cart, CartService, ProductInCart};
use serde::{Deserialize, Serialize};

use crate::caller::Caller;
use crate::error::ApiError;

/// Shared application state accessible from all cart handlers.
pub struct AppState<R: CartRepository, P: ProductStore> {
    pub cart_service: CartService<R, P>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub model: String,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
pub struct CartResponse {
    pub id: Option<i64>,
    pub customer: String,
    pub paid: bool,
    pub payment_date: Option<String>,
    pub total_cents: i64,
    pub products: Vec<ProductInCartResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductInCartResponse {
    pub model: String,
    pub quantity: u32,
    pub category: String,
    pub price_cents: i64,
}

impl From<&ProductInCart> for ProductInCartResponse {
    fn from(line: &ProductInCart) -> Self {
        Self {
            model: line.model.to_string(),
            quantity: line.quantity,
            category: line.category.to_string(),
            price_cents: line.price.cents(),
        }
    }
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id.map(|id| id.as_i64()),
            customer: cart.customer.to_string(),
            paid: cart.paid,
            payment_date: cart
                .payment_date
                .map(|date| date.format("%Y-%m-%d").to_string()),
            total_cents: cart.total.cents(),
            products: cart.products.iter().map(ProductInCartResponse::from).collect(),
        }
    }
}

fn to_responses(carts: &[Cart]) -> Vec<CartResponse> {
    carts.iter().map(CartResponse::from).collect()
}

// -- Handlers --

/// GET /carts — the caller's open cart.
#[tracing::instrument(skip(state))]
pub async fn current<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let customer = caller.require_customer()?;
    let cart = state.cart_service.get_cart(customer).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// POST /carts — add one unit of a product to the caller's cart.
#[tracing::instrument(skip(state, payload))]
pub async fn add<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<bool>, ApiError> {
    let customer = caller.require_customer()?;
    let Json(req) = payload?;
    let model = req.model.trim();
    if model.is_empty() {
        return Err(ApiError::Validation("model must not be empty".to_string()));
    }

    state
        .cart_service
        .add_to_cart(customer, &ProductModel::new(model))
        .await?;
    Ok(Json(true))
}

/// PATCH /carts — check out the caller's cart.
#[tracing::instrument(skip(state))]
pub async fn checkout<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
) -> Result<Json<bool>, ApiError> {
    let customer = caller.require_customer()?;
    state.cart_service.checkout_cart(customer).await?;
    Ok(Json(true))
}

/// GET /carts/history — the caller's paid carts.
#[tracing::instrument(skip(state))]
pub async fn history<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
) -> Result<Json<Vec<CartResponse>>, ApiError> {
    let customer = caller.require_customer()?;
    let carts = state.cart_service.get_customer_carts(customer).await?;
    Ok(Json(to_responses(&carts)))
}

/// DELETE /carts/products/{model} — remove one unit of a product.
#[tracing::instrument(skip(state))]
pub async fn remove_product<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
    Path(model): Path<String>,
) -> Result<Json<bool>, ApiError> {
    let customer = caller.require_customer()?;
    state
        .cart_service
        .remove_product_from_cart(customer, &ProductModel::new(model))
        .await?;
    Ok(Json(true))
}

/// DELETE /carts/current — empty the caller's cart.
#[tracing::instrument(skip(state))]
pub async fn clear<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
) -> Result<Json<bool>, ApiError> {
    let customer = caller.require_customer()?;
    state.cart_service.clear_cart(customer).await?;
    Ok(Json(true))
}

/// DELETE /carts — delete every cart.
#[tracing::instrument(skip(state))]
pub async fn delete_all<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
) -> Result<Json<bool>, ApiError> {
    caller.require_admin_or_manager()?;
    state.cart_service.delete_all_carts().await?;
    Ok(Json(true))
}

/// GET /carts/all — every cart of every customer.
#[tracing::instrument(skip(state))]
pub async fn all<R: CartRepository + 'static, P: ProductStore + 'static>(
    State(state): State<Arc<AppState<R, P>>>,
    caller: Caller,
) -> Result<Json<Vec<CartResponse>>, ApiError> {
    caller.require_admin_or_manager()?;
    let carts = state.cart_service.get_all_carts().await?;
    Ok(Json(to_responses(&carts)))
}
